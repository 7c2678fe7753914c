//! 設定管理
//!
//! TOML設定ファイルの読み込みとDomain型への変換。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{CameraError, CameraResult};

/// アプリケーション設定のルート構造
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppConfig {
    /// キャプチャ設定
    pub capture: CaptureConfig,
    /// 分類（推論）設定
    pub classifier: ClassifierConfig,
    /// ログ設定
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// キャプチャ設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaptureConfig {
    /// 背面カメラのデバイス名
    #[serde(default = "default_back_device_name")]
    pub back_device_name: String,

    /// 前面カメラのデバイス名
    #[serde(default = "default_front_device_name")]
    pub front_device_name: String,

    /// フレーム幅（ピクセル、上限16384）
    pub frame_width: u32,

    /// フレーム高さ（ピクセル、上限16384）
    pub frame_height: u32,

    /// フレーム配信間隔（ミリ秒）
    ///
    /// 例: 33ms = 約30fps、16ms = 約60fps
    pub frame_interval_ms: u64,

    /// バックエンドが写真品質プリセットをサポートするか
    ///
    /// falseの場合、セッションは既定プリセットのまま構成される
    /// （エラーにはならない）
    pub photo_preset_supported: bool,
}

fn default_back_device_name() -> String {
    CaptureConfig::DEFAULT_BACK_DEVICE_NAME.to_string()
}

fn default_front_device_name() -> String {
    CaptureConfig::DEFAULT_FRONT_DEVICE_NAME.to_string()
}

impl CaptureConfig {
    pub const DEFAULT_BACK_DEVICE_NAME: &'static str = "Back Wide Camera";
    pub const DEFAULT_FRONT_DEVICE_NAME: &'static str = "Front Camera";
    /// デフォルトのフレーム幅
    pub const DEFAULT_FRAME_WIDTH: u32 = 640;
    /// デフォルトのフレーム高さ
    pub const DEFAULT_FRAME_HEIGHT: u32 = 480;
    /// デフォルトの配信間隔（約30fps）
    pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;
    /// フレーム寸法の上限（ピクセル）
    pub const MAX_FRAME_DIMENSION: u32 = 16_384;

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            back_device_name: default_back_device_name(),
            front_device_name: default_front_device_name(),
            frame_width: Self::DEFAULT_FRAME_WIDTH,
            frame_height: Self::DEFAULT_FRAME_HEIGHT,
            frame_interval_ms: Self::DEFAULT_FRAME_INTERVAL_MS,
            photo_preset_supported: true,
        }
    }
}

/// 分類（推論）設定
///
/// 推論本体は外部サービス扱いのため、ここではモックアダプタが返す
/// ラベルと疑似レイテンシのみを設定する。
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassifierConfig {
    /// モックアダプタが返すラベル
    pub label: String,

    /// モックアダプタが返す信頼度 [0.0, 1.0]
    pub confidence: f32,

    /// 疑似推論レイテンシ（ミリ秒）
    ///
    /// 0で即時応答。遅い推論が配信を妨げないことの確認に使う。
    pub latency_ms: u64,
}

impl ClassifierConfig {
    pub const DEFAULT_LABEL: &'static str = "tabby, tabby cat";
    pub const DEFAULT_CONFIDENCE: f32 = 0.72;

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            label: Self::DEFAULT_LABEL.to_string(),
            confidence: Self::DEFAULT_CONFIDENCE,
            latency_ms: 0,
        }
    }
}

/// ログ設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoggingConfig {
    /// ログレベル（"info", "debug", "trace"等）
    pub level: String,

    /// JSON形式で出力するか
    pub json: bool,

    /// ログファイル出力先ディレクトリ（省略時は標準出力）
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> CameraResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CameraError::Configuration(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| CameraError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// デフォルト設定をTOMLファイルに書き出す
    pub fn write_default<P: AsRef<Path>>(path: P) -> CameraResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| CameraError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| CameraError::Configuration(format!("Failed to write config file: {}", e)))
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> CameraResult<()> {
        if self.capture.frame_width == 0 || self.capture.frame_height == 0 {
            return Err(CameraError::Configuration(
                "Frame width and height must be greater than 0".to_string(),
            ));
        }

        if self.capture.frame_width > CaptureConfig::MAX_FRAME_DIMENSION
            || self.capture.frame_height > CaptureConfig::MAX_FRAME_DIMENSION
        {
            return Err(CameraError::Configuration(format!(
                "Frame dimensions must not exceed {} pixels",
                CaptureConfig::MAX_FRAME_DIMENSION
            )));
        }

        if self.capture.frame_interval_ms == 0 {
            return Err(CameraError::Configuration(
                "Frame interval must be greater than 0".to_string(),
            ));
        }

        if self.capture.back_device_name.is_empty() || self.capture.front_device_name.is_empty() {
            return Err(CameraError::Configuration(
                "Device names must not be empty".to_string(),
            ));
        }

        if self.classifier.label.is_empty() {
            return Err(CameraError::Configuration(
                "Classifier label must not be empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.classifier.confidence) {
            return Err(CameraError::Configuration(
                "Classifier confidence must be within [0.0, 1.0]".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.capture.frame_width, 640);
        assert_eq!(config.capture.frame_interval_ms, 33);
        assert!(config.capture.photo_preset_supported);
        assert_eq!(config.classifier.label, "tabby, tabby cat");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        // 不正なフレームサイズ
        config.capture.frame_width = 0;
        assert!(config.validate().is_err());

        config.capture.frame_width = 640;

        // 不正な信頼度
        config.classifier.confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_oversized_frames() {
        let mut config = AppConfig::default();

        // バッファサイズ計算を溢れさせる寸法は検証で弾く
        config.capture.frame_width = 70_000;
        config.capture.frame_height = 70_000;
        assert!(config.validate().is_err());

        // 上限ちょうどは許容される
        config.capture.frame_width = CaptureConfig::MAX_FRAME_DIMENSION;
        config.capture.frame_height = CaptureConfig::MAX_FRAME_DIMENSION;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parsing() {
        let toml = r#"
            [capture]
            back_device_name = "Rear"
            front_device_name = "Selfie"
            frame_width = 1280
            frame_height = 720
            frame_interval_ms = 16
            photo_preset_supported = false

            [classifier]
            label = "golden retriever"
            confidence = 0.9
            latency_ms = 120

            [logging]
            level = "debug"
            json = true
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.capture.frame_width, 1280);
        assert!(!config.capture.photo_preset_supported);
        assert_eq!(config.classifier.label, "golden retriever");
        assert_eq!(config.classifier.latency(), Duration::from_millis(120));
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_section_optional() {
        let toml = r#"
            [capture]
            frame_width = 640
            frame_height = 480
            frame_interval_ms = 33
            photo_preset_supported = true

            [classifier]
            label = "tabby, tabby cat"
            confidence = 0.72
            latency_ms = 0
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_write_default_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        AppConfig::write_default(&path).unwrap();
        let config = AppConfig::from_file(&path).unwrap();

        config.validate().unwrap();
        assert_eq!(config.capture.frame_width, AppConfig::default().capture.frame_width);
    }

    #[test]
    fn test_config_example_loads() {
        // config.toml.exampleが正常に読み込めることを確認
        let config = AppConfig::from_file("config.toml.example")
            .expect("config.toml.example should load");

        config.validate().expect("example config should validate");
    }
}
