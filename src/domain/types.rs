/// コア型定義
///
/// Domain層の中心となるデータ構造。
/// セッション状態・デバイス・フレームなど、すべての層で共有される型。
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::error::{CameraError, CameraResult};

/// カメラの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    /// 背面カメラ
    Back,
    /// 前面カメラ
    Front,
}

impl Facing {
    /// 反対側の向きを返す（カメラ切り替え用）
    pub fn toggled(self) -> Self {
        match self {
            Self::Back => Self::Front,
            Self::Front => Self::Back,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Back => write!(f, "back"),
            Self::Front => write!(f, "front"),
        }
    }
}

/// 列挙されたキャプチャデバイス
///
/// Device Registryが列挙した時点で確定し、プロセス生存期間中は不変。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// デバイス識別子（例: "camera:back:0"）
    pub id: String,
    /// 人間可読のデバイス名
    pub name: String,
    /// カメラの向き
    pub facing: Facing,
}

/// デバイスから生成され、セッションに束縛される入力オブジェクト
///
/// 同時にアクティブ（セッションに追加済み）になれるのは常に1つまで。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub device: CameraDevice,
}

impl DeviceInput {
    pub fn facing(&self) -> Facing {
        self.device.facing
    }
}

/// セッション状態機械
///
/// `Uninitialized -(configure)-> Configuring -(start)-> Running -(stop)-> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Configuring,
    Running,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Configuring => write!(f, "Configuring"),
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// セッションプリセット
///
/// 設定時に写真品質を優先し、未対応ならセッション既定へフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPreset {
    /// 静止画向けの最高品質
    Photo,
    /// セッション既定の品質
    #[default]
    Standard,
}

/// ピクセル形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// BGRA 8bit（連続メモリ）
    Bgra8,
    /// RGBA 8bit（連続メモリ）
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Bgra8 | Self::Rgba8 => 4,
        }
    }
}

/// 配信コールバック内でのみ有効な生フレームビュー
///
/// バッファは配信スレッドが所有しており、コールバックの外へ持ち出すには
/// `retain()`で明示的にコピーする必要がある。
#[derive(Debug)]
pub struct RawFrame<'a> {
    /// ピクセルデータ（配信スレッド所有のバッファへの借用）
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// 配信順に単調増加するシーケンス番号
    pub sequence: u64,
    /// フレーム取得時刻
    pub timestamp: Instant,
}

impl RawFrame<'_> {
    /// 所有コピーを作成し、コールバック外でも使える保持画像へ変換する
    ///
    /// フレームデータがコールバックを越えて生き延びる唯一のポイント。
    pub fn retain(&self) -> CameraResult<StillImage> {
        let expected = self.width as usize * self.height as usize * self.format.bytes_per_pixel();
        if self.data.len() < expected {
            return Err(CameraError::Conversion(format!(
                "frame buffer too small: {} bytes for {}x{}",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(StillImage {
            data: Arc::new(self.data[..expected].to_vec()),
            width: self.width,
            height: self.height,
            format: self.format,
        })
    }
}

/// 表示・推論に渡せる保持済み画像
///
/// クローンは`Arc`の参照コピーのみで、ピクセルデータは共有される。
#[derive(Debug, Clone)]
pub struct StillImage {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// 推論結果（トリガーされたフレームごとに最良ラベル1件）
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// 最良ラベル
    pub label: String,
    /// 信頼度スコア [0.0, 1.0]
    pub confidence: f32,
}

/// UIスレッド上で設置されたプレビューサーフェスのハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHandle(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_toggled() {
        assert_eq!(Facing::Back.toggled(), Facing::Front);
        assert_eq!(Facing::Front.toggled(), Facing::Back);
    }

    #[test]
    fn test_retain_copies_pixels() {
        let data = vec![7u8; 4 * 4 * 4];
        let frame = RawFrame {
            data: &data,
            width: 4,
            height: 4,
            format: PixelFormat::Bgra8,
            sequence: 1,
            timestamp: Instant::now(),
        };

        let image = frame.retain().unwrap();
        assert_eq!(image.width, 4);
        assert_eq!(image.data.len(), 64);
        assert!(image.data.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_retain_rejects_short_buffer() {
        let data = vec![0u8; 10];
        let frame = RawFrame {
            data: &data,
            width: 4,
            height: 4,
            format: PixelFormat::Bgra8,
            sequence: 1,
            timestamp: Instant::now(),
        };

        let result = frame.retain();
        assert!(matches!(result, Err(CameraError::Conversion(_))));
    }

    #[test]
    fn test_still_image_clone_shares_data() {
        let data = vec![1u8; 16];
        let frame = RawFrame {
            data: &data,
            width: 2,
            height: 2,
            format: PixelFormat::Bgra8,
            sequence: 1,
            timestamp: Instant::now(),
        };

        let image = frame.retain().unwrap();
        let clone = image.clone();
        assert!(Arc::ptr_eq(&image.data, &clone.data));
    }
}
