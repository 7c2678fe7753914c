//! モック分類アダプタ
//!
//! 推論エンジンはブラックボックスの外部コラボレータ扱い。設定された
//! ラベルと信頼度を返すだけだが、疑似レイテンシを挟むことで
//! 「遅い推論が配信を妨げない」性質の確認に使える。

use std::time::Duration;

use crate::domain::{
    CameraError, CameraResult, ClassificationResult, ClassifierConfig, ClassifierPort, StillImage,
};

/// 設定駆動のモック分類器
///
/// フレーム間の可変状態を持たないため、並行呼び出しに安全。
pub struct MockClassifierAdapter {
    label: String,
    confidence: f32,
    latency: Duration,
}

impl MockClassifierAdapter {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            label: config.label.clone(),
            confidence: config.confidence,
            latency: config.latency(),
        }
    }
}

impl ClassifierPort for MockClassifierAdapter {
    fn classify(&self, image: &StillImage) -> CameraResult<ClassificationResult> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        if image.data.is_empty() {
            return Err(CameraError::Classification(
                "empty image buffer".to_string(),
            ));
        }

        Ok(ClassificationResult {
            label: self.label.clone(),
            confidence: self.confidence,
        })
    }
}
