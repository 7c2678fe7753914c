/// エラー型定義
///
/// Domain層の統一エラー型。thiserrorを使用して型安全なエラー処理を提供します。
///
/// # 設計方針
/// - unwrap()の使用を禁止し、明示的なエラーハンドリングを強制
/// - 回復可能性をエラー型で表現（DeviceUnavailable vs InputSwitchFailed）
/// - フレーム単位のエラー（Conversion/Classification）はそのフレームだけに閉じる
use thiserror::Error;

use crate::domain::types::Facing;

/// Domain層の統一エラー型
#[derive(Error, Debug)]
pub enum CameraError {
    /// 必要なカメラデバイスが存在しない（Non-recoverable）
    ///
    /// 設定時に表面化し、起動シーケンスを中止させる。
    #[error("Camera device unavailable: {facing} camera not found")]
    DeviceUnavailable { facing: Facing },

    /// 入力切り替え失敗（Recoverable）
    ///
    /// セッションは直前のアクティブ入力のまま継続する。
    #[error("Input switch failed: {0}")]
    InputSwitchFailed(String),

    /// 状態機械の外での操作（呼び出し側のバグ）
    #[error("Invalid state for {operation}: {detail}")]
    InvalidState {
        operation: &'static str,
        detail: String,
    },

    /// フレーム変換エラー（フレーム単位、伝播しない）
    #[error("Frame conversion failed: {0}")]
    Conversion(String),

    /// 推論エラー（フレーム単位、結果を抑制するのみ）
    #[error("Classification failed: {0}")]
    Classification(String),

    /// 設定関連のエラー
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CameraError {
    /// 状態機械エラーの組み立てヘルパー
    pub fn invalid_state(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            detail: detail.into(),
        }
    }
}

/// Domain層の統一Result型
pub type CameraResult<T> = Result<T, CameraError>;
