//! 入力スイッチャ
//!
//! 設定トランザクション内でアクティブ入力を入れ替える。
//! 不変条件: アクティブ入力は操作の前後を通して常に0または1。切り替えが
//! 失敗した場合は直前の入力をベストエフォートで復元し、切り替え前に入力が
//! あったならゼロ入力のまま放置しない。

use crate::application::session::CaptureSession;
use crate::domain::{CameraDevice, CameraError, CameraResult, DeviceInput};

/// アクティブ入力を`device`の入力へ入れ替える
///
/// 開いている設定トランザクションの中で呼ぶこと（外で呼ぶと`InvalidState`）。
///
/// # Returns
/// - `Ok(())`: 新しい入力が設置された
/// - `Err(CameraError::InputSwitchFailed)`: 構築または受け入れ検証に失敗。
///   直前の入力は復元済み
pub fn activate(session: &mut CaptureSession, device: &CameraDevice) -> CameraResult<()> {
    let previous = session.remove_input()?;

    let input = match session.create_input(device) {
        Ok(input) => input,
        Err(e) => {
            restore(session, previous);
            return Err(CameraError::InputSwitchFailed(format!(
                "could not create input for {}: {}",
                device.id, e
            )));
        }
    };

    if !session.can_add_input(&input) {
        restore(session, previous);
        return Err(CameraError::InputSwitchFailed(format!(
            "session cannot accept input for {}",
            device.id
        )));
    }

    session.add_input(input)?;
    tracing::info!(device = %device.id, facing = %device.facing, "Active input switched");
    Ok(())
}

/// 直前の入力をベストエフォートで戻す
fn restore(session: &mut CaptureSession, previous: Option<DeviceInput>) {
    if let Some(previous) = previous {
        if let Err(e) = session.add_input(previous) {
            tracing::warn!("Failed to restore previous input: {:?}", e);
        }
    }
}
