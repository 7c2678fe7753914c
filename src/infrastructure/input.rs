//! 対話入力
//!
//! シャッターボタンとカメラ切り替えボタンの代わりに標準入力を読む。
//! 入力スレッドはUIスレッドともセッションスレッドとも別で、
//! キャプチャ要求はフラグを立てるだけ、切り替えはセッションスレッドへ
//! ブロッキングで依頼する。

use std::io::BufRead;

use crate::application::{
    controller::SessionHandle, dispatcher::UiDispatcher, trigger::CaptureTrigger,
};
use crate::domain::Facing;

/// 標準入力から解釈するコマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 次のフレームをキャプチャする（空行でも発火する）
    Capture,
    /// 前面・背面カメラを切り替える
    Switch,
    /// セッションを停止して終了する
    Quit,
}

/// 1行をコマンドへ解釈する。未知の入力は`None`
pub fn read_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "c" | "capture" => Some(Command::Capture),
        "s" | "switch" => Some(Command::Switch),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

/// 標準入力のコマンドループ
///
/// EOFまたは`Quit`で、セッションを停止しUIループへ終了を通知してから戻る。
pub fn run_input_loop(trigger: CaptureTrigger, session: SessionHandle, ui: UiDispatcher) {
    tracing::info!("Input loop started (enter=capture, s=switch, q=quit)");
    let stdin = std::io::stdin();
    let mut facing = Facing::Back;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to read input: {}", e);
                break;
            }
        };

        match read_command(&line) {
            Some(Command::Capture) => {
                trigger.request();
                tracing::debug!("Capture requested");
            }
            Some(Command::Switch) => {
                let target = facing.toggled();
                match session.switch_input(target) {
                    Ok(()) => {
                        facing = target;
                        tracing::info!(facing = %facing, "Switched camera");
                    }
                    Err(e) => {
                        // 失敗時は切り替え前の入力が復元されている
                        tracing::warn!("Camera switch failed: {}", e);
                    }
                }
            }
            Some(Command::Quit) => break,
            None => {
                tracing::info!(input = %line.trim(), "Unknown command");
            }
        }
    }

    if let Err(e) = session.stop() {
        tracing::warn!("Failed to stop session: {}", e);
    }
    ui.shutdown();
    tracing::info!("Input loop terminated");
}
