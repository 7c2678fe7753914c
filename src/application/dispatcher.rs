//! UIスレッドディスパッチャ
//!
//! メインスレッドが消費するタスクキュー。プレビューサーフェスの設置と
//! 画像の表示は必ずこのキューを経由してUIスレッド上で実行される。
//!
//! セッション構成はバックグラウンドスレッドで走るため、プレビュー設置は
//! バックグラウンド→メイン→バックグラウンドの明示的な往復になる
//! （`install_preview`が返信チャネルで結果を待つ）。

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::domain::{CameraError, CameraResult, DisplaySinkPort, StillImage, SurfaceHandle};

/// UIスレッドで実行されるタスク
pub enum UiTask {
    /// プレビューサーフェスの設置要求（結果をreplyへ返信する）
    InstallPreview { reply: Sender<SurfaceHandle> },
    /// 保持済み画像の表示
    Present(StillImage),
    /// UIループの終了
    Shutdown,
}

/// UIタスクの送信側ハンドル（任意のスレッドからクローンして使える）
#[derive(Clone)]
pub struct UiDispatcher {
    tx: Sender<UiTask>,
}

impl UiDispatcher {
    /// ディスパッチャとUIループ用の受信側を作成する
    pub fn new() -> (Self, Receiver<UiTask>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// プレビュー設置をUIスレッドへ依頼し、ハンドルの返信を待つ
    ///
    /// 呼び出し元（セッションスレッド）はUIループが応答するまでブロックする。
    pub fn install_preview(&self) -> CameraResult<SurfaceHandle> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(UiTask::InstallPreview { reply: reply_tx })
            .map_err(|_| CameraError::Configuration("UI loop is not running".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| CameraError::Configuration("UI loop dropped preview request".to_string()))
    }

    /// 表示要求を送る
    ///
    /// UIループ終了後に届いた要求は黙って破棄される（クラッシュさせない）。
    pub fn present(&self, image: StillImage) {
        let _ = self.tx.send(UiTask::Present(image));
    }

    /// UIループへ終了を通知する
    pub fn shutdown(&self) {
        let _ = self.tx.send(UiTask::Shutdown);
    }
}

/// UIループ本体（メインスレッドで実行する）
///
/// `Shutdown`受信かチャネル切断で戻る。
pub fn run_ui_loop(rx: Receiver<UiTask>, display: &mut dyn DisplaySinkPort) {
    tracing::info!("UI loop started");

    for task in rx.iter() {
        match task {
            UiTask::InstallPreview { reply } => {
                let surface = display.install_preview();
                let _ = reply.send(surface);
            }
            UiTask::Present(image) => {
                display.present(image);
            }
            UiTask::Shutdown => break,
        }
    }

    tracing::info!("UI loop terminated");
}
