//! セッションコントローラ
//!
//! 状態機械 `Uninitialized -(configure)-> Configuring -(start)-> Running
//! -(stop)-> Stopped` を所有し、キャプチャセッションへの変更をすべて仲介する。
//! 停止後は新しい`configure()`を経由しない限り`Running`へ戻れない。
//!
//! # スレッドモデル
//! セッションの開閉はブロッキング処理のため、configure/start/stopは
//! UIスレッドではなく専用のセッションスレッド（`run_session_loop`）で実行する。
//! プレビューサーフェスの設置だけはUI所有の状態に触るため、
//! `UiDispatcher::install_preview`でメインスレッドへ往復する。

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::application::{
    dispatcher::UiDispatcher,
    pipeline::FramePipeline,
    session::CaptureSession,
    switcher,
    trigger::CaptureTrigger,
};
use crate::domain::{
    CameraError, CameraResult, ClassifierPort, DeviceRegistryPort, Facing, SessionPreset,
    SessionState,
};

/// セッションコントローラ
pub struct SessionController {
    state: SessionState,
    session: CaptureSession,
    registry: Arc<dyn DeviceRegistryPort>,
    classifier: Arc<dyn ClassifierPort>,
    ui: UiDispatcher,
    trigger: CaptureTrigger,
    pipeline: Option<Arc<FramePipeline>>,
}

impl SessionController {
    pub fn new(
        session: CaptureSession,
        registry: Arc<dyn DeviceRegistryPort>,
        classifier: Arc<dyn ClassifierPort>,
        ui: UiDispatcher,
    ) -> Self {
        Self {
            state: SessionState::Uninitialized,
            session,
            registry,
            classifier,
            ui,
            trigger: CaptureTrigger::new(),
            pipeline: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// キャプチャ要求フラグ（UIトリガー側が保持する）
    pub fn trigger(&self) -> CaptureTrigger {
        self.trigger.clone()
    }

    /// 現在アクティブな入力の向き（滞留中の変更を含む）
    pub fn active_facing(&self) -> Option<Facing> {
        self.session.current_input().map(|i| i.facing())
    }

    /// セッションを構成する
    ///
    /// `Uninitialized`または`Stopped`からのみ呼べる。設定トランザクションを
    /// 開いたまま戻り、`start()`がコミットする。
    ///
    /// 手順: プリセット選択 → 背面入力の設置 → 出力シンクの設置 →
    /// プレビューサーフェスの設置（UIスレッドへの往復）。
    ///
    /// # Errors
    /// デバイスまたは入力の構築失敗は`DeviceUnavailable`として表面化し、
    /// 起動シーケンスを中止させる（プロセスは落とさない）。
    pub fn configure(&mut self) -> CameraResult<()> {
        match self.state {
            SessionState::Uninitialized | SessionState::Stopped => {}
            state => {
                return Err(CameraError::invalid_state("configure", state.to_string()));
            }
        }
        self.state = SessionState::Configuring;
        tracing::info!("Configuring capture session...");

        self.session.begin_configuration()?;

        // 写真品質プリセットを優先し、未対応ならセッション既定のまま
        // （未対応はエラーではない）
        if self.session.supports_preset(SessionPreset::Photo) {
            self.session.set_preset(SessionPreset::Photo)?;
            tracing::debug!("Session preset set to photo quality");
        } else {
            tracing::info!("Photo preset unsupported, keeping session default");
        }

        // 既定の背面カメラを設置。構築失敗は起動時には致命的
        let back = self.registry.enumerate(Facing::Back)?;

        // 前面カメラの存在も起動時に検証する（入力の構築は切り替え時）
        self.registry.enumerate(Facing::Front)?;

        switcher::activate(&mut self.session, &back).map_err(|e| {
            tracing::error!("Could not install default input: {:?}", e);
            CameraError::DeviceUnavailable {
                facing: Facing::Back,
            }
        })?;

        // フレームパイプラインを出力シンクとして設置
        let pipeline = Arc::new(FramePipeline::new(
            self.trigger.clone(),
            Arc::clone(&self.classifier),
            self.ui.clone(),
        ));
        self.session.set_output(Arc::clone(&pipeline).handler())?;
        self.pipeline = Some(pipeline);

        // プレビュー設置はUIスレッドで実行される（トランザクション中、コミット前）
        let surface = self.ui.install_preview()?;
        tracing::info!(surface = surface.0, "Preview surface installed");

        Ok(())
    }

    /// 滞留中の設定をアトミックにコミットし、フレーム配信を開始する
    ///
    /// すでに`Running`なら何もしない。`configure()`前の呼び出しは`InvalidState`。
    pub fn start(&mut self) -> CameraResult<()> {
        match self.state {
            SessionState::Running => return Ok(()),
            SessionState::Configuring => {}
            state => {
                return Err(CameraError::invalid_state("start", state.to_string()));
            }
        }

        self.session.commit_configuration()?;
        self.session.start_running()?;
        self.state = SessionState::Running;
        tracing::info!(
            preset = ?self.session.preset(),
            device = self
                .session
                .committed_input()
                .map(|i| i.device.id.as_str())
                .unwrap_or("none"),
            "Capture session running"
        );
        Ok(())
    }

    /// フレーム配信を停止する
    ///
    /// 配信スレッドを排水してから戻る（以後フレームは届かない）。
    /// 進行中の推論ワーカーは待たず、以降の遅延ディスパッチは破棄される。
    pub fn stop(&mut self) -> CameraResult<()> {
        match self.state {
            SessionState::Stopped => return Ok(()),
            SessionState::Running => {}
            state => {
                return Err(CameraError::invalid_state("stop", state.to_string()));
            }
        }

        if let Some(pipeline) = &self.pipeline {
            pipeline.halt();
        }
        self.session.stop_running();
        self.state = SessionState::Stopped;

        if let Some(pipeline) = self.pipeline.take() {
            let stats = pipeline.stats();
            tracing::info!(
                delivered = stats.delivered_frames,
                triggered = stats.triggered_frames,
                "Capture session stopped"
            );
        }
        Ok(())
    }

    /// アクティブ入力を指定の向きのデバイスへ切り替える
    ///
    /// `Configuring`（開いているトランザクションを使う）または`Running`
    /// （自前のトランザクションを開いてコミットする）でのみ許可される。
    pub fn switch_input(&mut self, facing: Facing) -> CameraResult<()> {
        let device = self.registry.enumerate(facing)?;

        match self.state {
            SessionState::Configuring => switcher::activate(&mut self.session, &device),
            SessionState::Running => {
                self.session.begin_configuration()?;
                let result = switcher::activate(&mut self.session, &device);
                // 失敗時も復元済みの状態をコミットして反映する
                let commit = self.session.commit_configuration();
                result.and(commit)
            }
            state => Err(CameraError::invalid_state(
                "switch_input",
                state.to_string(),
            )),
        }
    }
}

/// セッションスレッドへの操作コマンド
pub enum SessionCommand {
    Configure { reply: Sender<CameraResult<()>> },
    Start { reply: Sender<CameraResult<()>> },
    Stop { reply: Sender<CameraResult<()>> },
    SwitchInput {
        facing: Facing,
        reply: Sender<CameraResult<()>>,
    },
}

/// セッションスレッドのハンドル
///
/// どのスレッドからでもクローンして使える。各操作はセッションスレッドで
/// 実行され、完了まで呼び出し元をブロックする。
#[derive(Clone)]
pub struct SessionHandle {
    tx: Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn configure(&self) -> CameraResult<()> {
        self.call(|reply| SessionCommand::Configure { reply })
    }

    pub fn start(&self) -> CameraResult<()> {
        self.call(|reply| SessionCommand::Start { reply })
    }

    pub fn stop(&self) -> CameraResult<()> {
        self.call(|reply| SessionCommand::Stop { reply })
    }

    pub fn switch_input(&self, facing: Facing) -> CameraResult<()> {
        self.call(|reply| SessionCommand::SwitchInput { facing, reply })
    }

    fn call(
        &self,
        command: impl FnOnce(Sender<CameraResult<()>>) -> SessionCommand,
    ) -> CameraResult<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(command(reply_tx))
            .map_err(|_| CameraError::Configuration("session thread terminated".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| CameraError::Configuration("session thread terminated".to_string()))?
    }
}

/// コントローラを専有するセッションスレッドを起動する
pub fn spawn_session_thread(
    controller: SessionController,
) -> CameraResult<(SessionHandle, JoinHandle<()>)> {
    let (tx, rx) = unbounded();
    let handle = std::thread::Builder::new()
        .name("capture-session".to_string())
        .spawn(move || run_session_loop(controller, rx))
        .map_err(|e| {
            CameraError::Configuration(format!("failed to spawn session thread: {}", e))
        })?;
    Ok((SessionHandle { tx }, handle))
}

/// セッションスレッドのメインループ
///
/// 全ハンドルのDrop（チャネル切断）で戻る。稼働中なら停止してから戻る。
pub fn run_session_loop(mut controller: SessionController, rx: Receiver<SessionCommand>) {
    tracing::info!("Session thread started");

    for command in rx.iter() {
        match command {
            SessionCommand::Configure { reply } => {
                let _ = reply.send(controller.configure());
            }
            SessionCommand::Start { reply } => {
                let _ = reply.send(controller.start());
            }
            SessionCommand::Stop { reply } => {
                let _ = reply.send(controller.stop());
            }
            SessionCommand::SwitchInput { facing, reply } => {
                let _ = reply.send(controller.switch_input(facing));
            }
        }
    }

    if controller.state() == SessionState::Running {
        let _ = controller.stop();
    }
    tracing::info!("Session thread terminated");
}
