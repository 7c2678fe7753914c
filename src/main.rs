mod application;
mod domain;
mod infrastructure;
mod logging;

use crate::application::controller::{spawn_session_thread, SessionController};
use crate::application::dispatcher::{run_ui_loop, UiDispatcher};
use crate::application::session::CaptureSession;
use crate::domain::config::AppConfig;
use crate::infrastructure::input::run_input_loop;
use crate::infrastructure::{
    ConsoleDisplayAdapter, MockClassifierAdapter, StaticDeviceRegistry, SyntheticFrameSource,
};
use crate::logging::init_logging;
use std::sync::Arc;

fn main() {
    // 設定ファイルの読み込み（存在しない場合はデフォルト設定を使用）
    let (config, config_warning) = match AppConfig::from_file("config.toml") {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // ログシステムの初期化（設定読み込み後。ファイル出力時は非同期）
    let _guard = init_logging(
        &config.logging.level,
        config.logging.json,
        config.logging.dir.clone(),
    );
    // 注意: _guardはmain終了まで保持する必要がある（Dropでログスレッドが終了）

    tracing::info!("SayCheese starting...");

    match config_warning {
        None => tracing::info!("Loaded configuration from config.toml"),
        Some(e) => tracing::warn!("Failed to load config.toml: {:?}, using defaults", e),
    }

    match run(config) {
        Ok(_) => {
            tracing::info!("SayCheese terminated gracefully.");
        }
        Err(e) => {
            tracing::error!("Fatal error: {:?}", e);
            std::process::exit(1);
        }
    }
}

/// アプリケーションのメイン処理
///
/// メインスレッドはUIループを専有する。セッションの構成・開始は
/// ブートストラップスレッドで実行する（構成中のプレビュー設置が
/// UIループへの往復を必要とするため、メインスレッドからは呼べない）。
fn run(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    tracing::info!("Configuration validated successfully");
    tracing::info!(
        "Capture: {}x{} every {}ms, photo preset supported={}",
        config.capture.frame_width,
        config.capture.frame_height,
        config.capture.frame_interval_ms,
        config.capture.photo_preset_supported
    );
    tracing::info!(
        "Classifier: label=\"{}\", latency={}ms",
        config.classifier.label,
        config.classifier.latency_ms
    );

    // アダプタの組み立て
    let registry = Arc::new(StaticDeviceRegistry::from_config(&config));
    let source = SyntheticFrameSource::from_config(&config.capture);
    let classifier = Arc::new(MockClassifierAdapter::from_config(&config.classifier));
    let mut display = ConsoleDisplayAdapter::new();

    let (ui, ui_rx) = UiDispatcher::new();

    let controller = SessionController::new(
        CaptureSession::new(Box::new(source)),
        registry,
        classifier,
        ui.clone(),
    );
    let trigger = controller.trigger();

    tracing::info!("Threads: UI (main) / capture-session / frame-delivery / input");

    let (session, session_thread) = spawn_session_thread(controller)?;

    // 構成と開始はバックグラウンドで。失敗時はUIループを終了させる
    let (boot_tx, boot_rx) = crossbeam_channel::bounded(1);
    let boot_session = session.clone();
    let boot_ui = ui.clone();
    let bootstrap_thread = std::thread::Builder::new()
        .name("bootstrap".to_string())
        .spawn(move || {
            let result = boot_session.configure().and_then(|_| boot_session.start());
            if result.is_err() {
                boot_ui.shutdown();
            }
            let _ = boot_tx.send(result);
        })?;

    let input_session = session.clone();
    let input_ui = ui.clone();
    let input_thread = std::thread::Builder::new()
        .name("input".to_string())
        .spawn(move || run_input_loop(trigger, input_session, input_ui))?;

    // メインスレッドがUIループになる（ShutdownまたはチャネルDropで戻る）
    run_ui_loop(ui_rx, &mut display);

    let boot_result = boot_rx
        .recv()
        .unwrap_or_else(|_| Err(domain::CameraError::Configuration(
            "bootstrap thread terminated without result".to_string(),
        )));
    let _ = bootstrap_thread.join();

    if let Err(e) = boot_result {
        // 入力スレッドは標準入力でブロックしたままのため待たない
        drop(session);
        return Err(e.into());
    }

    // UIループの終了は入力ループのquit経由。セッションは停止済み
    let _ = input_thread.join();
    drop(session);
    let _ = session_thread.join();

    Ok(())
}
