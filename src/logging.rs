/// ログ・トレーシング基盤
///
/// tracingを使用した統一的なログ出力。フレーム破棄のようなHot Pathでは
/// ログを出さない方針のため、全ビルドで有効化している。
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ログシステムを初期化
///
/// # Arguments
/// - `log_level`: ログレベル（"info", "debug", "trace"等）
/// - `json_format`: JSON形式で出力するか
/// - `log_dir`: ログファイル出力先（None = 標準出力）
///
/// # Returns
/// ファイル出力時は`Some(WorkerGuard)`。プログラム終了まで保持必須
/// （Drop時にログスレッドがフラッシュされる）。
pub fn init_logging(
    log_level: &str,
    json_format: bool,
    log_dir: Option<PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match log_dir {
        Some(dir) => {
            // ファイル出力（非同期）
            if let Err(e) = std::fs::create_dir_all(&dir) {
                eprintln!("Failed to create log directory: {}", e);
                return None;
            }

            let file_appender = tracing_appender::rolling::daily(dir, "say_cheese.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let subscriber = tracing_subscriber::registry().with(env_filter);

            let result = if json_format {
                subscriber
                    .with(fmt::layer().json().with_writer(non_blocking))
                    .try_init()
            } else {
                subscriber
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_thread_ids(true)
                            .with_line_number(true)
                            .with_ansi(false) // ファイル出力時はANSIエスケープ無効
                            .with_writer(non_blocking),
                    )
                    .try_init()
            };

            if result.is_err() {
                return None;
            }

            info!(
                "Logging initialized (async file): level={}, format={}",
                log_level,
                if json_format { "json" } else { "text" }
            );
            Some(guard)
        }
        None => {
            // 標準出力
            let subscriber = tracing_subscriber::registry().with(env_filter);

            let result = if json_format {
                subscriber.with(fmt::layer().json()).try_init()
            } else {
                subscriber
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_thread_ids(true)
                            .with_line_number(true),
                    )
                    .try_init()
            };

            if result.is_ok() {
                info!(
                    "Logging initialized (stdout): level={}, format={}",
                    log_level,
                    if json_format { "json" } else { "text" }
                );
            }
            None
        }
    }
}
