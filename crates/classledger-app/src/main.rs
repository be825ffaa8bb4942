use std::path::PathBuf;

use classledger_lib::application::services::ConfigService;
use classledger_lib::presentation::AppState;

/// Maintenance worker: loads config, migrates the store and runs the expiry
/// sweep on its interval until Ctrl-C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional explicit config path; otherwise the platform config dir
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ConfigService::load_or_default(config_path);

    let log_dir = config.config().logging.resolve_log_dir();
    let level = config.get_log_level();
    match classledger_infrastructure::logging::init_logger(&log_dir, level.as_str()) {
        Ok(_) => {
            tracing::info!("🚀 classledger starting...");
            tracing::info!("📝 File logging initialized at: {}", log_dir.display());
        }
        Err(e) => {
            eprintln!("⚠️  Failed to initialize file logging: {}", e);
            eprintln!("   Falling back to console logging only");

            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_str())),
                )
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .try_init();
        }
    }

    tracing::info!("🚀 Starting app state initialization...");
    let state = match AppState::new(config).await {
        Ok(state) => {
            tracing::info!("✅ App state initialized successfully");
            state
        }
        Err(e) => {
            tracing::error!("❌ Failed to initialize app state: {:#}", e);
            return Err(e);
        }
    };

    let maintenance = &state.config().maintenance;
    if maintenance.enabled {
        state
            .services
            .scheduler
            .start(maintenance.sweep_interval())
            .await;
    } else {
        tracing::info!("Maintenance sweep disabled in config");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutdown requested");

    state.shutdown().await;
    tracing::info!("👋 classledger stopped");
    Ok(())
}
