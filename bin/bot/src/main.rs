use chronobot_bot::config::BotConfig;
use chronobot_bot::error::StartupError;
use chronobot_bot::telegram::TelegramTransport;
use chronobot_bot::{build_calendar, build_classifier, build_driver, runner};
use rootcause::Report;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::error!(error = %report, "chronobot failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn serve() -> Result<(), Report<StartupError>> {
    // Load configuration from environment
    let config = BotConfig::from_env()?;
    tracing::info!(backend = ?config.calendar.backend, "Loaded configuration");

    let utc_offset = config.calendar.utc_offset()?;
    let classifier = build_classifier(&config.llm, utc_offset)?;
    let calendar = build_calendar(&config.calendar)?;
    let driver = build_driver(&config, classifier, calendar, utc_offset);

    let transport =
        TelegramTransport::new(&config.telegram).map_err(|e| StartupError::Backend {
            component: "Telegram transport",
            reason: e.to_string(),
        })?;

    // Spawn periodic sweep of expired dialogue state
    let sweeper = runner::spawn_sweeper(driver.clone(), config.dialogue.sweep_interval());

    tracing::info!("chronobot is polling for messages");
    runner::run(
        Arc::new(transport),
        driver,
        runner::RECEIVE_BACKOFF,
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        },
    )
    .await;

    sweeper.abort();
    tracing::info!("chronobot stopped");
    Ok(())
}
