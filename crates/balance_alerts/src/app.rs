// Rust guideline compliant 2026-10-19

//! Service wiring shared by the `balance_alerts` binaries.
//!
//! Only the state store differs between binaries; everything else is built
//! here from the loaded [`AppConfig`].

use alert_engine::AlertEngine;
use anyhow::Context as _;
use domain::StateStore;
use scheduler::Scheduler;
use std::time::Duration;
use tracing::Instrument as _;

use crate::adapters::runpod_client::RunpodClient;
use crate::adapters::telegram::{SEND_TIMEOUT, TelegramApi, TelegramCommands, TelegramNotifier};
use crate::config::AppConfig;

/// Worst case of one poll: a fully failing fetch followed by one send.
fn poll_budget(source: &RunpodClient) -> Duration {
    source.fetch_budget() + SEND_TIMEOUT
}

/// Run the scheduler and the `/balance` listener until CTRL+C.
///
/// # Errors
///
/// Returns an error when an HTTP client cannot be built or the CTRL+C
/// handler cannot be installed. Runtime fetch and delivery failures are
/// logged and never end the service.
pub async fn serve<S: StateStore>(config: AppConfig, store: S) -> anyhow::Result<()> {
    let AppConfig {
        runpod_api_key,
        telegram_bot_token,
        telegram_chat_id,
        alert,
        schedule,
        ..
    } = config;

    let source = RunpodClient::new(runpod_api_key).context("failed to build RunPod client")?;
    let api = TelegramApi::new(&telegram_bot_token).context("failed to build Telegram client")?;
    let notifier = TelegramNotifier::new(api.clone(), telegram_chat_id.clone());
    let commands = TelegramCommands::new(api, telegram_chat_id);

    tracing::info!(
        low_balance_usd = alert.low_balance_usd,
        recovery_usd = alert.recovery_threshold(),
        pod_stop_balance_usd = alert.pod_stop_balance_usd,
        poll_interval = ?schedule.poll_interval,
        daily_at = %schedule.daily_at,
        timezone = %schedule.timezone,
        "app.starting"
    );

    let budget = poll_budget(&source);
    if budget > schedule.invocation_timeout {
        tracing::warn!(
            ?budget,
            timeout = ?schedule.invocation_timeout,
            "app.poll_budget.exceeds_timeout: slow polls will be cut short"
        );
    }

    let engine = AlertEngine::new(alert, source, notifier, store).await;
    let scheduler = Scheduler::new(schedule);
    commands.register().await;

    // The scheduler only returns when an iteration limit is configured.
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for CTRL+C")?;
            tracing::info!("app.shutdown: ctrl_c received");
        }
        () = scheduler.run(&engine).instrument(tracing::info_span!("scheduler")) => {
            tracing::info!("app.shutdown: scheduler stopped");
        }
        () = commands.run(engine.source()).instrument(tracing::info_span!("commands")) => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::poll_budget;
    use crate::adapters::runpod_client::RunpodClient;
    use scheduler::SchedulerConfig;
    use std::time::Duration;

    #[test]
    fn default_timeout_fits_a_failing_fetch_and_a_send() {
        let source = RunpodClient::new("key").unwrap();
        let config = SchedulerConfig::builder(Duration::from_secs(300)).build().unwrap();
        // 18 s of fetch attempts and pauses plus a 10 s send.
        assert_eq!(poll_budget(&source), Duration::from_secs(28));
        assert!(poll_budget(&source) <= config.invocation_timeout);
    }
}
