use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use slotfire_client::{HttpReservationClient, ReservationClient, SntpClock};
use slotfire_core::config::DEFAULT_CONFIG_PATH;
use slotfire_core::cookie::mask;
use slotfire_core::{NameIndex, SlotfireConfig, TargetRegistry, TicketInventory};
use slotfire_scheduler::{
    ClockOffset, ClockSyncService, DispatchReport, Dispatcher, RetryPolicy, SystemClock,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fire reservation requests at each target's open time.
#[derive(Debug, Parser)]
#[command(name = "slotfire", version)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "slotfire=info,slotfire_core=info,slotfire_client=info,slotfire_scheduler=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    info!(config = %cli.config, "slotfire started");

    match run(&cli).await {
        Ok(report) => {
            if !report.all_succeeded() {
                warn!(
                    succeeded = report.succeeded(),
                    total = report.outcomes.len(),
                    "not every target was reserved"
                );
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal error, exiting");
            Err(e)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<DispatchReport> {
    let config = SlotfireConfig::load(Some(&cli.config)).context("failed to load config")?;
    let registry = TargetRegistry::from_config(&config).context("invalid job configuration")?;
    info!(targets = registry.len(), "config loaded");
    debug!(token = %mask(registry.token()), "csrf token extracted");

    // clock offset: one reading now, hourly refresh once dispatch starts
    let offset = ClockOffset::new();
    let sync = ClockSyncService::new(
        Arc::new(SntpClock::new(
            config.clock.ntp_server.clone(),
            config.clock.query_timeout(),
        )),
        offset.clone(),
        config.clock.sync_interval(),
    );
    sync.sync_once().await;

    let client: Arc<dyn ReservationClient> = Arc::new(
        HttpReservationClient::new(&config.endpoints, &config.cookie)
            .context("failed to build HTTP client")?,
    );
    let catalog = client
        .fetch_catalog(registry.token())
        .await
        .context("failed to fetch reservation catalog")?;

    let inventory = Arc::new(TicketInventory::from_catalog(&catalog));
    let names = Arc::new(NameIndex::from_catalog(&catalog));
    inventory.log_available();

    let resolved = registry.resolve(&catalog);
    if !resolved.missing.is_empty() {
        warn!(missing = ?resolved.missing, "some configured targets will not be scheduled");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, cancelling schedulers");
            on_signal.cancel();
        }
    });

    let report = Dispatcher::new(
        client,
        offset,
        Arc::new(SystemClock),
        RetryPolicy::from(&config.retry),
    )
    .with_labels(names, inventory)
    .run(sync, resolved.jobs, cancel)
    .await;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_defaults() {
        let cli = Cli::try_parse_from(["slotfire"]).unwrap();
        assert_eq!(cli.config, "config.json");
    }

    #[test]
    fn config_path_positional() {
        let cli = Cli::try_parse_from(["slotfire", "/etc/slotfire/bws.json"]).unwrap();
        assert_eq!(cli.config, "/etc/slotfire/bws.json");
    }

    #[test]
    fn rejects_extra_arguments() {
        assert!(Cli::try_parse_from(["slotfire", "a.json", "b.json"]).is_err());
    }
}
