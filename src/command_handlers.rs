use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use std::time::Duration;

use crate::alerts::AlertPolicy;
use crate::app::{AppContext, AppEvent, StatusReport, SubscriptionChange};
use crate::chain::{ChainSource, SidecarClient, format_address, validate_address};
use crate::database::{AlertHistoryRecord, Database, SubscriptionRecord, queries};
use crate::monitor::{CycleSummary, EventCallback, Monitor};
use crate::notifier::{AlertTransport, DiscordTransport, LogTransport, Notifier, render_status};
use crate::registry::ValidatorRegistry;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn ensure_not_cancelled(context: &AppContext, stage: &str) -> Result<()> {
    if context.is_cancelled() {
        context.emit_event(AppEvent::Cancelled {
            stage: stage.to_string(),
        });
        return Err(anyhow!("Operation cancelled during {}", stage));
    }
    Ok(())
}

fn ensure_valid_address(address: &str, context: &AppContext) -> Result<()> {
    let prefix = context.settings().ss58_prefix;
    if validate_address(address, prefix) {
        Ok(())
    } else {
        Err(anyhow!(
            "Invalid validator address '{}' (expected SS58 with prefix {})",
            address,
            prefix
        ))
    }
}

fn ensure_subscriber(subscriber: &str) -> Result<&str> {
    let subscriber = subscriber.trim();
    if subscriber.is_empty() {
        return Err(anyhow!("Subscriber id must not be empty"));
    }
    Ok(subscriber)
}

fn open_database(context: &AppContext) -> Result<Database> {
    let path = context.settings().database_path();
    Database::new(path.clone())
        .with_context(|| format!("Failed to open sentinel database at {}", path.display()))
}

/// Chain source for this command; a configured sidecar is checked once when `verify` is set.
async fn resolve_chain_source(context: &AppContext, verify: bool) -> Result<Arc<dyn ChainSource>> {
    if let Some(source) = context.injected_chain_source() {
        return Ok(source);
    }

    let settings = context.settings();
    let client = SidecarClient::new(settings.chain_api_url.clone(), settings.http_timeout())?;
    if verify {
        let chain = client
            .check_connection()
            .await
            .context("Initial chain connection failed")?;
        crate::log_stderr!("Connected to {} via {}", chain, settings.chain_api_url);
    }
    Ok(Arc::new(client))
}

async fn resolve_transport(context: &AppContext) -> Result<Arc<dyn AlertTransport>> {
    if let Some(transport) = context.injected_transport() {
        return Ok(transport);
    }

    let settings = context.settings();
    if settings.dry_run {
        let message = "Dry run: alerts are written to the log only".to_string();
        crate::log_stderr!("{}", message);
        context.emit_event(AppEvent::Info { message });
        return Ok(Arc::new(LogTransport));
    }

    let (Some(token), Some(channel_id)) = (
        settings.discord_token.as_deref(),
        settings.discord_channel_id.as_deref(),
    ) else {
        return Err(anyhow!(
            "DISCORD_TOKEN and DISCORD_CHANNEL_ID must be set (or SENTINEL_DRY_RUN=1)"
        ));
    };

    let transport = DiscordTransport::new(token, channel_id, settings.http_timeout())?;
    let channel = transport
        .check_channel()
        .await
        .context("Initial Discord channel check failed")?;
    crate::log_stderr!("Alerts will be posted to Discord channel #{}", channel);
    Ok(Arc::new(transport))
}

async fn build_monitor(context: &AppContext) -> Result<Monitor> {
    let source = resolve_chain_source(context, true).await?;
    let transport = resolve_transport(context).await?;
    let settings = context.settings();

    let registry = ValidatorRegistry::restore(settings.registry_path());
    if registry.is_empty() {
        context.emit_event(AppEvent::Warn {
            message: format!(
                "Validator registry at {} is empty; every active validator will be reported as newly joined",
                registry.path().display()
            ),
        });
    }
    let notifier = Notifier::new(transport, open_database(context)?);
    let policy = AlertPolicy::from_settings(settings);

    let event_context = context.clone();
    let on_event: EventCallback = Arc::new(move |event| {
        event_context.emit_event(AppEvent::Monitor { event });
    });

    Ok(Monitor::new(registry, source, notifier, policy)
        .with_interval(settings.monitor_interval())
        .with_max_concurrent(settings.max_concurrent_fetches)
        .with_event_callback(on_event))
}

pub(crate) async fn run_single_cycle(context: &AppContext) -> Result<CycleSummary> {
    ensure_not_cancelled(context, "cycle")?;
    let mut monitor = build_monitor(context).await?;
    let summary = monitor.run_once().await?;
    Ok(summary)
}

pub(crate) async fn run_monitor(context: &AppContext) -> Result<u32> {
    ensure_not_cancelled(context, "run")?;
    let mut monitor = build_monitor(context).await?;

    let cancel_context = context.clone();
    let shutdown = async move {
        while !cancel_context.is_cancelled() {
            tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
        }
    };

    monitor.run(shutdown).await;
    Ok(monitor.cycles_run())
}

pub(crate) fn follow_validator(
    address: &str,
    subscriber: &str,
    context: &AppContext,
) -> Result<SubscriptionChange> {
    ensure_valid_address(address, context)?;
    let subscriber = ensure_subscriber(subscriber)?;

    let db = open_database(context)?;
    let changed = {
        let conn = db.lock()?;
        queries::add_subscription(&conn, address, subscriber)?
    };
    if changed {
        crate::log_stderr!("{} now follows {}", subscriber, format_address(address));
    }

    Ok(SubscriptionChange {
        address: address.to_string(),
        subscriber: subscriber.to_string(),
        changed,
    })
}

/// Unfollow accepts any address so stale subscriptions can always be removed.
pub(crate) fn unfollow_validator(
    address: &str,
    subscriber: &str,
    context: &AppContext,
) -> Result<SubscriptionChange> {
    let subscriber = ensure_subscriber(subscriber)?;

    let db = open_database(context)?;
    let changed = {
        let conn = db.lock()?;
        queries::remove_subscription(&conn, address, subscriber)?
    };
    if changed {
        crate::log_stderr!("{} unfollowed {}", subscriber, format_address(address));
    }

    Ok(SubscriptionChange {
        address: address.to_string(),
        subscriber: subscriber.to_string(),
        changed,
    })
}

pub(crate) fn following_list(
    subscriber: &str,
    context: &AppContext,
) -> Result<Vec<SubscriptionRecord>> {
    let subscriber = ensure_subscriber(subscriber)?;
    let db = open_database(context)?;
    let conn = db.lock()?;
    queries::followed_by(&conn, subscriber)
}

pub(crate) fn alert_history(
    address: &str,
    limit: u32,
    context: &AppContext,
) -> Result<Vec<AlertHistoryRecord>> {
    let db = open_database(context)?;
    let conn = db.lock()?;
    queries::recent_alerts(&conn, address, limit.max(1))
}

pub(crate) async fn validator_status(address: &str, context: &AppContext) -> Result<StatusReport> {
    ensure_not_cancelled(context, "status")?;
    ensure_valid_address(address, context)?;

    let source = resolve_chain_source(context, false).await?;
    let (active_set, era) = tokio::join!(source.active_validators(), source.current_era());

    let era = era
        .context("Failed to query current era")?
        .filter(|era| *era > 0)
        .ok_or_else(|| anyhow!("Current era unavailable; try again later"))?;
    let active = active_set
        .context("Failed to query active validator set")?
        .iter()
        .any(|a| a == address);

    let snapshot = source
        .fetch_snapshot(address, era)
        .await
        .with_context(|| format!("Failed to fetch status for {}", format_address(address)))?;
    let message = render_status(&snapshot, active);

    Ok(StatusReport {
        address: address.to_string(),
        era,
        active,
        snapshot,
        message,
    })
}
