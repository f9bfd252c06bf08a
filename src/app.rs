use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chain::{ChainSource, format_address};
use crate::cli::{usage_text, version_text};
use crate::command::AppCommand;
use crate::command_handlers::{
    alert_history, follow_validator, following_list, run_monitor, run_single_cycle,
    unfollow_validator, validator_status,
};
use crate::config::SentinelSettings;
use crate::database::{AlertHistoryRecord, SubscriptionRecord};
use crate::models::ValidatorSnapshot;
use crate::monitor::{CycleSummary, MonitorEvent};
use crate::notifier::{AlertMessage, AlertTransport};

pub type OutputHook = Arc<dyn Fn(&str) + Send + Sync>;
pub type EventHook = Arc<dyn Fn(&AppEvent) + Send + Sync>;

#[derive(Clone)]
pub struct AppContext {
    settings: SentinelSettings,
    output_hook: OutputHook,
    event_hook: EventHook,
    cancel_flag: Arc<AtomicBool>,
    chain_source: Option<Arc<dyn ChainSource>>,
    transport: Option<Arc<dyn AlertTransport>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppEvent {
    Info { message: String },
    Warn { message: String },
    Monitor { event: MonitorEvent },
    Cancelled { stage: String },
}

/// Result of a follow or unfollow request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub address: String,
    pub subscriber: String,
    /// False when the request was a no-op (already following / not following)
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub address: String,
    pub era: u32,
    pub active: bool,
    pub snapshot: ValidatorSnapshot,
    pub message: AlertMessage,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum AppCommandResult {
    HelpText(String),
    VersionText(String),
    Cycle(CycleSummary),
    MonitorStopped { cycles_run: u32 },
    Followed(SubscriptionChange),
    Unfollowed(SubscriptionChange),
    Following {
        subscriber: String,
        subscriptions: Vec<SubscriptionRecord>,
    },
    Status(Box<StatusReport>),
    History {
        address: String,
        alerts: Vec<AlertHistoryRecord>,
    },
}

impl Default for AppContext {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AppContext {
    pub fn from_env() -> Self {
        Self {
            settings: SentinelSettings::from_env(),
            output_hook: Arc::new(|line| println!("{}", line)),
            event_hook: Arc::new(|_| {}),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            chain_source: None,
            transport: None,
        }
    }

    pub fn with_settings(mut self, settings: SentinelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_output_hook(mut self, output_hook: OutputHook) -> Self {
        self.output_hook = output_hook;
        self
    }

    pub fn with_event_hook(mut self, event_hook: EventHook) -> Self {
        self.event_hook = event_hook;
        self
    }

    /// Use `source` instead of connecting to the configured chain API
    pub fn with_chain_source(mut self, source: Arc<dyn ChainSource>) -> Self {
        self.chain_source = Some(source);
        self
    }

    /// Use `transport` instead of Discord or the dry-run log
    pub fn with_transport(mut self, transport: Arc<dyn AlertTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn settings(&self) -> &SentinelSettings {
        &self.settings
    }

    pub(crate) fn injected_chain_source(&self) -> Option<Arc<dyn ChainSource>> {
        self.chain_source.clone()
    }

    pub(crate) fn injected_transport(&self) -> Option<Arc<dyn AlertTransport>> {
        self.transport.clone()
    }

    pub fn emit_line(&self, line: &str) {
        (self.output_hook)(line);
    }

    pub fn emit_event(&self, event: AppEvent) {
        (self.event_hook)(&event);
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn reset_cancel(&self) {
        self.cancel_flag.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}

/// Compatibility wrapper for CLI adapter entrypoint.
pub async fn run_with_ctrl_c<I, S>(args: I, context: &AppContext) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    crate::cli_adapter::run_with_ctrl_c(args, context).await
}

/// Compatibility wrapper for CLI adapter entrypoint.
pub async fn run_with_context<I, S>(args: I, context: &AppContext) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    crate::cli_adapter::run_with_context(args, context).await
}

/// Execute a pre-parsed command with an explicit execution context.
pub async fn execute_command_with_context(command: AppCommand, context: &AppContext) -> Result<()> {
    let result = execute_command_typed(command, context).await?;
    emit_command_result(&result, context)
}

/// Execute a pre-parsed command and return a strongly-typed result payload.
pub async fn execute_command_typed(
    command: AppCommand,
    context: &AppContext,
) -> Result<AppCommandResult> {
    match command {
        AppCommand::Help => Ok(AppCommandResult::HelpText(usage_text())),
        AppCommand::Version => Ok(AppCommandResult::VersionText(version_text())),
        AppCommand::Run => Ok(AppCommandResult::MonitorStopped {
            cycles_run: run_monitor(context).await?,
        }),
        AppCommand::Cycle => Ok(AppCommandResult::Cycle(run_single_cycle(context).await?)),
        AppCommand::Follow {
            address,
            subscriber,
        } => Ok(AppCommandResult::Followed(
            follow_validator(&address, &subscriber, context)?,
        )),
        AppCommand::Unfollow {
            address,
            subscriber,
        } => Ok(AppCommandResult::Unfollowed(
            unfollow_validator(&address, &subscriber, context)?,
        )),
        AppCommand::Following { subscriber } => {
            let subscriptions = following_list(&subscriber, context)?;
            Ok(AppCommandResult::Following {
                subscriber,
                subscriptions,
            })
        }
        AppCommand::Status { address } => Ok(AppCommandResult::Status(Box::new(
            validator_status(&address, context).await?,
        ))),
        AppCommand::History { address, limit } => {
            let alerts = alert_history(&address, limit, context)?;
            Ok(AppCommandResult::History { address, alerts })
        }
    }
}

fn emit_command_result(result: &AppCommandResult, context: &AppContext) -> Result<()> {
    match result {
        AppCommandResult::HelpText(text) | AppCommandResult::VersionText(text) => {
            context.emit_line(text);
        }
        AppCommandResult::Cycle(summary) => {
            let output = serde_json::to_string_pretty(summary)
                .context("Failed to serialize cycle summary")?;
            context.emit_line(&output);
        }
        AppCommandResult::MonitorStopped { cycles_run } => {
            context.emit_line(&format!("Monitoring stopped after {} cycles.", cycles_run));
        }
        AppCommandResult::Followed(change) => {
            let short = format_address(&change.address);
            if change.changed {
                context.emit_line(&format!("You are now following validator {}.", short));
            } else {
                context.emit_line(&format!("You are already following validator {}.", short));
            }
        }
        AppCommandResult::Unfollowed(change) => {
            let short = format_address(&change.address);
            if change.changed {
                context.emit_line(&format!("You have unfollowed validator {}.", short));
            } else {
                context.emit_line(&format!("You were not following validator {}.", short));
            }
        }
        AppCommandResult::Following {
            subscriptions,
            ..
        } => {
            if subscriptions.is_empty() {
                context.emit_line("You are not following any validators.");
            } else {
                context.emit_line("You are following:");
                for subscription in subscriptions {
                    context.emit_line(&format!("  {}", format_address(&subscription.address)));
                }
            }
        }
        AppCommandResult::Status(report) => {
            context.emit_line(&report.message.to_plain_text());
        }
        AppCommandResult::History { address, alerts } => {
            if alerts.is_empty() {
                context.emit_line(&format!(
                    "No alerts recorded for {}.",
                    format_address(address)
                ));
            } else {
                for alert in alerts {
                    context.emit_line(&format!(
                        "{} era {} {} [{}]{}",
                        alert.created_at.format("%Y-%m-%d %H:%M:%S"),
                        alert.era,
                        alert.alert_type,
                        alert.severity,
                        if alert.delivered { "" } else { " (not delivered)" }
                    ));
                }
            }
        }
    }
    Ok(())
}
