//! Validator Sentinel: validator monitoring with deduplicated, rate-limited alerts
//!
//! This crate provides:
//! - A registry of tracked validators persisted as a JSON document
//! - Per-cycle change detection over the chain's active set
//! - An alert policy with a shared per-validator cooldown, edge-triggered
//!   slash alerts and a one-shot inactivity threshold ladder
//! - Alert delivery to Discord (or the log) with follower mentions
//! - SQLite storage for subscriptions and alert history

pub mod alerts;
pub mod app;
pub mod chain;
pub mod cli;
pub mod cli_adapter;
pub mod command;
mod command_handlers;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod notifier;
pub mod registry;

pub use alerts::{Alert, AlertKind, AlertPolicy, AlertSeverity, InactivityResetPolicy, PolicyAlert};
pub use app::{
    AppCommandResult, AppContext, AppEvent, EventHook, OutputHook, StatusReport,
    SubscriptionChange, execute_command_typed, execute_command_with_context, run_with_context,
    run_with_ctrl_c,
};
pub use chain::{ChainFuture, ChainSource, SidecarClient, format_address, validate_address};
pub use cli::{CliCommand, parse_cli_args, usage_text, version_text};
pub use command::AppCommand;
pub use config::*;
pub use database::{AlertHistoryRecord, Database, SubscriptionRecord};
pub use error::{CycleError, CycleResult};
pub use models::*;
pub use monitor::{CycleReport, CycleSummary, Monitor, MonitorEvent, run_cycle};
pub use notifier::{
    AlertMessage, AlertTransport, DiscordTransport, LogTransport, Notifier, TransportFuture,
};
pub use registry::{SlashState, ValidatorRecord, ValidatorRegistry};

// Re-export logging macros for use across crate
pub use crate::logging::macros;
