//! Alert delivery
//!
//! The [`Notifier`] renders alerts, mentions followers and records history.
//! Delivery goes through an [`AlertTransport`]; a failed send is logged and
//! never retried, and never feeds back into registry state.

pub mod discord;
pub mod render;

use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::alerts::Alert;
use crate::chain::format_address;
use crate::database::{Database, queries};

pub use discord::DiscordTransport;
pub use render::{AlertMessage, MessageField, mention_text, render_alert, render_status};

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Destination channel for rendered alerts
pub trait AlertTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send a plain text line (used for follower mentions)
    fn send_text<'a>(&'a self, text: &'a str) -> TransportFuture<'a>;

    /// Send a rich alert message
    fn send_message<'a>(&'a self, message: &'a AlertMessage) -> TransportFuture<'a>;
}

/// Writes alerts to the log instead of a chat channel (dry runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl AlertTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    fn send_text<'a>(&'a self, text: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            crate::log_stderr!("[dry-run] {}", text);
            Ok(())
        })
    }

    fn send_message<'a>(&'a self, message: &'a AlertMessage) -> TransportFuture<'a> {
        Box::pin(async move {
            crate::log_stderr!("[dry-run] {}", message.to_plain_text());
            Ok(())
        })
    }
}

pub struct Notifier {
    transport: Arc<dyn AlertTransport>,
    database: Database,
}

impl Notifier {
    pub fn new(transport: Arc<dyn AlertTransport>, database: Database) -> Self {
        Self {
            transport,
            database,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Deliver one alert. Returns whether the alert message itself was sent.
    pub async fn notify(&self, alert: &Alert) -> bool {
        let short = format_address(&alert.address);
        let subscribers = self.subscribers_of(&alert.address);

        if !subscribers.is_empty() {
            let text = mention_text(&alert.address, &subscribers);
            if let Err(e) = self.transport.send_text(&text).await {
                crate::log_error!(
                    "Failed to send follower mention for {} via {}: {:#}",
                    short,
                    self.transport.name(),
                    e
                );
            }
        }

        let message = render_alert(alert);
        let delivered = match self.transport.send_message(&message).await {
            Ok(()) => true,
            Err(e) => {
                crate::log_error!(
                    "Failed to deliver {} alert for {} via {}: {:#}",
                    alert.kind.as_str(),
                    short,
                    self.transport.name(),
                    e
                );
                false
            }
        };

        self.record_history(alert, &message, delivered);
        delivered
    }

    /// Deliver alerts in order; returns how many were sent
    pub async fn notify_all(&self, alerts: &[Alert]) -> usize {
        let mut delivered = 0;
        for alert in alerts {
            if self.notify(alert).await {
                delivered += 1;
            }
        }
        delivered
    }

    fn subscribers_of(&self, address: &str) -> Vec<String> {
        let result = self
            .database
            .lock()
            .and_then(|conn| queries::subscribers_of(&conn, address));
        match result {
            Ok(subscribers) => subscribers,
            Err(e) => {
                crate::log_warn!(
                    "Could not load followers of {}: {:#}",
                    format_address(address),
                    e
                );
                Vec::new()
            }
        }
    }

    fn record_history(&self, alert: &Alert, message: &AlertMessage, delivered: bool) {
        let result = self.database.lock().and_then(|conn| {
            queries::insert_alert(&conn, alert, &message.to_plain_text(), delivered)
        });
        if let Err(e) = result {
            crate::log_warn!("Failed to record alert history: {:#}", e);
        }
    }
}
