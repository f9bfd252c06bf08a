//! Periodic validator monitor
//!
//! Drives one detection cycle per interval. A cycle always runs to
//! completion before the next wait starts, so cycles never overlap and the
//! registry has a single writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::detector::{CycleReport, run_cycle};
use super::events::MonitorEvent;
use crate::alerts::AlertPolicy;
use crate::chain::ChainSource;
use crate::config::{DEFAULT_MONITOR_INTERVAL, MAX_CONCURRENT_FETCHES};
use crate::error::CycleResult;
use crate::notifier::Notifier;
use crate::registry::ValidatorRegistry;

/// Event callback type
pub type EventCallback = Arc<dyn Fn(MonitorEvent) + Send + Sync>;

/// Outcome of one cycle after dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_number: u32,
    pub report: CycleReport,
    pub alerts_delivered: usize,
    pub persisted: bool,
    pub duration_ms: u64,
}

pub struct Monitor {
    registry: ValidatorRegistry,
    source: Arc<dyn ChainSource>,
    notifier: Notifier,
    policy: AlertPolicy,
    interval: Duration,
    max_concurrent: usize,
    cycle_count: u32,
    is_running: Arc<AtomicBool>,
    on_event: Option<EventCallback>,
}

impl Monitor {
    pub fn new(
        registry: ValidatorRegistry,
        source: Arc<dyn ChainSource>,
        notifier: Notifier,
        policy: AlertPolicy,
    ) -> Self {
        Self {
            registry,
            source,
            notifier,
            policy,
            interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL),
            max_concurrent: MAX_CONCURRENT_FETCHES,
            cycle_count: 0,
            is_running: Arc::new(AtomicBool::new(false)),
            on_event: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub fn cycles_run(&self) -> u32 {
        self.cycle_count
    }

    /// Handle that stops [`Monitor::run`] after the current cycle
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.is_running)
    }

    fn emit(&self, event: MonitorEvent) {
        if let Some(callback) = &self.on_event {
            callback(event);
        }
    }

    pub async fn run_once(&mut self) -> CycleResult<CycleSummary> {
        self.run_once_at(Utc::now()).await
    }

    /// Run one cycle with `now` as the policy clock.
    ///
    /// The registry is persisted before alerts are dispatched, so a crash
    /// mid-dispatch cannot re-fire the same alerts after restart.
    pub async fn run_once_at(&mut self, now: DateTime<Utc>) -> CycleResult<CycleSummary> {
        self.cycle_count += 1;
        let cycle_number = self.cycle_count;
        let start = Instant::now();

        self.emit(MonitorEvent::CycleStarted { cycle_number });
        crate::log_debug!("[MONITOR] Starting cycle #{}", cycle_number);

        let report = match run_cycle(
            &mut self.registry,
            Arc::clone(&self.source),
            &self.policy,
            self.max_concurrent,
            now,
        )
        .await
        {
            Ok(report) => report,
            Err(e) => {
                crate::log_warn!("[MONITOR] Cycle #{} aborted: {}", cycle_number, e);
                self.emit(MonitorEvent::CycleAborted {
                    cycle_number,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let persisted = match self.registry.persist_if_dirty() {
            Ok(written) => written,
            Err(e) => {
                crate::log_error!(
                    "[MONITOR] Failed to persist validator registry after cycle #{}: {:#}",
                    cycle_number,
                    e
                );
                false
            }
        };

        let alerts_delivered = self.notifier.notify_all(&report.alerts).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        crate::log_stderr!(
            "[MONITOR] Cycle #{} era {}: {} active, {} alerts ({} delivered), {} skipped in {}ms",
            cycle_number,
            report.era,
            report.active_set_size,
            report.alerts.len(),
            alerts_delivered,
            report.skipped.len(),
            duration_ms
        );
        self.emit(MonitorEvent::CycleCompleted {
            cycle_number,
            era: report.era,
            alerts_fired: report.alerts.len(),
            alerts_delivered,
            skipped: report.skipped.len(),
            duration_ms,
        });

        Ok(CycleSummary {
            cycle_number,
            report,
            alerts_delivered,
            persisted,
            duration_ms,
        })
    }

    /// Run the startup cycle, then one cycle per interval until `shutdown`
    /// resolves or the stop handle is cleared.
    ///
    /// A cycle in progress is never interrupted; shutdown is only observed
    /// while waiting for the next tick.
    pub async fn run<S>(&mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.is_running.store(true, Ordering::SeqCst);

        let interval_seconds = self.interval.as_secs();
        crate::log_stderr!(
            "[MONITOR] Monitoring started (interval: {}s, {} tracked validators)",
            interval_seconds,
            self.registry.len()
        );
        self.emit(MonitorEvent::MonitoringStarted { interval_seconds });

        let cycles_before = self.cycle_count;
        while self.is_running.load(Ordering::SeqCst) {
            // Aborted cycles are already logged and reported through events.
            let _ = self.run_once().await;

            if !self.is_running.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.is_running.store(false, Ordering::SeqCst);
        if let Err(e) = self.registry.persist_if_dirty() {
            crate::log_error!("[MONITOR] Failed to persist validator registry on shutdown: {:#}", e);
        }

        let cycles_run = self.cycle_count - cycles_before;
        crate::log_stderr!("[MONITOR] Monitoring stopped after {} cycles", cycles_run);
        self.emit(MonitorEvent::MonitoringStopped { cycles_run });
    }
}
