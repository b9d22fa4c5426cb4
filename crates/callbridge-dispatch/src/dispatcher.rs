//! Dispatcher worker loop
//!
//! Any number of dispatcher instances may run against the same queue, in
//! one process or many. Exclusivity comes from the skip-locked lease: an
//! event row locked by one worker is invisible to its peers until that
//! worker's transaction ends, so each event is processed at most once
//! concurrently and exactly once successfully.

use std::sync::Arc;
use std::time::Duration;
use sqlx::Acquire;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use callbridge_db::{Database, EventRepo};
use callbridge_fanout::FanoutHub;
use callbridge_types::FanoutEvent;

use crate::error::DispatchResult;
use crate::handler::HandlerRegistry;

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum events leased per pass.
    pub batch_size: i64,
    /// Sleep between passes when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Counters from a single dispatcher pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassStats {
    pub leased: usize,
    pub processed: usize,
    pub failed: usize,
}

/// The queue-draining worker.
#[derive(Clone)]
pub struct Dispatcher {
    db: Arc<Database>,
    registry: Arc<HandlerRegistry>,
    fanout: FanoutHub,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        db: Arc<Database>,
        registry: Arc<HandlerRegistry>,
        fanout: FanoutHub,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            db,
            registry,
            fanout,
            config,
        }
    }

    /// Run until the stop signal flips.
    ///
    /// Shutdown is cooperative at transaction boundaries: the current pass
    /// always finishes (or rolls back), so no event is ever abandoned
    /// half-processed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_size = self.config.batch_size,
            handlers = self.registry.len(),
            "Dispatcher worker started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.run_once().await {
                Ok(stats) if stats.leased == 0 => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Ok(stats) => {
                    debug!(
                        leased = stats.leased,
                        processed = stats.processed,
                        failed = stats.failed,
                        "Dispatcher pass complete"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Dispatcher pass failed");
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }
        info!("Dispatcher worker stopped");
    }

    /// Lease one batch and process it.
    ///
    /// Each event runs inside its own savepoint: a handler failure rolls
    /// back only that event's effects and leaves it unstamped for a later
    /// pass, without poisoning the rest of the batch. Fanout emissions are
    /// delivered only after the batch commits, so subscribers never observe
    /// a rolled-back transition.
    pub async fn run_once(&self) -> DispatchResult<PassStats> {
        let mut tx = self.db.pg.begin().await?;
        let events = EventRepo::lease_batch(&mut *tx, self.config.batch_size).await?;
        if events.is_empty() {
            tx.commit().await?;
            return Ok(PassStats::default());
        }

        let mut stats = PassStats {
            leased: events.len(),
            ..Default::default()
        };
        let mut emissions: Vec<FanoutEvent> = Vec::new();

        for event in &events {
            // The lease query filters unattributed events; this guards
            // against schema drift.
            let Some(app_id) = event.app_id else {
                continue;
            };

            let Some(handler) = self.registry.get(&event.event_type) else {
                warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "No handler for event type; stamping processed"
                );
                EventRepo::mark_processed(&mut *tx, event.id).await?;
                stats.processed += 1;
                continue;
            };
            let handler = handler.clone();

            let mut savepoint = tx.begin().await?;
            match handler.handle(&mut *savepoint, app_id, event).await {
                Ok(emission) => {
                    EventRepo::mark_processed(&mut *savepoint, event.id).await?;
                    savepoint.commit().await?;
                    stats.processed += 1;
                    metrics::counter!("dispatch_events_processed").increment(1);
                    if let Some(emission) = emission {
                        emissions.push(emission);
                    }
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    error!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        error = %e,
                        "Handler failed; event left pending for retry"
                    );
                    stats.failed += 1;
                    metrics::counter!("dispatch_events_failed").increment(1);
                }
            }
        }

        tx.commit().await?;

        for emission in emissions {
            if let Err(e) = self.fanout.publish(emission).await {
                warn!(error = %e, "Fanout delivery failed");
            }
        }

        Ok(stats)
    }
}
