//! Single-writer aggregation engine.
//!
//! All mutation of the window goes through one writer task. Producers send
//! inserts over a bounded channel and wait for the assigned id; the expiry
//! loop sends due ids over a second channel. The writer owns the event store,
//! the value multiset and the aggregate outright, so no lock guards them, and
//! it publishes a fresh snapshot after every change.
//!
//! ```text
//!  producers --insert--> writer --schedule--> expiry loop
//!                          ^                      |
//!                          +------expired---------+
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::aggregate::{AggregateState, SumOverflow};
use super::amount::Scale;
use super::metrics::EngineMetrics;
use super::multiset::ValueMultiset;
use super::scheduler::{run_expiry_loop, ScheduledExpiry};
use super::snapshot::{Snapshot, SnapshotPublisher};
use super::store::{ActiveEventStore, Event, EventId};

/// Default bound of the insert channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Window state owned by the writer. Synchronous and single-threaded; every
/// method leaves store, multiset and aggregate mutually consistent.
#[derive(Debug)]
pub struct WindowAggregator {
    scale: Scale,
    last_id: u64,
    store: ActiveEventStore,
    values: ValueMultiset,
    aggregate: AggregateState,
}

impl WindowAggregator {
    pub fn new(scale: Scale) -> Self {
        Self {
            scale,
            last_id: 0,
            store: ActiveEventStore::new(),
            values: ValueMultiset::new(),
            aggregate: AggregateState::new(scale),
        }
    }

    /// Add an event and return its freshly assigned id. An amount the running
    /// sum cannot absorb is refused and leaves the window untouched.
    pub fn insert(
        &mut self,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<EventId, SumOverflow> {
        let amount = self.scale.round(amount);

        self.values.insert(amount);
        if let Err(overflow) = self.aggregate.apply_insert(amount, &self.values) {
            self.values.remove(amount);
            return Err(overflow);
        }

        self.last_id += 1;
        let id = EventId(self.last_id);
        self.store.insert(Event {
            id,
            amount,
            timestamp,
        });
        Ok(id)
    }

    /// Remove an event. A second call for the same id is a no-op returning `None`.
    pub fn remove(&mut self, id: EventId) -> Option<Event> {
        let event = self.store.remove(id)?;
        self.values.remove(event.amount);
        if self.aggregate.apply_remove(event.amount, &self.values).is_err() {
            error!(
                event_id = %id,
                active = self.store.len(),
                "Remaining events do not sum to a representable value; sum saturated"
            );
        }
        Some(event)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.aggregate.snapshot()
    }

    pub fn active(&self) -> usize {
        self.store.len()
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.store.iter()
    }

    pub fn values(&self) -> &ValueMultiset {
        &self.values
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scale: Scale,
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale: Scale::DEFAULT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

struct InsertRequest {
    amount: Decimal,
    timestamp: DateTime<Utc>,
    deadline: Instant,
    ack: oneshot::Sender<Result<EventId, SumOverflow>>,
}

/// Cloneable handle to a running engine.
#[derive(Clone)]
pub struct WindowEngine {
    inserts: mpsc::Sender<InsertRequest>,
    snapshots: Arc<SnapshotPublisher>,
    metrics: Arc<EngineMetrics>,
}

impl WindowEngine {
    /// Start the writer and the expiry loop on the current tokio runtime.
    /// Both stop once every handle has been dropped.
    pub fn spawn(config: EngineConfig) -> Self {
        let (insert_tx, insert_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (schedule_tx, schedule_rx) = mpsc::unbounded_channel();
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();

        let snapshots = Arc::new(SnapshotPublisher::new());
        let metrics = Arc::new(EngineMetrics::default());

        let writer = Writer {
            aggregator: WindowAggregator::new(config.scale),
            snapshots: snapshots.clone(),
            metrics: metrics.clone(),
            schedule: schedule_tx,
        };

        tokio::spawn(writer.run(insert_rx, expired_rx));
        tokio::spawn(run_expiry_loop(schedule_rx, expired_tx));

        Self {
            inserts: insert_tx,
            snapshots,
            metrics,
        }
    }

    /// Insert an event that stays in the window for `remaining`. Resolves once
    /// the writer has applied it and published the new snapshot.
    ///
    /// Fails with `SumOverflow` (reachable through `downcast_ref`) when the
    /// window total cannot take the amount; the engine keeps running.
    pub async fn insert(
        &self,
        amount: Decimal,
        timestamp: DateTime<Utc>,
        remaining: Duration,
    ) -> Result<EventId> {
        let deadline = Instant::now()
            .checked_add(remaining)
            .context("expiry deadline out of range")?;
        let (ack, applied) = oneshot::channel();

        self.inserts
            .send(InsertRequest {
                amount,
                timestamp,
                deadline,
                ack,
            })
            .await
            .map_err(|_| anyhow!("aggregation engine is not running"))?;

        let id = applied
            .await
            .context("aggregation engine stopped before applying the event")??;
        Ok(id)
    }

    /// Latest published aggregate. Never blocks.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.read()
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }
}

struct Writer {
    aggregator: WindowAggregator,
    snapshots: Arc<SnapshotPublisher>,
    metrics: Arc<EngineMetrics>,
    schedule: mpsc::UnboundedSender<ScheduledExpiry>,
}

impl Writer {
    async fn run(
        mut self,
        mut inserts: mpsc::Receiver<InsertRequest>,
        mut expired: mpsc::UnboundedReceiver<EventId>,
    ) {
        info!(scale = self.aggregator.scale().digits(), "Window writer started");

        loop {
            tokio::select! {
                // Expirations first so a busy producer side cannot hold stale events in the window.
                biased;
                Some(id) = expired.recv() => self.expire(id),
                request = inserts.recv() => match request {
                    Some(request) => self.insert(request),
                    None => break,
                },
            }
        }

        info!(active = self.aggregator.active(), "Window writer stopped");
    }

    fn insert(&mut self, request: InsertRequest) {
        let id = match self.aggregator.insert(request.amount, request.timestamp) {
            Ok(id) => id,
            Err(overflow) => {
                warn!(
                    amount = %request.amount,
                    active = self.aggregator.active(),
                    "Event refused: {}", overflow
                );
                let _ = request.ack.send(Err(overflow));
                return;
            }
        };
        self.snapshots.publish(self.aggregator.snapshot());
        self.metrics.record_accepted();

        debug!(
            event_id = %id,
            amount = %request.amount,
            timestamp = %request.timestamp,
            active = self.aggregator.active(),
            "Event added to window"
        );

        if self
            .schedule
            .send(ScheduledExpiry {
                id,
                deadline: request.deadline,
            })
            .is_err()
        {
            warn!(event_id = %id, "Expiry loop is gone; event will not expire");
        }

        // The producer may have given up waiting; the event stays applied either way.
        let _ = request.ack.send(Ok(id));
    }

    fn expire(&mut self, id: EventId) {
        match self.aggregator.remove(id) {
            Some(event) => {
                self.snapshots.publish(self.aggregator.snapshot());
                self.metrics.record_expired();
                debug!(
                    event_id = %id,
                    amount = %event.amount,
                    timestamp = %event.timestamp,
                    active = self.aggregator.active(),
                    "Event expired from window"
                );
            }
            None => debug!(event_id = %id, "Ignoring expiry for an event no longer in the window"),
        }
    }
}
