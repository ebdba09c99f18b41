//! Expiry scheduling.
//!
//! A single timer loop owns a min-heap of `(deadline, id)` pairs. It sleeps
//! until the earliest deadline, hands every due id to the writer, and goes back
//! to sleep. New deadlines arrive over a channel from the writer, so the heap
//! itself is never shared.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::store::EventId;

/// Idle sleep used while nothing is scheduled. The branch is disabled in that
/// case; the value only has to be a valid instant.
const IDLE_PARK: Duration = Duration::from_secs(3600);

/// One removal to fire at `deadline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledExpiry {
    pub id: EventId,
    pub deadline: Instant,
}

/// Time-ordered queue of pending removals.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    heap: BinaryHeap<Reverse<(Instant, EventId)>>,
}

impl ExpiryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, entry: ScheduledExpiry) {
        self.heap.push(Reverse((entry.deadline, entry.id)));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Pop every entry whose deadline is at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<EventId> {
        let mut due = Vec::new();
        while let Some(Reverse((deadline, id))) = self.heap.peek().copied() {
            if deadline > now {
                break;
            }
            self.heap.pop();
            due.push(id);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Timer loop. Runs until the writer drops its scheduling sender, or until
/// the writer stops accepting expirations.
pub async fn run_expiry_loop(
    mut requests: mpsc::UnboundedReceiver<ScheduledExpiry>,
    expired: mpsc::UnboundedSender<EventId>,
) {
    info!("Expiry timer loop started");
    let mut queue = ExpiryQueue::new();

    loop {
        let next = queue.next_deadline();
        let wake_at = next.unwrap_or_else(|| Instant::now() + IDLE_PARK);

        tokio::select! {
            request = requests.recv() => match request {
                Some(entry) => queue.schedule(entry),
                None => break,
            },
            _ = sleep_until(wake_at), if next.is_some() => {
                for id in queue.pop_due(Instant::now()) {
                    debug!(event_id = %id, "Expiry fired");
                    if expired.send(id).is_err() {
                        warn!(pending = queue.len(), "Writer gone, dropping pending expirations");
                        return;
                    }
                }
            }
        }
    }

    info!(pending = queue.len(), "Expiry timer loop stopped");
}
