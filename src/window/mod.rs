//! Sliding-window aggregation core.
//!
//! Keeps count, sum, average, minimum and maximum over the events whose
//! window has not yet elapsed, and expires each event exactly once:
//!
//! - `amount`: fixed-point scale and half-to-even rounding
//! - `multiset`: ordered distinct values with occurrence counts (min/max)
//! - `store`: active events by id
//! - `aggregate`: incremental count/sum/avg/min/max
//! - `snapshot`: lock-free publication of the aggregate
//! - `scheduler`: min-heap timer loop that fires removals
//! - `engine`: single-writer task tying it together

pub mod aggregate;
pub mod amount;
pub mod engine;
pub mod metrics;
pub mod multiset;
pub mod scheduler;
pub mod snapshot;
pub(crate) mod store;

pub use aggregate::SumOverflow;
pub use amount::{Scale, MAX_SCALE};
pub use engine::{EngineConfig, WindowAggregator, WindowEngine, DEFAULT_QUEUE_CAPACITY};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use snapshot::{Snapshot, SnapshotPublisher};
pub use store::{Event, EventId};
