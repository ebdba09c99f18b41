//! Admission: decides whether a transaction belongs in the window before the
//! engine ever sees it, and how long it has left to live there.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;

use crate::window::Scale;

/// Outcome of checking one transaction against the window.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Inside the window. `amount` is already rounded to scale.
    Accept { amount: Decimal, remaining: Duration },
    /// Timestamp is ahead of the clock.
    RejectFuture,
    /// Timestamp is older than the window.
    RejectOld,
    /// Amount magnitude is too large to aggregate at the configured scale.
    RejectOutOfRange,
}

#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    window_delta: ChronoDuration,
    scale: Scale,
}

impl AdmissionPolicy {
    pub fn new(window: Duration, scale: Scale) -> Result<Self> {
        let window_delta =
            ChronoDuration::from_std(window).context("window length is out of range")?;
        Ok(Self {
            window_delta,
            scale,
        })
    }

    /// Classify a transaction observed at `now`. A timestamp exactly one window
    /// old is still accepted, with zero life left. Timestamps are checked
    /// before the amount.
    pub fn admit(
        &self,
        amount: Decimal,
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Admission {
        if timestamp > now {
            return Admission::RejectFuture;
        }

        let age = now - timestamp;
        if age > self.window_delta {
            return Admission::RejectOld;
        }

        let amount = self.scale.round(amount);
        if !self.scale.admits(amount) {
            return Admission::RejectOutOfRange;
        }

        let remaining = (self.window_delta - age).to_std().unwrap_or(Duration::ZERO);
        Admission::Accept { amount, remaining }
    }
}
