//! Statistics service: admission in front of the window engine.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::admission::{Admission, AdmissionPolicy};
use crate::config::Config;
use crate::window::{MetricsSnapshot, Snapshot, SumOverflow, WindowEngine};

/// Result of submitting a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Created,
    RejectedFuture,
    RejectedOld,
    /// Amount too large to aggregate, either alone or on top of the current sum.
    RejectedOutOfRange,
}

#[derive(Clone)]
pub struct StatisticsService {
    policy: AdmissionPolicy,
    engine: WindowEngine,
}

impl StatisticsService {
    pub fn new(policy: AdmissionPolicy, engine: WindowEngine) -> Self {
        Self { policy, engine }
    }

    /// Validate `config` and start an engine for it. Needs a tokio runtime.
    pub fn start(config: &Config) -> Result<Self> {
        config.validate()?;
        let policy = AdmissionPolicy::new(config.window(), config.scale()?)?;
        let engine = WindowEngine::spawn(config.engine_config()?);
        Ok(Self::new(policy, engine))
    }

    pub async fn create_transaction(
        &self,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<TransactionStatus> {
        self.create_transaction_at(amount, timestamp, Utc::now()).await
    }

    /// Same as `create_transaction` with an explicit clock reading.
    pub async fn create_transaction_at(
        &self,
        amount: Decimal,
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<TransactionStatus> {
        match self.policy.admit(amount, timestamp, now) {
            Admission::RejectFuture => {
                self.engine.metrics().record_rejected_future();
                info!(%timestamp, %now, "Transaction rejected: timestamp is in the future");
                Ok(TransactionStatus::RejectedFuture)
            }
            Admission::RejectOld => {
                self.engine.metrics().record_rejected_old();
                info!(%timestamp, %now, "Transaction rejected: timestamp is outside the window");
                Ok(TransactionStatus::RejectedOld)
            }
            Admission::RejectOutOfRange => {
                self.engine.metrics().record_rejected_range();
                info!(%amount, "Transaction rejected: amount is out of range");
                Ok(TransactionStatus::RejectedOutOfRange)
            }
            Admission::Accept { amount, remaining } => {
                match self.engine.insert(amount, timestamp, remaining).await {
                    Ok(_) => Ok(TransactionStatus::Created),
                    Err(err) if err.downcast_ref::<SumOverflow>().is_some() => {
                        self.engine.metrics().record_rejected_range();
                        info!(%amount, "Transaction rejected: {}", err);
                        Ok(TransactionStatus::RejectedOutOfRange)
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    pub fn statistics(&self) -> Arc<Snapshot> {
        self.engine.snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.engine.metrics().snapshot()
    }
}
