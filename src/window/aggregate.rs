//! Incrementally maintained aggregate over the active events.

use std::fmt;

use rust_decimal::Decimal;

use super::amount::Scale;
use super::multiset::ValueMultiset;
use super::snapshot::Snapshot;

/// The running sum cannot absorb another amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumOverflow;

impl fmt::Display for SumOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window sum would overflow")
    }
}

impl std::error::Error for SumOverflow {}

/// Running count/sum/extrema/average. Updated by one insert or one removal at
/// a time; never recomputed from the event store.
#[derive(Debug)]
pub struct AggregateState {
    scale: Scale,
    count: u64,
    sum: Decimal,
    avg: Decimal,
    min: Option<Decimal>,
    max: Option<Decimal>,
}

impl AggregateState {
    pub fn new(scale: Scale) -> Self {
        Self {
            scale,
            count: 0,
            sum: Decimal::ZERO,
            avg: Decimal::ZERO,
            min: None,
            max: None,
        }
    }

    /// Fold in `amount`. `values` must already contain it. On overflow nothing
    /// changes and the caller has to take `amount` back out of `values`.
    pub fn apply_insert(
        &mut self,
        amount: Decimal,
        values: &ValueMultiset,
    ) -> Result<(), SumOverflow> {
        let sum = self.sum.checked_add(amount).ok_or(SumOverflow)?;
        self.count += 1;
        self.sum = sum;
        self.avg = self.scale.mean(self.sum, self.count);
        self.min = values.min();
        self.max = values.max();
        Ok(())
    }

    /// Take `amount` back out. `values` must already have dropped it.
    ///
    /// The removal always happens. If the remaining events do not sum to a
    /// representable value the sum saturates and `SumOverflow` is returned.
    pub fn apply_remove(
        &mut self,
        amount: Decimal,
        values: &ValueMultiset,
    ) -> Result<(), SumOverflow> {
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            self.sum = Decimal::ZERO;
            self.avg = Decimal::ZERO;
            self.min = None;
            self.max = None;
            return Ok(());
        }

        let exact = self.sum.checked_sub(amount);
        self.sum = exact.unwrap_or(self.sum.saturating_sub(amount));
        self.avg = self.scale.mean(self.sum, self.count);
        self.min = values.min();
        self.max = values.max();
        exact.map(|_| ()).ok_or(SumOverflow)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            count: self.count,
            sum: self.sum,
            avg: self.avg,
            min: self.min,
            max: self.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn insert(state: &mut AggregateState, values: &mut ValueMultiset, amount: Decimal) {
        values.insert(amount);
        state.apply_insert(amount, values).unwrap();
    }

    fn remove(state: &mut AggregateState, values: &mut ValueMultiset, amount: Decimal) {
        values.remove(amount);
        state.apply_remove(amount, values).unwrap();
    }

    #[test]
    fn test_insert_updates_everything() {
        let mut state = AggregateState::new(Scale::DEFAULT);
        let mut values = ValueMultiset::new();

        insert(&mut state, &mut values, dec!(10.000));
        insert(&mut state, &mut values, dec!(20.000));
        insert(&mut state, &mut values, dec!(30.000));

        let snap = state.snapshot();
        assert_eq!(snap.count, 3);
        assert_eq!(snap.sum.to_string(), "60.000");
        assert_eq!(snap.avg.to_string(), "20.000");
        assert_eq!(snap.min, Some(dec!(10.000)));
        assert_eq!(snap.max, Some(dec!(30.000)));
    }

    #[test]
    fn test_remove_recomputes_average_and_extrema() {
        let mut state = AggregateState::new(Scale::DEFAULT);
        let mut values = ValueMultiset::new();

        insert(&mut state, &mut values, dec!(1.000));
        insert(&mut state, &mut values, dec!(2.000));
        insert(&mut state, &mut values, dec!(4.000));
        remove(&mut state, &mut values, dec!(4.000));

        let snap = state.snapshot();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.sum, dec!(3.000));
        assert_eq!(snap.avg, dec!(1.500));
        assert_eq!(snap.max, Some(dec!(2.000)));
    }

    #[test]
    fn test_last_removal_resets_explicitly() {
        let mut state = AggregateState::new(Scale::DEFAULT);
        let mut values = ValueMultiset::new();

        insert(&mut state, &mut values, dec!(7.125));
        remove(&mut state, &mut values, dec!(7.125));

        assert_eq!(state.snapshot(), Snapshot::empty());
        assert_eq!(state.snapshot().sum.to_string(), "0");
    }

    #[test]
    fn test_overflowing_insert_changes_nothing() {
        let mut state = AggregateState::new(Scale::new(0).unwrap());
        let mut values = ValueMultiset::new();
        insert(&mut state, &mut values, Decimal::MAX);
        let before = state.snapshot();

        values.insert(Decimal::ONE);
        assert_eq!(state.apply_insert(Decimal::ONE, &values), Err(SumOverflow));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_remove_saturates_when_rest_is_unrepresentable() {
        let mut state = AggregateState::new(Scale::new(0).unwrap());
        let mut values = ValueMultiset::new();
        // MAX + MIN + MAX fits in arrival order; MAX + MAX on its own does not.
        insert(&mut state, &mut values, Decimal::MAX);
        insert(&mut state, &mut values, Decimal::MIN);
        insert(&mut state, &mut values, Decimal::MAX);

        values.remove(Decimal::MIN);
        assert_eq!(state.apply_remove(Decimal::MIN, &values), Err(SumOverflow));

        let snap = state.snapshot();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.sum, Decimal::MAX);
        assert_eq!(snap.min, Some(Decimal::MAX));
    }
}
