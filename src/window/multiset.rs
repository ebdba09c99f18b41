//! Ordered multiset of amounts.
//!
//! Distinct amounts are keys of a `BTreeMap`, so the map doubles as the
//! ordered index: the first key is the minimum and the last key the maximum,
//! both in O(log n). A key stays in the map only while its occurrence count is
//! positive; the last occurrence removes the key outright.

use rust_decimal::Decimal;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct ValueMultiset {
    counts: BTreeMap<Decimal, u64>,
    len: u64,
}

impl ValueMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: Decimal) {
        *self.counts.entry(value).or_insert(0) += 1;
        self.len += 1;
    }

    /// Drop one occurrence of `value`. Returns false if it was not present.
    pub fn remove(&mut self, value: Decimal) -> bool {
        match self.counts.entry(value) {
            Entry::Occupied(mut slot) => {
                if *slot.get() > 1 {
                    *slot.get_mut() -= 1;
                } else {
                    slot.remove();
                }
                self.len -= 1;
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    #[inline]
    pub fn min(&self) -> Option<Decimal> {
        self.counts.first_key_value().map(|(value, _)| *value)
    }

    #[inline]
    pub fn max(&self) -> Option<Decimal> {
        self.counts.last_key_value().map(|(value, _)| *value)
    }

    /// Total occurrences across all distinct values.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty() {
        let values = ValueMultiset::new();
        assert!(values.is_empty());
        assert_eq!(values.min(), None);
        assert_eq!(values.max(), None);
    }

    #[test]
    fn test_extrema_track_inserts() {
        let mut values = ValueMultiset::new();
        values.insert(dec!(20.000));
        values.insert(dec!(10.000));
        values.insert(dec!(30.000));

        assert_eq!(values.min(), Some(dec!(10.000)));
        assert_eq!(values.max(), Some(dec!(30.000)));
        assert_eq!(values.len(), 3);
        assert_eq!(values.distinct(), 3);
    }

    #[test]
    fn test_duplicates_share_one_key() {
        let mut values = ValueMultiset::new();
        for _ in 0..5 {
            values.insert(dec!(10.000));
        }
        assert_eq!(values.distinct(), 1);
        assert_eq!(values.counts.get(&dec!(10.000)), Some(&5));

        for _ in 0..4 {
            assert!(values.remove(dec!(10.000)));
            assert_eq!(values.min(), Some(dec!(10.000)));
        }
        assert!(values.remove(dec!(10.000)));

        assert!(values.is_empty());
        assert_eq!(values.distinct(), 0);
        assert_eq!(values.min(), None);
    }

    #[test]
    fn test_removing_extreme_exposes_next() {
        let mut values = ValueMultiset::new();
        values.insert(dec!(1.000));
        values.insert(dec!(2.000));
        values.insert(dec!(3.000));
        values.insert(dec!(3.000));

        values.remove(dec!(1.000));
        assert_eq!(values.min(), Some(dec!(2.000)));

        values.remove(dec!(3.000));
        assert_eq!(values.max(), Some(dec!(3.000)));
        values.remove(dec!(3.000));
        assert_eq!(values.max(), Some(dec!(2.000)));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut values = ValueMultiset::new();
        values.insert(dec!(5.000));
        assert!(!values.remove(dec!(6.000)));
        assert_eq!(values.len(), 1);
    }
}
