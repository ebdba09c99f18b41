//! Fixed-point amounts.
//!
//! Every amount that enters the window is pinned to one configured number of
//! fractional digits, rounded half-to-even. Sums of pinned amounts stay exact,
//! and averages are rounded on the integer mantissa so no intermediate
//! precision is lost.

use anyhow::{ensure, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// Largest scale a `Decimal` can carry.
pub const MAX_SCALE: u32 = 28;

/// Exclusive bound on the mantissa of an admitted amount. `Decimal` holds
/// 96 bits (about 7.9e28); stopping at 1e19 leaves room for a billion maximal
/// amounts in one sum.
const AMOUNT_MANTISSA_LIMIT: i128 = 10_i128.pow(19);

/// Number of fractional digits amounts are held at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale(u32);

impl Scale {
    pub const DEFAULT: Scale = Scale(3);

    pub fn new(digits: u32) -> Result<Self> {
        ensure!(
            digits <= MAX_SCALE,
            "decimal scale {} exceeds the maximum of {}",
            digits,
            MAX_SCALE
        );
        Ok(Self(digits))
    }

    #[inline]
    pub fn digits(self) -> u32 {
        self.0
    }

    /// Round half-to-even and pin the result to exactly `digits` fractional places,
    /// so `10` becomes `10.000` at scale 3.
    pub fn round(self, value: Decimal) -> Decimal {
        let mut rounded =
            value.round_dp_with_strategy(self.0, RoundingStrategy::MidpointNearestEven);
        rounded.rescale(self.0);
        rounded
    }

    /// Whether an amount already passed through `round` may enter the window.
    pub fn admits(self, rounded: Decimal) -> bool {
        rounded.scale() == self.0 && rounded.mantissa().abs() < AMOUNT_MANTISSA_LIMIT
    }

    /// Magnitude bound for admitted amounts at this scale, for error messages.
    pub fn amount_limit(self) -> Decimal {
        Decimal::from_i128_with_scale(AMOUNT_MANTISSA_LIMIT, self.0)
    }

    /// `sum / count` rounded half-to-even at this scale. Zero when `count` is zero.
    pub fn mean(self, sum: Decimal, count: u64) -> Decimal {
        if count == 0 {
            return Decimal::ZERO;
        }

        let sum = self.round(sum);
        if sum.scale() != self.0 {
            // Too wide to carry every fractional digit, so the mantissa is not in our units.
            return (sum / Decimal::from(count))
                .round_dp_with_strategy(self.0, RoundingStrategy::MidpointNearestEven);
        }

        let mantissa = sum.mantissa();
        let divisor = i128::from(count);

        let mut quotient = mantissa / divisor;
        let twice_remainder = (mantissa % divisor).abs() * 2;
        let round_away = twice_remainder > divisor
            || (twice_remainder == divisor && quotient % 2 != 0);
        if round_away {
            quotient += mantissa.signum();
        }

        Decimal::from_i128_with_scale(quotient, self.0)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_scale_bounds() {
        assert!(Scale::new(0).is_ok());
        assert!(Scale::new(MAX_SCALE).is_ok());
        assert!(Scale::new(MAX_SCALE + 1).is_err());
        assert_eq!(Scale::default().digits(), 3);
    }

    #[test]
    fn test_round_half_even() {
        let scale = Scale::DEFAULT;
        assert_eq!(scale.round(dec!(0.0125)), dec!(0.012));
        assert_eq!(scale.round(dec!(0.0135)), dec!(0.014));
        assert_eq!(scale.round(dec!(15.2335)), dec!(15.234));
        assert_eq!(scale.round(dec!(15.23349)), dec!(15.233));
        assert_eq!(scale.round(dec!(-2.0005)), dec!(-2.000));
    }

    #[test]
    fn test_round_pins_scale() {
        let scale = Scale::DEFAULT;
        assert_eq!(scale.round(dec!(10)).to_string(), "10.000");
        assert_eq!(scale.round(dec!(15.233)).to_string(), "15.233");
        assert_eq!(Scale::new(0).unwrap().round(dec!(2.5)).to_string(), "2");
    }

    #[test]
    fn test_mean_exact() {
        let scale = Scale::DEFAULT;
        assert_eq!(scale.mean(dec!(30.466), 2).to_string(), "15.233");
        assert_eq!(scale.mean(dec!(60.000), 3).to_string(), "20.000");
        assert_eq!(scale.mean(dec!(1.000), 3), dec!(0.333));
        assert_eq!(scale.mean(dec!(2.000), 3), dec!(0.667));
    }

    #[test]
    fn test_mean_ties_go_to_even() {
        let scale = Scale::DEFAULT;
        // 5.0005 -> 5.000, 5.0015 -> 5.002
        assert_eq!(scale.mean(dec!(10.001), 2), dec!(5.000));
        assert_eq!(scale.mean(dec!(10.003), 2), dec!(5.002));
        assert_eq!(scale.mean(dec!(-10.003), 2), dec!(-5.002));
        assert_eq!(scale.mean(dec!(-0.001), 2), dec!(0.000));
    }

    #[test]
    fn test_mean_of_nothing_is_zero() {
        assert_eq!(Scale::DEFAULT.mean(dec!(12.5), 0), Decimal::ZERO);
    }

    #[test]
    fn test_mean_of_sum_too_wide_for_scale() {
        let scale = Scale::DEFAULT;
        assert_eq!(scale.round(Decimal::MAX).scale(), 0);
        assert_eq!(scale.mean(Decimal::MAX, 1), Decimal::MAX);
        assert_eq!(
            scale.mean(Decimal::MAX, 1_000).to_string(),
            "79228162514264337593543950.335"
        );
    }

    #[test]
    fn test_admits_amounts_below_limit() {
        let scale = Scale::DEFAULT;
        assert_eq!(scale.amount_limit().to_string(), "10000000000000000.000");
        assert!(scale.admits(scale.round(dec!(9999999999999999.999))));
        assert!(scale.admits(scale.round(dec!(-9999999999999999.999))));
        assert!(scale.admits(scale.round(Decimal::ZERO)));
        assert!(!scale.admits(scale.round(dec!(10000000000000000))));
        assert!(!scale.admits(scale.round(dec!(-10000000000000000))));
        assert!(!scale.admits(scale.round(Decimal::MAX)));
    }
}
