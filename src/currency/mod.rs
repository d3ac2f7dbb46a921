//! Fixed-point money and percentage types.
//!
//! Every amount in the ledger is an integer count of minor units so that
//! derived totals never drift, no matter how often they are recomputed.

use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

const BASIS_POINTS_PER_WHOLE: i128 = 10_000;

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

/// Signed money amount represented as integer cents.
///
/// ```rust
/// use expense_ledger::currency::Money;
///
/// let amount: Money = "1185.5".parse().unwrap();
/// assert_eq!(amount.cents(), 118_550);
/// assert_eq!(amount.to_string(), "1185.50");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole currency units, e.g. `Money::from_units(1450)` is 1450.00.
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Converts a floating major-unit amount, rounding half away from zero.
    #[must_use]
    pub fn from_major(value: f64) -> Self {
        Self((value * 100.0).round() as i64)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    #[must_use]
    pub fn checked_mul(self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// Scales by a fractional factor, rounding half away from zero.
    /// Saturates at the representable range; see [`Money::checked_scale`].
    #[must_use]
    pub fn scale(self, factor: f64) -> Money {
        Money((self.0 as f64 * factor).round() as i64)
    }

    /// Like [`Money::scale`], but `None` when the result is not a finite
    /// amount that fits in cents.
    #[must_use]
    pub fn checked_scale(self, factor: f64) -> Option<Money> {
        let scaled = (self.0 as f64 * factor).round();
        // i64::MAX is not exactly representable; the bound rounds up to 2^63.
        (scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64)
            .then(|| Money(scaled as i64))
    }

    /// Applies a percentage, rounding half away from zero.
    /// Saturates at the representable range; see [`Money::checked_apply_percent`].
    #[must_use]
    pub fn apply_percent(self, rate: Percent) -> Money {
        self.checked_apply_percent(rate).unwrap_or_else(|| {
            if (self.0 < 0) == (rate.basis_points() < 0) {
                Money(i64::MAX)
            } else {
                Money(i64::MIN)
            }
        })
    }

    #[must_use]
    pub fn checked_apply_percent(self, rate: Percent) -> Option<Money> {
        let raw = i128::from(self.0) * i128::from(rate.basis_points());
        i64::try_from(div_round_half_away(raw, BASIS_POINTS_PER_WHOLE))
            .ok()
            .map(Money)
    }

    /// Splits into `parts` equal shares. Returns the share and the leftover cents.
    #[must_use]
    pub fn split_even(self, parts: usize) -> (Money, Money) {
        if parts == 0 {
            return (Money::ZERO, self);
        }
        let parts = parts as i64;
        let share = self.0 / parts;
        (Money(share), Money(self.0 - share * parts))
    }
}

fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    /// Accepts `.` or `,` as decimal separator, an optional sign, and at most
    /// two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::validation(format!("invalid amount `{s}`"));

        let trimmed = s.trim();
        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };
        if rest.is_empty() {
            return Err(invalid());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let fraction = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }
        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let units: i64 = units_str.parse().map_err(|_| invalid())?;

        let cents: i64 = match fraction {
            None | Some("") => 0,
            Some(frac) if !frac.chars().all(|c| c.is_ascii_digit()) => return Err(invalid()),
            Some(frac) if frac.len() == 1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            Some(frac) if frac.len() == 2 => frac.parse::<i64>().map_err(|_| invalid())?,
            Some(_) => {
                return Err(LedgerError::validation(format!(
                    "amount `{s}` has more than two decimals"
                )))
            }
        };

        units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .map(|total| Money(sign * total))
            .ok_or_else(|| LedgerError::validation(format!("amount `{s}` is too large")))
    }
}

/// A percentage held in basis points (hundredths of a percent).
///
/// Serialized as a plain decimal percentage, so `18.5` on disk is 18.5%.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(10_000);
    /// Largest magnitude a percentage may take: 1,000,000%.
    pub const LIMIT: Percent = Percent(100_000_000);

    #[must_use]
    pub const fn from_basis_points(bps: i64) -> Self {
        Self(bps)
    }

    /// Rounds to the nearest basis point, clamped to [`Percent::LIMIT`].
    /// Non-finite input becomes zero.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self::checked_from_f64(value).unwrap_or_else(|| {
            if value.is_nan() {
                Self::ZERO
            } else if value > 0.0 {
                Self::LIMIT
            } else {
                Self(-Self::LIMIT.0)
            }
        })
    }

    /// `None` unless `value` is finite and within [`Percent::LIMIT`].
    #[must_use]
    pub fn checked_from_f64(value: f64) -> Option<Self> {
        let bps = (value * 100.0).round();
        let limit = Self::LIMIT.0 as f64;
        (bps.is_finite() && (-limit..=limit).contains(&bps)).then(|| Self(bps as i64))
    }

    /// Parses user input, falling back when it is blank, not a number, or
    /// beyond [`Percent::LIMIT`].
    ///
    /// ```rust
    /// use expense_ledger::currency::Percent;
    ///
    /// let fallback = Percent::from_f64(18.5);
    /// assert_eq!(Percent::parse_or("20", fallback), Percent::from_f64(20.0));
    /// assert_eq!(Percent::parse_or("  ", fallback), fallback);
    /// assert_eq!(Percent::parse_or("abc", fallback), fallback);
    /// assert_eq!(Percent::parse_or("1e300", fallback), fallback);
    /// ```
    #[must_use]
    pub fn parse_or(input: &str, fallback: Percent) -> Percent {
        Self::parse(input).unwrap_or(fallback)
    }

    #[must_use]
    pub fn parse(input: &str) -> Option<Percent> {
        let trimmed = input.trim().trim_end_matches('%').trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .and_then(Percent::checked_from_f64)
    }

    #[must_use]
    pub const fn basis_points(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[must_use]
    pub fn clamp_0_100(self) -> Percent {
        Percent(self.0.clamp(0, Self::HUNDRED.0))
    }

    /// `100% - self`.
    #[must_use]
    pub fn complement(self) -> Percent {
        Percent(Self::HUNDRED.0 - self.0)
    }
}

impl TryFrom<f64> for Percent {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Percent::checked_from_f64(value).ok_or_else(|| {
            format!("percentage must be a finite number within ±{}, got {value}", Percent::LIMIT)
        })
    }
}

impl From<Percent> for f64 {
    fn from(value: Percent) -> Self {
        value.as_f64()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / 100;
        let frac = abs % 100;
        if frac == 0 {
            write!(f, "{sign}{whole}%")
        } else if frac % 10 == 0 {
            write!(f, "{sign}{whole}.{}%", frac / 10)
        } else {
            write!(f, "{sign}{whole}.{frac:02}%")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(5).to_string(), "0.05");
        assert_eq!(Money::new(84_728).to_string(), "847.28");
        assert_eq!(Money::new(-1_050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
        assert_eq!("10,5".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().cents(), -1);
        assert_eq!(" 725.00 ".parse::<Money>().unwrap(), Money::from_units(725));
    }

    #[test]
    fn parse_rejects_garbage_and_extra_decimals() {
        assert!("".parse::<Money>().is_err());
        assert!("12.345".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("ten".parse::<Money>().is_err());
    }

    #[test]
    fn apply_percent_rounds_half_away_from_zero() {
        let total = Money::from_units(1185);
        assert_eq!(total.apply_percent(Percent::from_f64(71.5)).cents(), 84_728);
        assert_eq!((-total).apply_percent(Percent::from_f64(71.5)).cents(), -84_728);
        assert_eq!(
            Money::from_units(1000).apply_percent(Percent::from_f64(18.5)),
            Money::from_units(185)
        );
    }

    #[test]
    fn split_even_reports_leftover_cents() {
        let (share, leftover) = Money::new(1_000).split_even(3);
        assert_eq!(share.cents(), 333);
        assert_eq!(leftover.cents(), 1);
        assert_eq!(Money::new(900).split_even(0), (Money::ZERO, Money::new(900)));
    }

    #[test]
    fn percent_display_and_clamp() {
        assert_eq!(Percent::from_f64(18.5).to_string(), "18.5%");
        assert_eq!(Percent::from_f64(28.25).to_string(), "28.25%");
        assert_eq!(Percent::from_f64(140.0).clamp_0_100(), Percent::HUNDRED);
        assert_eq!(Percent::from_f64(-3.0).clamp_0_100(), Percent::ZERO);
        assert_eq!(Percent::from_f64(28.5).complement(), Percent::from_f64(71.5));
    }

    #[test]
    fn out_of_range_percent_is_refused_or_clamped() {
        assert_eq!(Percent::parse("1e300"), None);
        assert_eq!(Percent::parse("inf"), None);
        assert_eq!(Percent::parse("1000000"), Some(Percent::LIMIT));
        assert_eq!(Percent::from_f64(1e300), Percent::LIMIT);
        assert_eq!(Percent::from_f64(f64::NAN), Percent::ZERO);
        assert!(serde_json::from_str::<Percent>("1e300").is_err());
    }

    #[test]
    fn checked_money_ops_report_overflow() {
        let huge = Money::new(i64::MAX / 2);
        assert_eq!(huge.checked_scale(4.0), None);
        assert_eq!(Money::from_units(10).checked_scale(2.5), Some(Money::from_units(25)));
        assert_eq!(huge.checked_apply_percent(Percent::from_f64(300.0)), None);
        assert_eq!(huge.apply_percent(Percent::from_f64(300.0)), Money::new(i64::MAX));
        assert_eq!(huge.checked_mul(3), None);
        assert_eq!(Money::from_units(1450).checked_mul(2), Some(Money::from_units(2900)));
    }

    #[test]
    fn percent_serializes_as_decimal() {
        let json = serde_json::to_string(&Percent::from_f64(18.5)).unwrap();
        assert_eq!(json, "18.5");
        let parsed: Percent = serde_json::from_str("28.5").unwrap();
        assert_eq!(parsed.basis_points(), 2850);
    }
}
