use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// An amount of money in integer cents.
///
/// Budget caps and expense amounts are stored in this unit, and spent and
/// remaining figures are computed in it. It is signed because a budget over
/// its cap has a negative remaining amount.
///
/// ```rust
/// use engine::MoneyCents;
///
/// assert_eq!(MoneyCents::new(12_34).to_string(), "$12.34");
/// assert_eq!("$10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<MoneyCents>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Largest amount a single budget cap or expense may carry
    /// ($10,000,000,000.00). Keeps every sum far inside `i64`.
    pub const MAX_AMOUNT: MoneyCents = MoneyCents(1_000_000_000_000);

    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `true` for `0 < self <= MAX_AMOUNT`, the range stored amounts live in.
    #[must_use]
    pub const fn is_storable(self) -> bool {
        self.0 > 0 && self.0 <= Self::MAX_AMOUNT.0
    }

    /// Converts a major-unit amount such as `12.999` into cents, rounding
    /// half away from zero. Non-finite values and values beyond
    /// [`MAX_AMOUNT`](Self::MAX_AMOUNT) are rejected.
    pub fn from_major_f64(value: f64) -> Result<Self, EngineError> {
        if !value.is_finite() {
            return Err(EngineError::InvalidAmount(
                "amount must be a finite number".to_string(),
            ));
        }
        let scaled = (value * 100.0).round();
        let max = Self::MAX_AMOUNT.0 as f64;
        if scaled > max || scaled < -max {
            return Err(EngineError::InvalidAmount("amount too large".to_string()));
        }
        Ok(Self(scaled as i64))
    }

    /// `spent / self` as a percentage. Zero when `self` is not positive.
    #[must_use]
    pub fn percent_of(self, spent: MoneyCents) -> f64 {
        if self.0 <= 0 {
            return 0.0;
        }
        spent.0 as f64 * 100.0 / self.0 as f64
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a MoneyCents> for MoneyCents {
    fn sum<I: Iterator<Item = &'a MoneyCents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Parses user input such as `12`, `12.5`, `12,99`, `$12.99` or `-0.01`.
///
/// Either `.` or `,` separates the cents; at most two decimals are allowed.
impl FromStr for MoneyCents {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EngineError::InvalidAmount(format!("{reason}: {s:?}"));

        let raw = s.trim();
        let (negative, raw) = match raw.as_bytes().first() {
            Some(b'-') => (true, &raw[1..]),
            Some(b'+') => (false, &raw[1..]),
            _ => (false, raw),
        };
        let raw = raw.trim_start();
        let raw = raw.strip_prefix('$').unwrap_or(raw);
        if raw.is_empty() {
            return Err(invalid("empty amount"));
        }

        let (whole, frac) = match raw.split_once(['.', ',']) {
            Some((whole, frac)) => (whole, frac),
            None => (raw, ""),
        };
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits(whole) || !digits(frac) {
            return Err(invalid("invalid amount"));
        }
        let frac_cents = match frac.len() {
            0 => 0,
            1 => i64::from(frac.as_bytes()[0] - b'0') * 10,
            2 => i64::from(frac.as_bytes()[0] - b'0') * 10 + i64::from(frac.as_bytes()[1] - b'0'),
            _ => return Err(invalid("too many decimals")),
        };

        let cents = whole
            .parse::<i64>()
            .ok()
            .and_then(|whole| whole.checked_mul(100))
            .and_then(|cents| cents.checked_add(frac_cents))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(MoneyCents(if negative { -cents } else { cents }))
    }
}
