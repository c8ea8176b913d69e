//! # Quantity
//!
//! Sold quantities and stock levels in thousandths of a unit.
//!
//! Shops sell both counted goods ("Pcs") and weighed goods ("Kg"), so a
//! line may carry `1.5`. Storing milli-units keeps every calculation in
//! integers while still accepting decimal input at the JSON boundary.
//!
//! ```text
//! JSON "quantity": 1.5  ──►  Quantity(1500)  ──►  rate.times(qty)
//! JSON "quantity": 3    ──►  Quantity(3000)
//! ```

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// A quantity in milli-units (1000 = one unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Quantity(#[ts(type = "number")] i64);

impl Quantity {
    /// Milli-units per unit.
    pub const SCALE: i64 = 1000;

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// True when the quantity has no fractional part.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % Self::SCALE == 0
    }

    /// Converts a decimal number, rounding to the nearest milli-unit.
    ///
    /// Returns `None` for NaN, infinities and values beyond ±10^12 units.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value.abs() > 1e12 {
            return None;
        }
        Some(Quantity((value * Self::SCALE as f64).round() as i64))
    }

    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Subtracts `sold`, flooring the result at zero.
    #[inline]
    pub fn saturating_decrement(self, sold: Quantity) -> Quantity {
        Quantity((self.0 - sold.0).max(0))
    }
}

/// Displays without trailing zeros: `3`, `1.5`, `0.125`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:03}", frac);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::invalid_format("quantity", format!("'{}' is not a quantity", s));

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || frac.len() > 3 {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = whole.parse().map_err(|_| invalid())?;
        let milli: i64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<3}", frac).parse().map_err(|_| invalid())?
        };

        let total = units
            .checked_mul(Self::SCALE)
            .and_then(|u| u.checked_add(milli))
            .ok_or_else(invalid)?;

        Ok(Quantity(if negative { -total } else { total }))
    }
}

/// Serializes as a JSON number in units (`3`, `1.5`).
impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_whole() {
            serializer.serialize_i64(self.0 / Self::SCALE)
        } else {
            serializer.serialize_f64(self.to_f64())
        }
    }
}

/// Accepts any JSON/TOML number in units.
impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Quantity::from_f64(value).ok_or_else(|| de::Error::custom("quantity must be a finite number"))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_units(3).to_string(), "3");
        assert_eq!(Quantity::from_milli(1500).to_string(), "1.5");
        assert_eq!(Quantity::from_milli(125).to_string(), "0.125");
        assert_eq!(Quantity::from_milli(-2050).to_string(), "-2.05");
    }

    #[test]
    fn test_parse() {
        assert_eq!("3".parse::<Quantity>().unwrap(), Quantity::from_units(3));
        assert_eq!("1.5".parse::<Quantity>().unwrap(), Quantity::from_milli(1500));
        assert_eq!("0.125".parse::<Quantity>().unwrap(), Quantity::from_milli(125));
        assert!("1.2345".parse::<Quantity>().is_err());
        assert!("x".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_json_boundary() {
        let q: Quantity = serde_json::from_str("1.5").unwrap();
        assert_eq!(q.milli(), 1500);
        let q: Quantity = serde_json::from_str("2").unwrap();
        assert_eq!(q.milli(), 2000);

        assert_eq!(serde_json::to_string(&Quantity::from_units(2)).unwrap(), "2");
        assert_eq!(serde_json::to_string(&Quantity::from_milli(250)).unwrap(), "0.25");
    }

    #[test]
    fn test_saturating_decrement() {
        let stock = Quantity::from_units(5);
        assert_eq!(stock.saturating_decrement(Quantity::from_units(3)), Quantity::from_units(2));
        assert_eq!(stock.saturating_decrement(Quantity::from_units(8)), Quantity::zero());
    }

    #[test]
    fn test_from_f64_rejects_garbage() {
        assert!(Quantity::from_f64(f64::NAN).is_none());
        assert!(Quantity::from_f64(f64::INFINITY).is_none());
        assert_eq!(Quantity::from_f64(2.5).map(|q| q.milli()), Some(2500));
    }
}
