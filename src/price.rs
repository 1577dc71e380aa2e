//! Fixed-point decimal odds.
//!
//! `spec.md` §9 warns that storing price as a float map key is fragile and
//! recommends fixed-point cents-of-odds instead. [`Price`] stores decimal
//! odds as hundredths (`price_x100`), so `2.00` is `200` and `1000.00` is
//! `100000`. Equality and ordering are then exact integer comparisons,
//! which is what `BTreeMap` keys need.

use std::fmt;

/// Decimal odds, stored as an exact multiple of `0.01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Price {
    price_x100: i64,
}

impl Price {
    /// Builds a [`Price`] from decimal odds already expressed in hundredths,
    /// e.g. `Price::from_x100(200)` is odds of `2.00`.
    pub const fn from_x100(price_x100: i64) -> Self {
        Self { price_x100 }
    }

    /// Builds a [`Price`] from a floating-point decimal odds value, rounding
    /// to the nearest cent. Used at the API boundary and for the VMO price
    /// computed in `spec.md` §4.4 step 5 (`round(1 / (1 - B), 2)`).
    pub fn from_f64_round(odds: f64) -> Self {
        Self {
            price_x100: (odds * 100.0).round() as i64,
        }
    }

    /// The decimal odds as a floating-point value, e.g. `2.0`.
    pub fn as_f64(self) -> f64 {
        self.price_x100 as f64 / 100.0
    }

    /// Implied probability `1 / price` (GLOSSARY).
    pub fn implied_probability(self) -> f64 {
        1.0 / self.as_f64()
    }

    pub const fn price_x100(self) -> i64 {
        self.price_x100
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_f64())
    }
}

impl From<f64> for Price {
    fn from(odds: f64) -> Self {
        Price::from_f64_round(odds)
    }
}
