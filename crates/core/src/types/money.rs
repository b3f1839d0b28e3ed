//! Vietnamese đồng amounts.
//!
//! The đồng has no minor unit in circulation, so amounts are whole numbers
//! held in an `i64`. Arithmetic that can overflow is exposed only in checked
//! form; totals are never computed in floating point.

use core::fmt;

use serde::{Deserialize, Serialize};

/// An amount of Vietnamese đồng.
///
/// ```
/// use tram_sach_core::Vnd;
///
/// let line = Vnd::new(100_000).checked_mul_qty(2).unwrap();
/// assert_eq!(line, Vnd::new(200_000));
/// assert_eq!(line.to_string(), "200.000 ₫");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Vnd(i64);

impl Vnd {
    /// Zero đồng.
    pub const ZERO: Self = Self(0);

    /// Create an amount from a whole number of đồng.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// The amount as a whole number of đồng.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Add two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Multiply a unit price by a quantity, returning `None` on overflow.
    #[must_use]
    pub const fn checked_mul_qty(self, quantity: i64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Sum a sequence of amounts, returning `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl From<i64> for Vnd {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl From<Vnd> for i64 {
    fn from(amount: Vnd) -> Self {
        amount.0
    }
}

/// Formats with `.` as the thousands separator, e.g. `1.250.000 ₫`.
impl fmt::Display for Vnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            write!(f, "-{grouped} ₫")
        } else {
            write!(f, "{grouped} ₫")
        }
    }
}

#[cfg(feature = "sqlite")]
impl sqlx::Type<sqlx::Sqlite> for Vnd {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

#[cfg(feature = "sqlite")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Vnd {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?))
    }
}

#[cfg(feature = "sqlite")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Vnd {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_sum() {
        let total = Vnd::checked_sum([Vnd::new(200_000), Vnd::new(50_000)]).unwrap();
        assert_eq!(total, Vnd::new(250_000));
        assert_eq!(Vnd::checked_sum([]), Some(Vnd::ZERO));
    }

    #[test]
    fn test_overflow_is_detected() {
        assert!(Vnd::new(i64::MAX).checked_mul_qty(2).is_none());
        assert!(Vnd::checked_sum([Vnd::new(i64::MAX), Vnd::new(1)]).is_none());
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Vnd::new(0).to_string(), "0 ₫");
        assert_eq!(Vnd::new(999).to_string(), "999 ₫");
        assert_eq!(Vnd::new(1_000).to_string(), "1.000 ₫");
        assert_eq!(Vnd::new(1_250_000).to_string(), "1.250.000 ₫");
        assert_eq!(Vnd::new(-50_000).to_string(), "-50.000 ₫");
    }

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Vnd::new(39_000)).unwrap(), "39000");
    }
}
