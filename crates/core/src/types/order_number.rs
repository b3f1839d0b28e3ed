//! Human-facing order numbers.

use core::fmt;

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters used for the random suffix.
const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of the random suffix.
const SUFFIX_LEN: usize = 6;

/// An order number of the form `ORD-YYYYMMDD-XXXXXX`.
///
/// The suffix is random, not sequential; uniqueness is enforced by the
/// database and callers retry on collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate a fresh order number for the given date.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use tram_sach_core::OrderNumber;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    /// let number = OrderNumber::generate(date, &mut rand::rng());
    /// assert!(number.as_str().starts_with("ORD-20240309-"));
    /// assert_eq!(number.as_str().len(), 19);
    /// ```
    pub fn generate<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> Self {
        let suffix: String = (0..SUFFIX_LEN)
            .filter_map(|_| {
                SUFFIX_ALPHABET
                    .get(rng.random_range(0..SUFFIX_ALPHABET.len()))
                    .map(|&b| char::from(b))
            })
            .collect();
        Self(format!("ORD-{}-{suffix}", date.format("%Y%m%d")))
    }

    /// Wrap an existing order number, e.g. one read back from storage.
    #[must_use]
    pub const fn from_string(value: String) -> Self {
        Self(value)
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "sqlite")]
impl sqlx::Type<sqlx::Sqlite> for OrderNumber {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

#[cfg(feature = "sqlite")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for OrderNumber {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?))
    }
}

#[cfg(feature = "sqlite")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let number = OrderNumber::generate(date, &mut rand::rng());
        let s = number.as_str();

        assert_eq!(s.len(), 19);
        assert!(s.starts_with("ORD-20251231-"));
        assert!(
            s[13..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_numbers_differ() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut rng = rand::rng();
        let a = OrderNumber::generate(date, &mut rng);
        let b = OrderNumber::generate(date, &mut rng);
        // 36^6 possibilities; a clash here would point at a broken generator.
        assert_ne!(a, b);
    }
}
