//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`] from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The amount is zero or negative.
    #[error("price must be greater than zero")]
    NotPositive,
    /// The amount has more than two decimal places.
    #[error("price can have at most two decimal places")]
    TooPrecise,
    /// The amount does not fit the stored `NUMERIC(12,2)` column.
    #[error("price cannot exceed {}", Price::MAX)]
    TooLarge,
}

/// A monetary amount in the shop currency.
///
/// Always positive for catalog prices; totals built with [`Price::times`] and
/// [`Sum`] may be zero (an empty cart).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest catalog price, `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, 2));

    /// Wrap a decimal amount without validation.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Parse a catalog price from form input such as `"12.99"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the input is not a number, not positive, has
    /// more than two decimal places, or is above [`Price::MAX`].
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        let amount = amount.normalize();
        if amount.scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// This price multiplied by a line quantity, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(
            self.0
                .checked_mul(Decimal::from(quantity))
                .unwrap_or(Decimal::MAX),
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(Decimal::ZERO, |total, p| {
            total.checked_add(p.0).unwrap_or(Decimal::MAX)
        }))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_prices() {
        assert_eq!(Price::parse("12.99").unwrap().to_string(), "12.99");
        assert_eq!(Price::parse(" 5 ").unwrap().to_string(), "5.00");
        assert_eq!(Price::parse("0.5").unwrap().to_string(), "0.50");
    }

    #[test]
    fn test_parse_trailing_zeros_are_not_precision() {
        assert_eq!(Price::parse("3.1000").unwrap().to_string(), "3.10");
    }

    #[test]
    fn test_parse_rejects_invalid_input() {
        assert_eq!(Price::parse("abc"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse(""), Err(PriceError::NotANumber));
        assert_eq!(Price::parse("0"), Err(PriceError::NotPositive));
        assert_eq!(Price::parse("-1.00"), Err(PriceError::NotPositive));
        assert_eq!(Price::parse("1.999"), Err(PriceError::TooPrecise));
    }

    #[test]
    fn test_times_and_sum() {
        let a = Price::parse("2.50").unwrap().times(3);
        let b = Price::parse("1.25").unwrap();
        let total: Price = [a, b].into_iter().sum();
        assert_eq!(total.to_string(), "8.75");
    }

    #[test]
    fn test_parse_upper_bound() {
        assert_eq!(Price::MAX.to_string(), "9999999999.99");
        assert_eq!(Price::parse("9999999999.99").unwrap(), Price::MAX);
        assert_eq!(Price::parse("100000000000"), Err(PriceError::TooLarge));
        assert_eq!(
            Price::parse("79228162514264337593543950335"),
            Err(PriceError::TooLarge)
        );
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_panicking() {
        let huge = Price::new(Decimal::MAX);
        assert_eq!(huge.times(2), huge);
        let total: Price = [huge, huge, Price::parse("1").unwrap()].into_iter().sum();
        assert_eq!(total, huge);
        assert_eq!(Price::MAX.times(u32::MAX).to_string(), "42949672949957050327.05");
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let total: Price = core::iter::empty().sum();
        assert_eq!(total, Price::ZERO);
        assert_eq!(total.to_string(), "0.00");
    }

    #[test]
    fn test_serde_uses_string_amount() {
        let price = Price::parse("9.99").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"9.99\"");
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
    }
}
