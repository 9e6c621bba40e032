//! Positive-decimal value objects: quantities and money.
//!
//! Both wrap [`rust_decimal::Decimal`] so that `DECIMAL(10,2)` columns round
//! trip exactly; floats are never used for these.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A strictly positive quantity in kilograms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    pub fn new(kilograms: Decimal) -> DomainResult<Self> {
        if kilograms <= Decimal::ZERO {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self(kilograms))
    }

    pub fn kilograms(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for Quantity {}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} kg", self.0)
    }
}

/// A strictly positive monetary amount.
///
/// Currency is implicit (single-currency system, as in the source schema);
/// only the magnitude is modeled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("amount must be positive"));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Total price of `quantity` at this per-kilogram rate.
    pub fn total_for(&self, quantity: Quantity) -> Money {
        Money(self.0 * quantity.kilograms())
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn quantity_rejects_zero_and_negative() {
        assert!(Quantity::new(Decimal::ZERO).is_err());
        assert!(Quantity::new(dec("-3.5")).is_err());
        assert!(Quantity::new(dec("0.01")).is_ok());
    }

    #[test]
    fn money_rejects_zero_and_negative() {
        assert!(Money::new(Decimal::ZERO).is_err());
        assert!(Money::new(dec("-1")).is_err());
    }

    #[test]
    fn total_for_multiplies_exactly() {
        let price = Money::new(dec("50.25")).unwrap();
        let qty = Quantity::new(dec("100")).unwrap();
        assert_eq!(price.total_for(qty).amount(), dec("5025.00"));
    }
}
