//! Amount type
//!
//! Domain primitive for monetary amounts on card transactions and loans.
//! All amounts are validated at construction time and normalized to two
//! decimal places, matching the NUMERIC(16,2) columns they are stored in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest value a NUMERIC(16,2) column can hold
const MAX_AMOUNT: &str = "99999999999999.99";

/// Maximum decimal places (2)
const MAX_SCALE: u32 = 2;

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - At most 2 decimal places, always stored with scale 2
/// - Fits a NUMERIC(16,2) column
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use debit_card_api::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(100, 0)).unwrap();
/// assert_eq!(amount.to_string(), "100.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be greater than 0 (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 2 decimal places
    /// - `AmountError::Overflow` if the value does not fit NUMERIC(16,2)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        // Trailing zeros ("100.000") are not extra precision
        let value = value.normalize();
        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        if value > max_amount() {
            return Err(AmountError::Overflow);
        }

        let mut value = value;
        value.rescale(MAX_SCALE);
        Ok(Self(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

fn max_amount() -> Decimal {
    Decimal::from_str(MAX_AMOUNT).unwrap_or(Decimal::MAX)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Accepts plain decimals ("100.5") and the exponent form JSON
    /// encoders sometimes emit ("1e2").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let decimal = Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
