//! Supported currencies
//!
//! Card transactions and loans are denominated in one of a fixed set of
//! ISO 4217 codes. Anything outside the allow-list is rejected at the edge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency code stored as TEXT in database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Idr,
    Sgd,
    Thb,
    Usd,
    Vnd,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported currency code: {0}")]
pub struct UnsupportedCurrency(pub String);

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Idr,
        Currency::Sgd,
        Currency::Thb,
        Currency::Usd,
        Currency::Vnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Idr => "IDR",
            Currency::Sgd => "SGD",
            Currency::Thb => "THB",
            Currency::Usd => "USD",
            Currency::Vnd => "VND",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    /// Codes are matched exactly; "thb" is not THB.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnsupportedCurrency(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_codes() {
        for currency in Currency::ALL {
            assert_eq!(currency.as_str().parse::<Currency>().unwrap(), currency);
        }
    }

    #[test]
    fn test_lowercase_code_rejected() {
        assert_eq!(
            "thb".parse::<Currency>(),
            Err(UnsupportedCurrency("thb".to_string()))
        );
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!("EUR".parse::<Currency>().is_err());
    }

    #[test]
    fn test_serde_uses_iso_code() {
        let json = serde_json::to_string(&Currency::Vnd).unwrap();
        assert_eq!(json, "\"VND\"");
        let parsed: Currency = serde_json::from_str("\"SGD\"").unwrap();
        assert_eq!(parsed, Currency::Sgd);
    }
}
