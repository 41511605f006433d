//! Request rules
//!
//! One type per endpoint payload. Each turns an untyped JSON body (or
//! query value) into the typed command its handler executes, or into the
//! complete set of field errors.

use serde_json::Value;

use crate::domain::{Amount, AmountError, Currency, DebitCardId};
use crate::handlers::{
    CreateDebitCardCommand, CreateDebitCardTransactionCommand, DebitCardTransactionFilter,
    UpdateDebitCardCommand,
};

use super::{label, parse_id, present, required, ValidationErrors};

const MAX_STRING_LENGTH: usize = 255;

fn string_field(value: &Value, field: &str, errors: &mut ValidationErrors) -> Option<String> {
    let Some(s) = value.as_str() else {
        errors.add(field, format!("The {} must be a string.", label(field)));
        return None;
    };

    if s.chars().count() > MAX_STRING_LENGTH {
        errors.add(
            field,
            format!(
                "The {} must not be greater than {} characters.",
                label(field),
                MAX_STRING_LENGTH
            ),
        );
        return None;
    }

    Some(s.to_string())
}

// =========================================================================
// POST /debit-cards
// =========================================================================

/// `{ "type": "visa" }`
pub struct CreateDebitCardRequest;

impl CreateDebitCardRequest {
    pub fn validate(payload: &Value) -> Result<CreateDebitCardCommand, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let card_type = required(payload, "type", &mut errors)
            .and_then(|value| string_field(value, "type", &mut errors))
            .map(|s| s.trim().to_string());

        match card_type {
            Some(card_type) if card_type.is_empty() => {
                errors.add("type", "The type field is required.");
                Err(errors)
            }
            Some(card_type) => errors.into_result(CreateDebitCardCommand { card_type }),
            None => Err(errors),
        }
    }
}

// =========================================================================
// PUT /debit-cards/{id}
// =========================================================================

/// `{ "is_active": true }`
pub struct UpdateDebitCardRequest;

impl UpdateDebitCardRequest {
    pub fn validate(payload: &Value) -> Result<UpdateDebitCardCommand, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let is_active = required(payload, "is_active", &mut errors).and_then(|value| {
            let parsed = parse_boolean(value);
            if parsed.is_none() {
                errors.add("is_active", "The is active field must be true or false.");
            }
            parsed
        });

        match is_active {
            Some(is_active) => errors.into_result(UpdateDebitCardCommand { is_active }),
            None => Err(errors),
        }
    }
}

/// true/false, plus the 1/0 forms form-encoded clients send
fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.as_str() {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// =========================================================================
// POST /debit-card-transactions
// =========================================================================

/// `{ "debit_card_id": 1, "amount": 100.00, "currency_code": "THB", "description": "..." }`
///
/// Only the shape of `debit_card_id` is checked here; whether the card
/// exists is a store lookup the handler performs next.
pub struct CreateDebitCardTransactionRequest;

impl CreateDebitCardTransactionRequest {
    pub fn validate(payload: &Value) -> Result<CreateDebitCardTransactionCommand, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let debit_card_id = required(payload, "debit_card_id", &mut errors).and_then(|value| {
            let id = parse_id(value).map(DebitCardId);
            if id.is_none() {
                errors.add("debit_card_id", "The debit card id must be an integer.");
            }
            id
        });

        let amount = required(payload, "amount", &mut errors).and_then(|value| {
            match parse_amount(value) {
                Ok(amount) => Some(amount),
                Err(message) => {
                    errors.add("amount", message);
                    None
                }
            }
        });

        let currency_code = required(payload, "currency_code", &mut errors)
            .and_then(|value| string_field(value, "currency_code", &mut errors))
            .and_then(|code| match code.parse::<Currency>() {
                Ok(currency) => Some(currency),
                Err(_) => {
                    errors.add("currency_code", "The selected currency code is invalid.");
                    None
                }
            });

        let description = match present(payload, "description") {
            Some(value) => string_field(value, "description", &mut errors),
            None => None,
        };

        match (debit_card_id, amount, currency_code) {
            (Some(debit_card_id), Some(amount), Some(currency_code)) => {
                errors.into_result(CreateDebitCardTransactionCommand {
                    debit_card_id,
                    amount,
                    currency_code,
                    description,
                })
            }
            _ => Err(errors),
        }
    }
}

fn parse_amount(value: &Value) -> Result<Amount, &'static str> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Err("The amount must be a number."),
    };

    raw.parse::<Amount>().map_err(|e| match e {
        AmountError::NotPositive(_) => "The amount must be greater than 0.",
        AmountError::TooManyDecimals(_) => "The amount must not have more than 2 decimal places.",
        AmountError::Overflow => "The amount is too large.",
        AmountError::ParseError(_) => "The amount must be a number.",
    })
}

// =========================================================================
// GET /debit-card-transactions
// =========================================================================

/// Optional `?debit_card_id=` filter
pub struct DebitCardTransactionIndexRequest;

impl DebitCardTransactionIndexRequest {
    pub fn validate(debit_card_id: Option<&str>) -> Result<DebitCardTransactionFilter, ValidationErrors> {
        let Some(raw) = debit_card_id else {
            return Ok(DebitCardTransactionFilter::default());
        };

        match parse_id(&Value::String(raw.to_string())) {
            Some(id) => Ok(DebitCardTransactionFilter {
                debit_card_id: Some(DebitCardId(id)),
            }),
            None => Err(ValidationErrors::single(
                "debit_card_id",
                "The debit card id must be an integer.",
            )),
        }
    }
}
