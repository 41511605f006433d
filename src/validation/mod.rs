//! Validation Layer
//!
//! Shape, type and reference checks on incoming payloads. Failures are
//! collected per field and reported together as a 422, before the
//! ownership policy ever sees the request.

mod requests;

pub use requests::{
    CreateDebitCardRequest, CreateDebitCardTransactionRequest, DebitCardTransactionIndexRequest,
    UpdateDebitCardRequest,
};

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field name → human readable messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// A referenced record does not exist
    pub fn invalid_selection(field: &str) -> Self {
        Self::single(field, format!("The selected {} is invalid.", label(field)))
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(value)` when nothing failed
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Human form of a field name ("debit_card_id" → "debit card id")
fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Look up a field, treating JSON `null` the same as absence.
fn present<'a>(payload: &'a Value, field: &str) -> Option<&'a Value> {
    payload.get(field).filter(|value| !value.is_null())
}

fn required<'a>(payload: &'a Value, field: &str, errors: &mut ValidationErrors) -> Option<&'a Value> {
    let value = present(payload, field);
    if value.is_none() {
        errors.add(field, format!("The {} field is required.", label(field)));
    }
    value
}

/// Positive integer, given either as a JSON integer or a digit string.
fn parse_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (id > 0).then_some(id)
}
