//! Command definitions
//!
//! Validated, typed intentions produced by the validation layer and
//! executed by the handlers.

use crate::domain::{Amount, Currency, DebitCardId};

/// Command to issue a new debit card to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDebitCardCommand {
    pub card_type: String,
}

/// Command to activate or deactivate a debit card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateDebitCardCommand {
    pub is_active: bool,
}

/// Command to record a transaction against a debit card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDebitCardTransactionCommand {
    pub debit_card_id: DebitCardId,
    pub amount: Amount,
    pub currency_code: Currency,
    pub description: Option<String>,
}

/// Narrowing applied to the caller's transaction list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebitCardTransactionFilter {
    pub debit_card_id: Option<DebitCardId>,
}
