//! Endpoint Handlers module
//!
//! One handler per resource. Each handler method is a complete endpoint
//! pipeline: resolve → validate → authorize → execute → present, with the
//! caller passed in explicitly and the first failure returned as-is.

mod commands;
mod debit_card_handler;
mod debit_card_transaction_handler;
mod loan_handler;

#[cfg(test)]
mod tests;

pub use commands::*;
pub use debit_card_handler::DebitCardHandler;
pub use debit_card_transaction_handler::DebitCardTransactionHandler;
pub use loan_handler::LoanHandler;
