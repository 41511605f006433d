//! Presentation Layer
//!
//! Wire shapes returned to clients. Each resource is a pure projection of
//! a stored record; anything not listed here (card number, expiry,
//! `disabled_at`, timestamps) never leaves the service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{
    Currency, DebitCard, DebitCardId, DebitCardTransaction, DebitCardTransactionId, Loan, LoanId,
    LoanStatus, ScheduledRepayment, ScheduledRepaymentId,
};

/// `{ "data": [...] }` envelope used by collection endpoints
#[derive(Debug, Clone, Serialize)]
pub struct Collection<T> {
    pub data: Vec<T>,
}

impl<T> Collection<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

// =========================================================================
// Debit cards
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebitCardResource {
    pub id: DebitCardId,
    #[serde(rename = "type")]
    pub card_type: String,
    pub is_active: bool,
}

impl From<&DebitCard> for DebitCardResource {
    fn from(card: &DebitCard) -> Self {
        Self {
            id: card.id,
            card_type: card.card_type.clone(),
            is_active: card.is_active(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebitCardTransactionResource {
    pub id: DebitCardTransactionId,
    pub debit_card_id: DebitCardId,
    pub amount: Decimal,
    pub currency_code: Currency,
    pub description: Option<String>,
}

impl From<&DebitCardTransaction> for DebitCardTransactionResource {
    fn from(transaction: &DebitCardTransaction) -> Self {
        Self {
            id: transaction.id,
            debit_card_id: transaction.debit_card_id,
            amount: transaction.amount,
            currency_code: transaction.currency_code,
            description: transaction.description.clone(),
        }
    }
}

// =========================================================================
// Loans
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanResource {
    pub id: LoanId,
    pub amount: Decimal,
    pub terms: i32,
    pub outstanding_amount: Decimal,
    pub currency_code: Currency,
    pub status: LoanStatus,
    pub processed_at: DateTime<Utc>,
}

impl From<&Loan> for LoanResource {
    fn from(loan: &Loan) -> Self {
        Self {
            id: loan.id,
            amount: loan.amount,
            terms: loan.terms,
            outstanding_amount: loan.outstanding_amount,
            currency_code: loan.currency_code,
            status: loan.status,
            processed_at: loan.processed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledRepaymentResource {
    pub id: ScheduledRepaymentId,
    pub loan_id: LoanId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub is_paid: bool,
}

impl From<&ScheduledRepayment> for ScheduledRepaymentResource {
    fn from(repayment: &ScheduledRepayment) -> Self {
        Self {
            id: repayment.id,
            loan_id: repayment.loan_id,
            amount: repayment.amount,
            due_date: repayment.due_date,
            is_paid: repayment.is_paid,
        }
    }
}

/// A loan together with its repayment schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanDetailResource {
    #[serde(flatten)]
    pub loan: LoanResource,
    pub scheduled_repayments: Vec<ScheduledRepaymentResource>,
}

impl LoanDetailResource {
    pub fn new(loan: &Loan, repayments: &[ScheduledRepayment]) -> Self {
        Self {
            loan: loan.into(),
            scheduled_repayments: repayments.iter().map(Into::into).collect(),
        }
    }
}
