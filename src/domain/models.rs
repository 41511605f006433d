//! Records
//!
//! Row types for every table the service reads, plus the `New*` inputs
//! used to create them. Identifiers are typed so a card id can never be
//! passed where a transaction id is expected.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Currency;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Primary key of `users`
    UserId
);
record_id!(
    /// Primary key of `personal_access_tokens`
    AccessTokenId
);
record_id!(
    /// Primary key of `debit_cards`
    DebitCardId
);
record_id!(
    /// Primary key of `debit_card_transactions`
    DebitCardTransactionId
);
record_id!(
    /// Primary key of `loans`
    LoanId
);
record_id!(
    /// Primary key of `scheduled_repayments`
    ScheduledRepaymentId
);

// =========================================================================
// Users and access tokens
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Stored bearer credential. Only the SHA-256 of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AccessToken {
    pub id: AccessTokenId,
    pub user_id: UserId,
    pub name: String,
    pub token_hash: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

// =========================================================================
// Debit cards
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DebitCard {
    pub id: DebitCardId,
    pub user_id: UserId,
    pub number: i64,
    #[sqlx(rename = "type")]
    pub card_type: String,
    pub expiration_date: DateTime<Utc>,
    /// `None` means the card is active
    pub disabled_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DebitCard {
    pub fn is_active(&self) -> bool {
        self.disabled_at.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewDebitCard {
    pub user_id: UserId,
    pub card_type: String,
    pub number: i64,
    pub expiration_date: DateTime<Utc>,
    pub disabled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DebitCardTransaction {
    pub id: DebitCardTransactionId,
    pub debit_card_id: DebitCardId,
    pub amount: Decimal,
    pub currency_code: Currency,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDebitCardTransaction {
    pub debit_card_id: DebitCardId,
    pub amount: Decimal,
    pub currency_code: Currency,
    pub description: Option<String>,
}

// =========================================================================
// Loans and scheduled repayments
// =========================================================================

/// Loan status stored as TEXT in database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Repaid,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Loan {
    pub id: LoanId,
    pub user_id: UserId,
    pub amount: Decimal,
    /// Number of repayment periods
    pub terms: i32,
    pub outstanding_amount: Decimal,
    pub currency_code: Currency,
    pub status: LoanStatus,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLoan {
    pub user_id: UserId,
    pub amount: Decimal,
    pub terms: i32,
    pub outstanding_amount: Decimal,
    pub currency_code: Currency,
    pub status: LoanStatus,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ScheduledRepayment {
    pub id: ScheduledRepaymentId,
    pub loan_id: LoanId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScheduledRepayment {
    pub loan_id: LoanId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub is_paid: bool,
}
