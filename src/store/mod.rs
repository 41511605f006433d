//! Record Store
//!
//! Persistence seam for users, tokens, cards, transactions, loans and
//! repayments. Handlers only see [`RecordStore`]; PostgreSQL backs it in
//! production and an in-memory implementation backs tests.
//!
//! Soft-deleted debit cards are invisible to every lookup except
//! [`RecordStore::find_debit_card_with_trashed`].

mod memory;
mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AccessToken, AccessTokenId, DebitCard, DebitCardId, DebitCardTransaction,
    DebitCardTransactionId, Loan, LoanId, NewDebitCard, NewDebitCardTransaction, NewLoan,
    NewScheduledRepayment, NewUser, ScheduledRepayment, User, UserId,
};
use crate::policy::PolicyError;

/// Store-level Result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Check run against a locked card and its transaction count right before
/// it is soft-deleted. Returning an error aborts the delete.
pub type DeleteGuard<'a> = &'a (dyn Fn(&DebitCard, i64) -> Result<(), PolicyError> + Send + Sync);

/// Errors that can occur in the record store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Row does not exist (or is soft-deleted)
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    /// A guard refused the write
    #[error(transparent)]
    Rejected(#[from] PolicyError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(resource: &'static str, id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            resource,
            id: id.into(),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    // ---------------------------------------------------------------------
    // Users and access tokens
    // ---------------------------------------------------------------------

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn create_access_token(
        &self,
        user_id: UserId,
        name: &str,
        token_hash: &str,
    ) -> StoreResult<AccessToken>;

    async fn find_access_token(&self, token_hash: &str) -> StoreResult<Option<AccessToken>>;

    async fn touch_access_token(&self, id: AccessTokenId, used_at: DateTime<Utc>) -> StoreResult<()>;

    async fn revoke_access_token(&self, id: AccessTokenId) -> StoreResult<()>;

    // ---------------------------------------------------------------------
    // Debit cards
    // ---------------------------------------------------------------------

    /// Live cards of `owner`, active and disabled alike, in id order
    async fn list_debit_cards(&self, owner: UserId) -> StoreResult<Vec<DebitCard>>;

    async fn create_debit_card(&self, card: NewDebitCard) -> StoreResult<DebitCard>;

    async fn find_debit_card(&self, id: DebitCardId) -> StoreResult<Option<DebitCard>>;

    async fn find_debit_card_with_trashed(&self, id: DebitCardId) -> StoreResult<Option<DebitCard>>;

    /// Atomically overwrite `disabled_at` of a live card
    async fn set_debit_card_disabled_at(
        &self,
        id: DebitCardId,
        disabled_at: Option<DateTime<Utc>>,
    ) -> StoreResult<DebitCard>;

    /// Lock the card, count its transactions, run `guard`, and soft-delete
    /// if the guard passes. No transaction can be attached in between.
    async fn soft_delete_debit_card(&self, id: DebitCardId, guard: DeleteGuard<'_>) -> StoreResult<()>;

    async fn count_debit_card_transactions(&self, id: DebitCardId) -> StoreResult<i64>;

    // ---------------------------------------------------------------------
    // Debit card transactions
    // ---------------------------------------------------------------------

    /// Transactions on live cards of `owner`, optionally narrowed to one card
    async fn list_debit_card_transactions(
        &self,
        owner: UserId,
        debit_card_id: Option<DebitCardId>,
    ) -> StoreResult<Vec<DebitCardTransaction>>;

    /// Insert while holding a shared lock on the parent card, so a
    /// concurrent delete either sees this row or happens first.
    async fn create_debit_card_transaction(
        &self,
        transaction: NewDebitCardTransaction,
    ) -> StoreResult<DebitCardTransaction>;

    async fn find_debit_card_transaction(
        &self,
        id: DebitCardTransactionId,
    ) -> StoreResult<Option<DebitCardTransaction>>;

    // ---------------------------------------------------------------------
    // Loans and scheduled repayments
    // ---------------------------------------------------------------------

    async fn create_loan(&self, loan: NewLoan) -> StoreResult<Loan>;

    async fn list_loans(&self, owner: UserId) -> StoreResult<Vec<Loan>>;

    async fn find_loan(&self, id: LoanId) -> StoreResult<Option<Loan>>;

    async fn create_scheduled_repayment(
        &self,
        repayment: NewScheduledRepayment,
    ) -> StoreResult<ScheduledRepayment>;

    /// Repayments of a loan ordered by due date
    async fn list_scheduled_repayments(&self, loan_id: LoanId) -> StoreResult<Vec<ScheduledRepayment>>;
}
