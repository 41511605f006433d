//! PostgreSQL Record Store
//!
//! Raw SQL against the schema in `migrations/`. Card deletion and
//! transaction creation take row locks on the parent card so the
//! "no transactions" guard cannot race an insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    AccessToken, AccessTokenId, DebitCard, DebitCardId, DebitCardTransaction,
    DebitCardTransactionId, Loan, LoanId, NewDebitCard, NewDebitCardTransaction, NewLoan,
    NewScheduledRepayment, NewUser, ScheduledRepayment, User, UserId,
};

use super::{DeleteGuard, RecordStore, StoreError, StoreResult};

const DEBIT_CARD_COLUMNS: &str = "id, user_id, number, type, expiration_date, disabled_at, \
     deleted_at, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "id, debit_card_id, amount, currency_code, description, created_at, updated_at";

const LOAN_COLUMNS: &str = "id, user_id, amount, terms, outstanding_amount, currency_code, \
     status, processed_at, created_at, updated_at";

const REPAYMENT_COLUMNS: &str = "id, loan_id, amount, due_date, is_paid, created_at, updated_at";

const TOKEN_COLUMNS: &str =
    "id, user_id, name, token_hash, last_used_at, revoked_at, created_at";

/// Record store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new PgRecordStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    // =========================================================================
    // Users and access tokens
    // =========================================================================

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_access_token(
        &self,
        user_id: UserId,
        name: &str,
        token_hash: &str,
    ) -> StoreResult<AccessToken> {
        let token = sqlx::query_as::<_, AccessToken>(&format!(
            r#"
            INSERT INTO personal_access_tokens (user_id, name, token_hash, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    async fn find_access_token(&self, token_hash: &str) -> StoreResult<Option<AccessToken>> {
        let token = sqlx::query_as::<_, AccessToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM personal_access_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn touch_access_token(&self, id: AccessTokenId, used_at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE personal_access_tokens SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(used_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_access_token(&self, id: AccessTokenId) -> StoreResult<()> {
        let rows_affected = sqlx::query(
            "UPDATE personal_access_tokens SET revoked_at = COALESCE(revoked_at, NOW()) WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::not_found("personal_access_token", id));
        }

        Ok(())
    }

    // =========================================================================
    // Debit cards
    // =========================================================================

    async fn list_debit_cards(&self, owner: UserId) -> StoreResult<Vec<DebitCard>> {
        let cards = sqlx::query_as::<_, DebitCard>(&format!(
            r#"
            SELECT {DEBIT_CARD_COLUMNS}
            FROM debit_cards
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY id
            "#
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn create_debit_card(&self, card: NewDebitCard) -> StoreResult<DebitCard> {
        let card = sqlx::query_as::<_, DebitCard>(&format!(
            r#"
            INSERT INTO debit_cards (user_id, number, type, expiration_date, disabled_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {DEBIT_CARD_COLUMNS}
            "#
        ))
        .bind(card.user_id)
        .bind(card.number)
        .bind(&card.card_type)
        .bind(card.expiration_date)
        .bind(card.disabled_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(debit_card_id = %card.id, user_id = %card.user_id, "Debit card inserted");

        Ok(card)
    }

    async fn find_debit_card(&self, id: DebitCardId) -> StoreResult<Option<DebitCard>> {
        let card = sqlx::query_as::<_, DebitCard>(&format!(
            "SELECT {DEBIT_CARD_COLUMNS} FROM debit_cards WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn find_debit_card_with_trashed(&self, id: DebitCardId) -> StoreResult<Option<DebitCard>> {
        let card = sqlx::query_as::<_, DebitCard>(&format!(
            "SELECT {DEBIT_CARD_COLUMNS} FROM debit_cards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn set_debit_card_disabled_at(
        &self,
        id: DebitCardId,
        disabled_at: Option<DateTime<Utc>>,
    ) -> StoreResult<DebitCard> {
        // Single statement: the row lock is held for the read-modify-write
        let card = sqlx::query_as::<_, DebitCard>(&format!(
            r#"
            UPDATE debit_cards
            SET disabled_at = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {DEBIT_CARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(disabled_at)
        .fetch_optional(&self.pool)
        .await?;

        card.ok_or_else(|| StoreError::not_found("debit_card", id))
    }

    async fn soft_delete_debit_card(&self, id: DebitCardId, guard: DeleteGuard<'_>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE conflicts with the FOR SHARE taken by transaction inserts
        let card = sqlx::query_as::<_, DebitCard>(&format!(
            r#"
            SELECT {DEBIT_CARD_COLUMNS}
            FROM debit_cards
            WHERE id = $1 AND deleted_at IS NULL
            FOR UPDATE
            "#
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("debit_card", id))?;

        let transaction_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM debit_card_transactions WHERE debit_card_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        // Dropping `tx` on the error path rolls back and releases the lock
        guard(&card, transaction_count)?;

        sqlx::query("UPDATE debit_cards SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(debit_card_id = %id, "Debit card soft-deleted");

        Ok(())
    }

    async fn count_debit_card_transactions(&self, id: DebitCardId) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM debit_card_transactions WHERE debit_card_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Debit card transactions
    // =========================================================================

    async fn list_debit_card_transactions(
        &self,
        owner: UserId,
        debit_card_id: Option<DebitCardId>,
    ) -> StoreResult<Vec<DebitCardTransaction>> {
        let transactions = sqlx::query_as::<_, DebitCardTransaction>(
            r#"
            SELECT t.id, t.debit_card_id, t.amount, t.currency_code, t.description,
                   t.created_at, t.updated_at
            FROM debit_card_transactions t
            JOIN debit_cards c ON c.id = t.debit_card_id
            WHERE c.user_id = $1
              AND c.deleted_at IS NULL
              AND ($2::BIGINT IS NULL OR t.debit_card_id = $2)
            ORDER BY t.id
            "#,
        )
        .bind(owner)
        .bind(debit_card_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn create_debit_card_transaction(
        &self,
        transaction: NewDebitCardTransaction,
    ) -> StoreResult<DebitCardTransaction> {
        let mut tx = self.pool.begin().await?;

        let card_id: Option<DebitCardId> = sqlx::query_scalar(
            "SELECT id FROM debit_cards WHERE id = $1 AND deleted_at IS NULL FOR SHARE",
        )
        .bind(transaction.debit_card_id)
        .fetch_optional(&mut *tx)
        .await?;

        if card_id.is_none() {
            return Err(StoreError::not_found("debit_card", transaction.debit_card_id));
        }

        let created = sqlx::query_as::<_, DebitCardTransaction>(&format!(
            r#"
            INSERT INTO debit_card_transactions (debit_card_id, amount, currency_code, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction.debit_card_id)
        .bind(transaction.amount)
        .bind(transaction.currency_code)
        .bind(&transaction.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            transaction_id = %created.id,
            debit_card_id = %created.debit_card_id,
            "Debit card transaction inserted"
        );

        Ok(created)
    }

    async fn find_debit_card_transaction(
        &self,
        id: DebitCardTransactionId,
    ) -> StoreResult<Option<DebitCardTransaction>> {
        let transaction = sqlx::query_as::<_, DebitCardTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM debit_card_transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    // =========================================================================
    // Loans and scheduled repayments
    // =========================================================================

    async fn create_loan(&self, loan: NewLoan) -> StoreResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (user_id, amount, terms, outstanding_amount, currency_code, status, processed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(loan.user_id)
        .bind(loan.amount)
        .bind(loan.terms)
        .bind(loan.outstanding_amount)
        .bind(loan.currency_code)
        .bind(loan.status)
        .bind(loan.processed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan)
    }

    async fn list_loans(&self, owner: UserId) -> StoreResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE user_id = $1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn find_loan(&self, id: LoanId) -> StoreResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    async fn create_scheduled_repayment(
        &self,
        repayment: NewScheduledRepayment,
    ) -> StoreResult<ScheduledRepayment> {
        let repayment = sqlx::query_as::<_, ScheduledRepayment>(&format!(
            r#"
            INSERT INTO scheduled_repayments (loan_id, amount, due_date, is_paid, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {REPAYMENT_COLUMNS}
            "#
        ))
        .bind(repayment.loan_id)
        .bind(repayment.amount)
        .bind(repayment.due_date)
        .bind(repayment.is_paid)
        .fetch_one(&self.pool)
        .await?;

        Ok(repayment)
    }

    async fn list_scheduled_repayments(&self, loan_id: LoanId) -> StoreResult<Vec<ScheduledRepayment>> {
        let repayments = sqlx::query_as::<_, ScheduledRepayment>(&format!(
            "SELECT {REPAYMENT_COLUMNS} FROM scheduled_repayments WHERE loan_id = $1 ORDER BY due_date, id"
        ))
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(repayments)
    }
}
