//! In-memory Record Store
//!
//! Same contract as the PostgreSQL store, held in ordered maps behind a
//! single `RwLock`. Every write takes the write lock for its whole
//! check-then-act sequence, which gives the same atomicity the row locks
//! give in PostgreSQL.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{
    AccessToken, AccessTokenId, DebitCard, DebitCardId, DebitCardTransaction,
    DebitCardTransactionId, Loan, LoanId, NewDebitCard, NewDebitCardTransaction, NewLoan,
    NewScheduledRepayment, NewUser, ScheduledRepayment, ScheduledRepaymentId, User, UserId,
};

use super::{DeleteGuard, RecordStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    tokens: BTreeMap<AccessTokenId, AccessToken>,
    debit_cards: BTreeMap<DebitCardId, DebitCard>,
    transactions: BTreeMap<DebitCardTransactionId, DebitCardTransaction>,
    loans: BTreeMap<LoanId, Loan>,
    repayments: BTreeMap<ScheduledRepaymentId, ScheduledRepayment>,
}

/// Next id for a table: one past the largest key, starting at 1
fn next_id<K: Copy + Into<i64>, V>(table: &BTreeMap<K, V>) -> i64 {
    table.keys().next_back().map_or(1, |&id| id.into() + 1)
}

impl Tables {
    fn live_card(&self, id: DebitCardId) -> Option<&DebitCard> {
        self.debit_cards.get(&id).filter(|card| !card.is_deleted())
    }

    fn transaction_count(&self, id: DebitCardId) -> i64 {
        let count = self
            .transactions
            .values()
            .filter(|t| t.debit_card_id == id)
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

/// Record store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    // =========================================================================
    // Users and access tokens
    // =========================================================================

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let user = User {
            id: UserId(next_id(&tables.users)),
            name: user.name,
            email: user.email,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_access_token(
        &self,
        user_id: UserId,
        name: &str,
        token_hash: &str,
    ) -> StoreResult<AccessToken> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::not_found("user", user_id));
        }

        let token = AccessToken {
            id: AccessTokenId(next_id(&tables.tokens)),
            user_id,
            name: name.to_string(),
            token_hash: token_hash.to_string(),
            last_used_at: None,
            revoked_at: None,
            created_at: Utc::now(),
        };
        tables.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_access_token(&self, token_hash: &str) -> StoreResult<Option<AccessToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tokens
            .values()
            .find(|token| token.token_hash == token_hash)
            .cloned())
    }

    async fn touch_access_token(&self, id: AccessTokenId, used_at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(token) = self.tables.write().await.tokens.get_mut(&id) {
            token.last_used_at = Some(used_at);
        }
        Ok(())
    }

    async fn revoke_access_token(&self, id: AccessTokenId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let token = tables
            .tokens
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("personal_access_token", id))?;
        token.revoked_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    // =========================================================================
    // Debit cards
    // =========================================================================

    async fn list_debit_cards(&self, owner: UserId) -> StoreResult<Vec<DebitCard>> {
        let tables = self.tables.read().await;
        Ok(tables
            .debit_cards
            .values()
            .filter(|card| card.user_id == owner && !card.is_deleted())
            .cloned()
            .collect())
    }

    async fn create_debit_card(&self, card: NewDebitCard) -> StoreResult<DebitCard> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&card.user_id) {
            return Err(StoreError::not_found("user", card.user_id));
        }

        let now = Utc::now();
        let card = DebitCard {
            id: DebitCardId(next_id(&tables.debit_cards)),
            user_id: card.user_id,
            number: card.number,
            card_type: card.card_type,
            expiration_date: card.expiration_date,
            disabled_at: card.disabled_at,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.debit_cards.insert(card.id, card.clone());
        Ok(card)
    }

    async fn find_debit_card(&self, id: DebitCardId) -> StoreResult<Option<DebitCard>> {
        Ok(self.tables.read().await.live_card(id).cloned())
    }

    async fn find_debit_card_with_trashed(&self, id: DebitCardId) -> StoreResult<Option<DebitCard>> {
        Ok(self.tables.read().await.debit_cards.get(&id).cloned())
    }

    async fn set_debit_card_disabled_at(
        &self,
        id: DebitCardId,
        disabled_at: Option<DateTime<Utc>>,
    ) -> StoreResult<DebitCard> {
        let mut tables = self.tables.write().await;
        let card = tables
            .debit_cards
            .get_mut(&id)
            .filter(|card| !card.is_deleted())
            .ok_or_else(|| StoreError::not_found("debit_card", id))?;

        card.disabled_at = disabled_at;
        card.updated_at = Utc::now();
        Ok(card.clone())
    }

    async fn soft_delete_debit_card(&self, id: DebitCardId, guard: DeleteGuard<'_>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let card = tables
            .live_card(id)
            .ok_or_else(|| StoreError::not_found("debit_card", id))?;

        guard(card, tables.transaction_count(id))?;

        if let Some(card) = tables.debit_cards.get_mut(&id) {
            let now = Utc::now();
            card.deleted_at = Some(now);
            card.updated_at = now;
        }
        Ok(())
    }

    async fn count_debit_card_transactions(&self, id: DebitCardId) -> StoreResult<i64> {
        Ok(self.tables.read().await.transaction_count(id))
    }

    // =========================================================================
    // Debit card transactions
    // =========================================================================

    async fn list_debit_card_transactions(
        &self,
        owner: UserId,
        debit_card_id: Option<DebitCardId>,
    ) -> StoreResult<Vec<DebitCardTransaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .filter(|t| debit_card_id.map_or(true, |id| t.debit_card_id == id))
            .filter(|t| {
                tables
                    .live_card(t.debit_card_id)
                    .is_some_and(|card| card.user_id == owner)
            })
            .cloned()
            .collect())
    }

    async fn create_debit_card_transaction(
        &self,
        transaction: NewDebitCardTransaction,
    ) -> StoreResult<DebitCardTransaction> {
        let mut tables = self.tables.write().await;
        if tables.live_card(transaction.debit_card_id).is_none() {
            return Err(StoreError::not_found("debit_card", transaction.debit_card_id));
        }

        let now = Utc::now();
        let transaction = DebitCardTransaction {
            id: DebitCardTransactionId(next_id(&tables.transactions)),
            debit_card_id: transaction.debit_card_id,
            amount: transaction.amount,
            currency_code: transaction.currency_code,
            description: transaction.description,
            created_at: now,
            updated_at: now,
        };
        tables.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn find_debit_card_transaction(
        &self,
        id: DebitCardTransactionId,
    ) -> StoreResult<Option<DebitCardTransaction>> {
        Ok(self.tables.read().await.transactions.get(&id).cloned())
    }

    // =========================================================================
    // Loans and scheduled repayments
    // =========================================================================

    async fn create_loan(&self, loan: NewLoan) -> StoreResult<Loan> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&loan.user_id) {
            return Err(StoreError::not_found("user", loan.user_id));
        }

        let now = Utc::now();
        let loan = Loan {
            id: LoanId(next_id(&tables.loans)),
            user_id: loan.user_id,
            amount: loan.amount,
            terms: loan.terms,
            outstanding_amount: loan.outstanding_amount,
            currency_code: loan.currency_code,
            status: loan.status,
            processed_at: loan.processed_at,
            created_at: now,
            updated_at: now,
        };
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn list_loans(&self, owner: UserId) -> StoreResult<Vec<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables
            .loans
            .values()
            .filter(|loan| loan.user_id == owner)
            .cloned()
            .collect())
    }

    async fn find_loan(&self, id: LoanId) -> StoreResult<Option<Loan>> {
        Ok(self.tables.read().await.loans.get(&id).cloned())
    }

    async fn create_scheduled_repayment(
        &self,
        repayment: NewScheduledRepayment,
    ) -> StoreResult<ScheduledRepayment> {
        let mut tables = self.tables.write().await;
        if !tables.loans.contains_key(&repayment.loan_id) {
            return Err(StoreError::not_found("loan", repayment.loan_id));
        }

        let now = Utc::now();
        let repayment = ScheduledRepayment {
            id: ScheduledRepaymentId(next_id(&tables.repayments)),
            loan_id: repayment.loan_id,
            amount: repayment.amount,
            due_date: repayment.due_date,
            is_paid: repayment.is_paid,
            created_at: now,
            updated_at: now,
        };
        tables.repayments.insert(repayment.id, repayment.clone());
        Ok(repayment)
    }

    async fn list_scheduled_repayments(&self, loan_id: LoanId) -> StoreResult<Vec<ScheduledRepayment>> {
        let tables = self.tables.read().await;
        let mut repayments: Vec<ScheduledRepayment> = tables
            .repayments
            .values()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect();
        repayments.sort_by_key(|r| (r.due_date, r.id));
        Ok(repayments)
    }
}
