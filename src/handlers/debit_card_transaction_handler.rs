//! Debit Card Transaction Handler
//!
//! Transactions are reached through their parent card. A caller only ever
//! sees transactions on cards they own, with or without an explicit
//! `debit_card_id` filter.

use std::sync::Arc;

use serde_json::Value;

use crate::api::resources::DebitCardTransactionResource;
use crate::domain::{DebitCard, DebitCardId, DebitCardTransactionId, NewDebitCardTransaction};
use crate::error::{AppError, AppResult};
use crate::policy::{authorize, Action, Caller, Resource};
use crate::store::{RecordStore, StoreError};
use crate::validation::{
    CreateDebitCardTransactionRequest, DebitCardTransactionIndexRequest, ValidationErrors,
};

/// Handler for the debit card transaction endpoints
pub struct DebitCardTransactionHandler {
    store: Arc<dyn RecordStore>,
}

impl DebitCardTransactionHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Card named in a body or query. Absence is a field error, not a 404.
    async fn referenced_card(&self, id: DebitCardId) -> AppResult<DebitCard> {
        self.store
            .find_debit_card(id)
            .await?
            .ok_or_else(|| ValidationErrors::invalid_selection("debit_card_id").into())
    }

    /// `GET /debit-card-transactions[?debit_card_id=]`
    pub async fn list(
        &self,
        caller: &Caller,
        debit_card_id: Option<&str>,
    ) -> AppResult<Vec<DebitCardTransactionResource>> {
        let filter = DebitCardTransactionIndexRequest::validate(debit_card_id)?;

        if let Some(card_id) = filter.debit_card_id {
            let card = self.referenced_card(card_id).await?;
            authorize(caller, &Resource::DebitCard(&card), Action::View)?;
        }

        let transactions = self
            .store
            .list_debit_card_transactions(caller.user_id, filter.debit_card_id)
            .await?;

        Ok(transactions
            .iter()
            .map(DebitCardTransactionResource::from)
            .collect())
    }

    /// `POST /debit-card-transactions`
    pub async fn create(
        &self,
        caller: &Caller,
        payload: &Value,
    ) -> AppResult<DebitCardTransactionResource> {
        let command = CreateDebitCardTransactionRequest::validate(payload)?;
        let card = self.referenced_card(command.debit_card_id).await?;
        authorize(caller, &Resource::DebitCard(&card), Action::Update)?;

        let transaction = self
            .store
            .create_debit_card_transaction(NewDebitCardTransaction {
                debit_card_id: card.id,
                amount: command.amount.value(),
                currency_code: command.currency_code,
                description: command.description,
            })
            .await
            .map_err(|err| match err {
                // Card deleted between the lookup and the insert
                StoreError::NotFound { .. } => {
                    AppError::from(ValidationErrors::invalid_selection("debit_card_id"))
                }
                other => AppError::from(other),
            })?;

        tracing::info!(
            user_id = %caller.user_id,
            debit_card_id = %card.id,
            debit_card_transaction_id = %transaction.id,
            amount = %transaction.amount,
            currency_code = %transaction.currency_code,
            "Debit card transaction created"
        );

        Ok(DebitCardTransactionResource::from(&transaction))
    }

    /// `GET /debit-card-transactions/{id}`
    pub async fn show(
        &self,
        caller: &Caller,
        id: DebitCardTransactionId,
    ) -> AppResult<DebitCardTransactionResource> {
        let transaction = self
            .store
            .find_debit_card_transaction(id)
            .await?
            .ok_or_else(|| AppError::not_found("debit_card_transaction", id))?;

        // A card with transactions cannot be deleted, but a trashed parent
        // still has an owner.
        let card = self
            .store
            .find_debit_card_with_trashed(transaction.debit_card_id)
            .await?
            .ok_or_else(|| AppError::not_found("debit_card_transaction", id))?;

        authorize(
            caller,
            &Resource::DebitCardTransaction {
                transaction: &transaction,
                card: &card,
            },
            Action::View,
        )?;

        Ok(DebitCardTransactionResource::from(&transaction))
    }
}
