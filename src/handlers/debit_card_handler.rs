//! Debit Card Handler
//!
//! List, create, show, update and delete a caller's debit cards. Every
//! operation runs the same ordered pipeline: resolve the path record,
//! validate the payload, authorize, execute, present.

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use rand::Rng;
use serde_json::Value;

use crate::api::resources::DebitCardResource;
use crate::domain::{DebitCard, DebitCardId, NewDebitCard};
use crate::error::{AppError, AppResult};
use crate::policy::{authorize, ensure_card_deletable, Action, Caller, Resource};
use crate::store::RecordStore;
use crate::validation::{CreateDebitCardRequest, UpdateDebitCardRequest};

/// Lifetime of a newly issued card
const CARD_VALIDITY_MONTHS: u32 = 12;

/// 16-digit card numbers
const CARD_NUMBER_RANGE: std::ops::RangeInclusive<i64> = 1_000_000_000_000_000..=9_999_999_999_999_999;

fn generate_card_number() -> i64 {
    rand::thread_rng().gen_range(CARD_NUMBER_RANGE)
}

fn expiration_from(now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    now.checked_add_months(Months::new(CARD_VALIDITY_MONTHS))
        .ok_or_else(|| AppError::Internal("card expiration date out of range".to_string()))
}

/// Handler for the debit card endpoints
pub struct DebitCardHandler {
    store: Arc<dyn RecordStore>,
}

impl DebitCardHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Live path record, or 404
    async fn resolve(&self, id: DebitCardId) -> AppResult<DebitCard> {
        self.store
            .find_debit_card(id)
            .await?
            .ok_or_else(|| AppError::not_found("debit_card", id))
    }

    /// `GET /debit-cards`
    pub async fn list(&self, caller: &Caller) -> AppResult<Vec<DebitCardResource>> {
        let cards = self.store.list_debit_cards(caller.user_id).await?;
        Ok(cards.iter().map(DebitCardResource::from).collect())
    }

    /// `POST /debit-cards`
    pub async fn create(&self, caller: &Caller, payload: &Value) -> AppResult<DebitCardResource> {
        let command = CreateDebitCardRequest::validate(payload)?;

        let card = self
            .store
            .create_debit_card(NewDebitCard {
                user_id: caller.user_id,
                card_type: command.card_type,
                number: generate_card_number(),
                expiration_date: expiration_from(Utc::now())?,
                disabled_at: None,
            })
            .await?;

        tracing::info!(
            user_id = %caller.user_id,
            debit_card_id = %card.id,
            card_type = %card.card_type,
            "Debit card created"
        );

        Ok(DebitCardResource::from(&card))
    }

    /// `GET /debit-cards/{id}`
    pub async fn show(&self, caller: &Caller, id: DebitCardId) -> AppResult<DebitCardResource> {
        let card = self.resolve(id).await?;
        authorize(caller, &Resource::DebitCard(&card), Action::View)?;

        Ok(DebitCardResource::from(&card))
    }

    /// `PUT /debit-cards/{id}`
    pub async fn update(
        &self,
        caller: &Caller,
        id: DebitCardId,
        payload: &Value,
    ) -> AppResult<DebitCardResource> {
        let card = self.resolve(id).await?;
        let command = UpdateDebitCardRequest::validate(payload)?;
        authorize(caller, &Resource::DebitCard(&card), Action::Update)?;

        let disabled_at = if command.is_active {
            None
        } else {
            Some(Utc::now())
        };
        let card = self.store.set_debit_card_disabled_at(id, disabled_at).await?;

        tracing::info!(
            user_id = %caller.user_id,
            debit_card_id = %card.id,
            is_active = card.is_active(),
            "Debit card updated"
        );

        Ok(DebitCardResource::from(&card))
    }

    /// `DELETE /debit-cards/{id}`
    ///
    /// Ownership is checked on the resolved record; the transaction guard
    /// runs again inside the store while the card row is locked.
    pub async fn delete(&self, caller: &Caller, id: DebitCardId) -> AppResult<()> {
        let card = self.resolve(id).await?;
        authorize(caller, &Resource::DebitCard(&card), Action::Delete)?;

        self.store
            .soft_delete_debit_card(id, &ensure_card_deletable)
            .await?;

        tracing::info!(user_id = %caller.user_id, debit_card_id = %id, "Debit card deleted");
        Ok(())
    }
}
