//! Handler pipeline tests
//!
//! Run every handler against the in-memory record store, so no database
//! is needed.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Months, Utc};
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::domain::{
        Currency, DebitCardId, DebitCardTransactionId, LoanId, LoanStatus, NewDebitCard,
        NewDebitCardTransaction, NewLoan, NewScheduledRepayment, NewUser,
    };
    use crate::error::AppError;
    use crate::handlers::{DebitCardHandler, DebitCardTransactionHandler, LoanHandler};
    use crate::policy::{Caller, PolicyError};
    use crate::store::{InMemoryRecordStore, RecordStore};

    struct Fixture {
        store: Arc<InMemoryRecordStore>,
        alice: Caller,
        bob: Caller,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(InMemoryRecordStore::new());
            let alice = Self::caller(&store, "alice@example.com").await;
            let bob = Self::caller(&store, "bob@example.com").await;
            Self { store, alice, bob }
        }

        async fn caller(store: &InMemoryRecordStore, email: &str) -> Caller {
            let user = store
                .create_user(NewUser {
                    name: email.to_string(),
                    email: email.to_string(),
                })
                .await
                .unwrap();
            let token = store
                .create_access_token(user.id, "test", email)
                .await
                .unwrap();
            Caller::new(user.id, token.id)
        }

        fn dyn_store(&self) -> Arc<dyn RecordStore> {
            self.store.clone()
        }

        fn cards(&self) -> DebitCardHandler {
            DebitCardHandler::new(self.dyn_store())
        }

        fn transactions(&self) -> DebitCardTransactionHandler {
            DebitCardTransactionHandler::new(self.dyn_store())
        }

        fn loans(&self) -> LoanHandler {
            LoanHandler::new(self.dyn_store())
        }

        async fn card_of(&self, caller: &Caller) -> DebitCardId {
            self.store
                .create_debit_card(NewDebitCard {
                    user_id: caller.user_id,
                    card_type: "mastercard".to_string(),
                    number: 5_555_555_555_554_444,
                    expiration_date: Utc::now(),
                    disabled_at: None,
                })
                .await
                .unwrap()
                .id
        }

        async fn transaction_on(&self, card: DebitCardId) -> DebitCardTransactionId {
            self.store
                .create_debit_card_transaction(NewDebitCardTransaction {
                    debit_card_id: card,
                    amount: dec!(25.50),
                    currency_code: Currency::Vnd,
                    description: None,
                })
                .await
                .unwrap()
                .id
        }
    }

    fn assert_not_owner(err: AppError) {
        assert!(
            matches!(err, AppError::Forbidden(PolicyError::NotOwner { .. })),
            "expected ownership refusal, got {err:?}"
        );
    }

    // =========================================================================
    // Debit cards
    // =========================================================================

    #[tokio::test]
    async fn test_create_then_list_debit_card() {
        let f = Fixture::new().await;

        let created = f
            .cards()
            .create(&f.alice, &json!({ "type": "visa" }))
            .await
            .unwrap();
        assert_eq!(created.card_type, "visa");
        assert!(created.is_active);

        let listed = f.cards().list(&f.alice).await.unwrap();
        assert_eq!(listed, vec![created]);
        assert!(f.cards().list(&f.bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_debit_card_validates_before_touching_store() {
        let f = Fixture::new().await;

        let err = f.cards().create(&f.alice, &json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
        assert!(f.store.list_debit_cards(f.alice.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_card_is_forbidden_for_every_action() {
        let f = Fixture::new().await;
        let card = f.card_of(&f.bob).await;

        assert_not_owner(f.cards().show(&f.alice, card).await.unwrap_err());
        assert_not_owner(
            f.cards()
                .update(&f.alice, card, &json!({ "is_active": false }))
                .await
                .unwrap_err(),
        );
        assert_not_owner(f.cards().delete(&f.alice, card).await.unwrap_err());

        let untouched = f.store.find_debit_card(card).await.unwrap().unwrap();
        assert!(untouched.is_active());
    }

    #[tokio::test]
    async fn test_missing_card_is_not_found() {
        let f = Fixture::new().await;

        let err = f.cards().show(&f.alice, DebitCardId(404)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { resource: "debit_card", id: 404 }));
    }

    #[tokio::test]
    async fn test_update_validates_after_resolving_path() {
        let f = Fixture::new().await;
        let card = f.card_of(&f.alice).await;

        let err = f
            .cards()
            .update(&f.alice, DebitCardId(999), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        let err = f.cards().update(&f.alice, card, &json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_toggle_round_trip_restores_active_state() {
        let f = Fixture::new().await;
        let card = f.card_of(&f.alice).await;

        let off = f
            .cards()
            .update(&f.alice, card, &json!({ "is_active": false }))
            .await
            .unwrap();
        assert!(!off.is_active);
        assert!(f.store.find_debit_card(card).await.unwrap().unwrap().disabled_at.is_some());

        let on = f
            .cards()
            .update(&f.alice, card, &json!({ "is_active": true }))
            .await
            .unwrap();
        assert!(on.is_active);
        assert!(f.store.find_debit_card(card).await.unwrap().unwrap().disabled_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_card_without_transactions() {
        let f = Fixture::new().await;
        let card = f.card_of(&f.alice).await;

        f.cards().delete(&f.alice, card).await.unwrap();

        assert!(f.store.find_debit_card(card).await.unwrap().is_none());
        assert!(f
            .store
            .find_debit_card_with_trashed(card)
            .await
            .unwrap()
            .unwrap()
            .is_deleted());
        assert!(matches!(
            f.cards().show(&f.alice, card).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_card_with_transactions_is_refused_distinctly() {
        let f = Fixture::new().await;
        let card = f.card_of(&f.alice).await;
        f.transaction_on(card).await;

        let err = f.cards().delete(&f.alice, card).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Forbidden(PolicyError::CardHasTransactions { count: 1 })
        ));
        assert!(f.store.find_debit_card(card).await.unwrap().is_some());
    }

    // =========================================================================
    // Debit card transactions
    // =========================================================================

    #[tokio::test]
    async fn test_create_transaction_on_own_card() {
        let f = Fixture::new().await;
        let card = f.card_of(&f.alice).await;

        let created = f
            .transactions()
            .create(
                &f.alice,
                &json!({
                    "debit_card_id": card.get(),
                    "amount": 100,
                    "currency_code": "THB",
                    "description": "Test",
                }),
            )
            .await
            .unwrap();

        assert_eq!(created.debit_card_id, card);
        assert_eq!(created.amount, dec!(100.00));
        assert_eq!(created.currency_code, Currency::Thb);
        assert_eq!(created.description.as_deref(), Some("Test"));
    }

    #[tokio::test]
    async fn test_create_transaction_on_foreign_card_persists_nothing() {
        let f = Fixture::new().await;
        let card = f.card_of(&f.bob).await;

        let err = f
            .transactions()
            .create(
                &f.alice,
                &json!({ "debit_card_id": card.get(), "amount": "5.00", "currency_code": "USD" }),
            )
            .await
            .unwrap_err();

        assert_not_owner(err);
        assert_eq!(f.store.count_debit_card_transactions(card).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_transaction_on_missing_card_is_field_error() {
        let f = Fixture::new().await;

        let err = f
            .transactions()
            .create(
                &f.alice,
                &json!({ "debit_card_id": 77, "amount": "5.00", "currency_code": "USD" }),
            )
            .await
            .unwrap_err();

        match err {
            AppError::ValidationFailed(errors) => {
                assert_eq!(
                    errors.get("debit_card_id").unwrap()[0],
                    "The selected debit card id is invalid."
                );
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_transactions_is_scoped_to_caller() {
        let f = Fixture::new().await;
        let mine = f.card_of(&f.alice).await;
        let theirs = f.card_of(&f.bob).await;
        let own_tx = f.transaction_on(mine).await;
        f.transaction_on(theirs).await;

        let listed = f.transactions().list(&f.alice, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, own_tx);

        let filtered = f
            .transactions()
            .list(&f.alice, Some(mine.to_string().as_str()))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        assert_not_owner(
            f.transactions()
                .list(&f.alice, Some(theirs.to_string().as_str()))
                .await
                .unwrap_err(),
        );
    }

    #[tokio::test]
    async fn test_show_foreign_transaction_is_forbidden() {
        let f = Fixture::new().await;
        let card = f.card_of(&f.alice).await;
        let tx = f.transaction_on(card).await;

        assert!(f.transactions().show(&f.alice, tx).await.is_ok());
        assert_not_owner(f.transactions().show(&f.bob, tx).await.unwrap_err());
        assert!(matches!(
            f.transactions()
                .show(&f.alice, DebitCardTransactionId(9_999))
                .await
                .unwrap_err(),
            AppError::NotFound { .. }
        ));
    }

    // =========================================================================
    // Loans
    // =========================================================================

    #[tokio::test]
    async fn test_loan_detail_includes_schedule_in_due_order() {
        let f = Fixture::new().await;
        let now = Utc::now();
        let loan = f
            .store
            .create_loan(NewLoan {
                user_id: f.alice.user_id,
                amount: dec!(3000.00),
                terms: 3,
                outstanding_amount: dec!(3000.00),
                currency_code: Currency::Usd,
                status: LoanStatus::Approved,
                processed_at: now,
            })
            .await
            .unwrap();

        for months in [3, 1, 2] {
            f.store
                .create_scheduled_repayment(NewScheduledRepayment {
                    loan_id: loan.id,
                    amount: dec!(1000.00),
                    due_date: now
                        .date_naive()
                        .checked_add_months(Months::new(months))
                        .unwrap(),
                    is_paid: false,
                })
                .await
                .unwrap();
        }

        let detail = f.loans().show(&f.alice, loan.id).await.unwrap();
        let dates: Vec<_> = detail.scheduled_repayments.iter().map(|r| r.due_date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        assert_eq!(detail.scheduled_repayments.len(), 3);

        assert_eq!(f.loans().list(&f.alice).await.unwrap().len(), 1);
        assert!(f.loans().list(&f.bob).await.unwrap().is_empty());
        assert_not_owner(f.loans().show(&f.bob, loan.id).await.unwrap_err());
        assert!(matches!(
            f.loans().show(&f.alice, LoanId(42)).await.unwrap_err(),
            AppError::NotFound { resource: "loan", .. }
        ));
    }
}
