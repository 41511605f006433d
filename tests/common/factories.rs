//! Test data factories
//!
//! Each factory stores a plausible valid record with randomized details.

use chrono::{DateTime, Months, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use debit_card_api::domain::{
    Currency, DebitCard, DebitCardId, DebitCardTransaction, Loan, LoanId, LoanStatus,
    NewDebitCard, NewDebitCardTransaction, NewLoan, NewScheduledRepayment, NewUser,
    ScheduledRepayment, User, UserId,
};
use debit_card_api::store::RecordStore;

const CARD_TYPES: &[&str] = &["visa", "mastercard", "amex", "jcb"];

pub async fn create_user(store: &dyn RecordStore) -> User {
    let suffix = Uuid::new_v4().simple().to_string();
    store
        .create_user(NewUser {
            name: format!("User {}", &suffix[..8]),
            email: format!("{}@example.test", suffix),
        })
        .await
        .unwrap()
}

/// Card owned by `owner`; `disabled_at: None` makes it active
pub async fn create_debit_card(
    store: &dyn RecordStore,
    owner: UserId,
    disabled_at: Option<DateTime<Utc>>,
) -> DebitCard {
    let (card_type, number) = {
        let mut rng = rand::thread_rng();
        let card_type = CARD_TYPES.choose(&mut rng).copied().unwrap_or("visa");
        let number = rng.gen_range(1_000_000_000_000_000..=9_999_999_999_999_999_i64);
        (card_type, number)
    };

    store
        .create_debit_card(NewDebitCard {
            user_id: owner,
            card_type: card_type.to_string(),
            number,
            expiration_date: Utc::now() + chrono::Duration::days(365),
            disabled_at,
        })
        .await
        .unwrap()
}

pub async fn create_transaction(store: &dyn RecordStore, card: DebitCardId) -> DebitCardTransaction {
    let (amount, currency) = {
        let mut rng = rand::thread_rng();
        let cents = rng.gen_range(1..=1_000_000_i64);
        let currency = *Currency::ALL.choose(&mut rng).unwrap_or(&Currency::Usd);
        (Decimal::new(cents, 2), currency)
    };

    store
        .create_debit_card_transaction(NewDebitCardTransaction {
            debit_card_id: card,
            amount,
            currency_code: currency,
            description: Some("Factory transaction".to_string()),
        })
        .await
        .unwrap()
}

/// 3000 over 3 terms or 6000 over 6 terms, USD, approved
pub async fn create_loan(store: &dyn RecordStore, owner: UserId) -> Loan {
    let (amount, terms) = if rand::thread_rng().gen_bool(0.5) {
        (Decimal::new(300_000, 2), 3)
    } else {
        (Decimal::new(600_000, 2), 6)
    };

    store
        .create_loan(NewLoan {
            user_id: owner,
            amount,
            terms,
            outstanding_amount: amount,
            currency_code: Currency::Usd,
            status: LoanStatus::Approved,
            processed_at: Utc::now(),
        })
        .await
        .unwrap()
}

/// Unpaid repayment of 1000, 2000 or 3000 due next month
pub async fn create_scheduled_repayment(store: &dyn RecordStore, loan: LoanId) -> ScheduledRepayment {
    let amount = {
        let mut rng = rand::thread_rng();
        *[1000_i64, 2000, 3000].choose(&mut rng).unwrap_or(&1000)
    };
    let due_date = Utc::now()
        .date_naive()
        .checked_add_months(Months::new(1))
        .unwrap();

    store
        .create_scheduled_repayment(NewScheduledRepayment {
            loan_id: loan,
            amount: Decimal::new(amount * 100, 2),
            due_date,
            is_paid: false,
        })
        .await
        .unwrap()
}
