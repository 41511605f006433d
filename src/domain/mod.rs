//! Domain module
//!
//! Records, identifiers and value types shared by every layer.

pub mod amount;
pub mod currency;
pub mod models;

pub use amount::{Amount, AmountError};
pub use currency::{Currency, UnsupportedCurrency};
pub use models::{
    AccessToken, AccessTokenId, DebitCard, DebitCardId, DebitCardTransaction,
    DebitCardTransactionId, Loan, LoanId, LoanStatus, NewDebitCard, NewDebitCardTransaction,
    NewLoan, NewScheduledRepayment, NewUser, ScheduledRepayment, ScheduledRepaymentId, User,
    UserId,
};
