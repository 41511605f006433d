//! Ownership Policy
//!
//! Every record belongs to exactly one user, reached by walking its
//! ownership chain:
//!
//! - DebitCard → User
//! - DebitCardTransaction → DebitCard → User
//! - Loan → User
//! - ScheduledRepayment → Loan → User
//!
//! A caller may view, update or delete a record iff that root user is the
//! caller. There are no roles and no administrative override.
//!
//! Deleting a debit card is additionally guarded by a data-integrity rule
//! (no transactions may reference it). That guard is a separate check so
//! callers and tests can tell the two refusals apart, even though both
//! surface to clients as the same forbidden response.

use crate::domain::{
    AccessTokenId, DebitCard, DebitCardTransaction, Loan, ScheduledRepayment, UserId,
};

/// The authenticated identity a request acts on behalf of.
///
/// Produced by the bearer-token gate and handed explicitly to every
/// handler; nothing reads it from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub token_id: AccessTokenId,
}

impl Caller {
    pub fn new(user_id: UserId, token_id: AccessTokenId) -> Self {
        Self { user_id, token_id }
    }
}

/// What the caller wants to do with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// A record paired with whatever parents are needed to reach its owner.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    DebitCard(&'a DebitCard),
    DebitCardTransaction {
        transaction: &'a DebitCardTransaction,
        card: &'a DebitCard,
    },
    Loan(&'a Loan),
    ScheduledRepayment {
        repayment: &'a ScheduledRepayment,
        loan: &'a Loan,
    },
}

impl Resource<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::DebitCard(_) => "debit_card",
            Resource::DebitCardTransaction { .. } => "debit_card_transaction",
            Resource::Loan(_) => "loan",
            Resource::ScheduledRepayment { .. } => "scheduled_repayment",
        }
    }

    /// Root user of the ownership chain.
    ///
    /// Returns `None` when a child was paired with a parent it does not
    /// reference; a broken chain has no owner and grants nothing.
    pub fn owner(&self) -> Option<UserId> {
        match *self {
            Resource::DebitCard(card) => Some(card.user_id),
            Resource::DebitCardTransaction { transaction, card } => {
                if transaction.debit_card_id != card.id {
                    return None;
                }
                Resource::DebitCard(card).owner()
            }
            Resource::Loan(loan) => Some(loan.user_id),
            Resource::ScheduledRepayment { repayment, loan } => {
                if repayment.loan_id != loan.id {
                    return None;
                }
                Resource::Loan(loan).owner()
            }
        }
    }
}

/// Reasons the policy refuses a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("caller does not own this {resource} and may not {action} it")]
    NotOwner {
        resource: &'static str,
        action: &'static str,
    },

    #[error("debit card has {count} transaction(s) and cannot be deleted")]
    CardHasTransactions { count: i64 },
}

/// Pure ownership predicate.
pub fn can_access(caller: &Caller, resource: &Resource<'_>, action: Action) -> bool {
    match action {
        Action::View | Action::Update | Action::Delete => {
            resource.owner() == Some(caller.user_id)
        }
    }
}

/// [`can_access`] as a `Result`, for use with `?` in request pipelines.
pub fn authorize(caller: &Caller, resource: &Resource<'_>, action: Action) -> Result<(), PolicyError> {
    if can_access(caller, resource, action) {
        return Ok(());
    }

    tracing::debug!(
        user_id = %caller.user_id,
        resource = resource.kind(),
        action = action.as_str(),
        "Ownership check failed"
    );

    Err(PolicyError::NotOwner {
        resource: resource.kind(),
        action: action.as_str(),
    })
}

/// Data-integrity guard for card deletion, evaluated after ownership.
///
/// `transaction_count` must be read under the same lock that performs the
/// delete, otherwise a concurrent insert can slip in between.
pub fn ensure_card_deletable(card: &DebitCard, transaction_count: i64) -> Result<(), PolicyError> {
    if transaction_count > 0 {
        tracing::debug!(
            debit_card_id = %card.id,
            transaction_count,
            "Refusing to delete debit card with transactions"
        );
        return Err(PolicyError::CardHasTransactions {
            count: transaction_count,
        });
    }

    Ok(())
}
