//! Loan Handler
//!
//! Read-only view of a caller's loans and their repayment schedules.

use std::sync::Arc;

use crate::api::resources::{LoanDetailResource, LoanResource};
use crate::domain::LoanId;
use crate::error::{AppError, AppResult};
use crate::policy::{authorize, Action, Caller, Resource};
use crate::store::RecordStore;

/// Handler for the loan endpoints
pub struct LoanHandler {
    store: Arc<dyn RecordStore>,
}

impl LoanHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// `GET /loans`
    pub async fn list(&self, caller: &Caller) -> AppResult<Vec<LoanResource>> {
        let loans = self.store.list_loans(caller.user_id).await?;
        Ok(loans.iter().map(LoanResource::from).collect())
    }

    /// `GET /loans/{id}`
    pub async fn show(&self, caller: &Caller, id: LoanId) -> AppResult<LoanDetailResource> {
        let loan = self
            .store
            .find_loan(id)
            .await?
            .ok_or_else(|| AppError::not_found("loan", id))?;
        authorize(caller, &Resource::Loan(&loan), Action::View)?;

        let repayments = self.store.list_scheduled_repayments(id).await?;
        for repayment in &repayments {
            authorize(
                caller,
                &Resource::ScheduledRepayment {
                    repayment,
                    loan: &loan,
                },
                Action::View,
            )?;
        }

        Ok(LoanDetailResource::new(&loan, &repayments))
    }
}
