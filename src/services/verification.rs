//! Staff review of loans: verification, rejection and the staff queues

use crate::{
    config::LoansConfig,
    error::AppResult,
    models::{
        loan::{Loan, LoanDetails},
        user::UserClaims,
    },
    repository::{loans::LoanFilter, Repository},
};

#[derive(Clone)]
pub struct VerificationService {
    repository: Repository,
    policy: LoansConfig,
}

impl VerificationService {
    pub fn new(repository: Repository, policy: LoansConfig) -> Self {
        Self { repository, policy }
    }

    /// Mark a loan as checked by staff. Verifying twice changes nothing.
    pub async fn verify(&self, actor: &UserClaims, loan_id: i32) -> AppResult<Loan> {
        actor.require_staff()?;
        let loan = self.repository.loans.set_verified(loan_id).await?;
        tracing::info!(loan_id, staff_id = actor.user_id, "loan verified");
        Ok(loan)
    }

    /// Refuse a loan: the record is deleted outright
    pub async fn reject(&self, actor: &UserClaims, loan_id: i32) -> AppResult<Loan> {
        actor.require_staff()?;
        let loan = self
            .repository
            .loans
            .delete(loan_id, self.policy.restore_stock_on_reject)
            .await?;
        tracing::info!(
            loan_id,
            item_id = loan.item_id,
            staff_id = actor.user_id,
            stock_restored = self.policy.restore_stock_on_reject && !loan.is_returned(),
            "loan rejected"
        );
        Ok(loan)
    }

    /// Borrowed loans waiting for staff verification
    pub async fn pending(&self, actor: &UserClaims) -> AppResult<Vec<LoanDetails>> {
        actor.require_staff()?;
        self.repository.loans.list(LoanFilter::PendingVerification).await
    }

    /// Verified loans whose item is still out
    pub async fn active(&self, actor: &UserClaims) -> AppResult<Vec<LoanDetails>> {
        actor.require_staff()?;
        self.repository.loans.list(LoanFilter::VerifiedActive).await
    }

    /// Returned loans, most recent first
    pub async fn returned(&self, actor: &UserClaims) -> AppResult<Vec<LoanDetails>> {
        actor.require_staff()?;
        self.repository.loans.list(LoanFilter::Returned).await
    }
}
