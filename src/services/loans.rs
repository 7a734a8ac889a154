//! Loan lifecycle: borrowing, returning, fees and administrative overrides

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use validator::Validate;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{CreateLoan, Loan, LoanDetails, LoanQuery, LoanStatus, UpdateLoanFee},
        user::{Role, UserClaims},
    },
    repository::{
        loans::{LoanFilter, ReturnUpdate},
        Repository,
    },
    services::storage::{StorageService, UploadedFile, RETURN_PROOFS_FOLDER},
};

/// Late fee for a loan due on `due_date` and returned on `returned_date`.
///
/// Dates only: the clock time of the due moment plays no part. Returning on
/// or before the due date costs nothing.
pub fn compute_fee(due_date: NaiveDate, returned_date: NaiveDate, fee_per_day: i32) -> i32 {
    let days_late = (returned_date - due_date).num_days();
    if days_late <= 0 {
        return 0;
    }
    i32::try_from(days_late)
        .unwrap_or(i32::MAX)
        .saturating_mul(fee_per_day)
}

/// ILIKE pattern for a free-text search; blank input means no filter
fn search_pattern(q: Option<&str>) -> Option<String> {
    let q = q.map(str::trim).filter(|q| !q.is_empty())?;
    let escaped = q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

/// Due moment for a loan taken at `now`: today at `due_hour` local time, or
/// tomorrow at the same hour once that moment has been reached.
pub fn default_due_at(now: DateTime<FixedOffset>, due_hour: u32) -> AppResult<DateTime<FixedOffset>> {
    let offset = *now.offset();
    let cutoff = now
        .date_naive()
        .and_hms_opt(due_hour, 0, 0)
        .and_then(|t| t.and_local_timezone(offset).single())
        .ok_or_else(|| AppError::Internal(format!("Invalid due hour {}", due_hour)))?;

    if now >= cutoff {
        Ok(cutoff + Duration::days(1))
    } else {
        Ok(cutoff)
    }
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    storage: StorageService,
    policy: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, storage: StorageService, policy: LoansConfig) -> Self {
        Self {
            repository,
            storage,
            policy,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.policy.local_offset()).date_naive()
    }

    fn fee_for(&self, loan: &Loan, returned_date: NaiveDate) -> i32 {
        compute_fee(
            loan.due_date(&self.policy.local_offset()),
            returned_date,
            self.policy.fee_per_day,
        )
    }

    /// Borrow an item. Stock is taken in the same transaction that records
    /// the loan. Returns the loan and the stock left.
    pub async fn create_loan(
        &self,
        actor: &UserClaims,
        item_id: i32,
        data: CreateLoan,
    ) -> AppResult<(Loan, i32)> {
        data.validate()?;

        let now = Utc::now();
        let due_at = default_due_at(
            now.with_timezone(&self.policy.local_offset()),
            self.policy.due_hour,
        )?;

        let result = self
            .repository
            .loans
            .create_with_stock(actor.user_id, item_id, &data, now, due_at.with_timezone(&Utc))
            .await;

        match &result {
            Ok((loan, remaining)) => tracing::info!(
                loan_id = loan.id,
                item_id,
                user_id = actor.user_id,
                remaining,
                due_at = %due_at,
                "loan created"
            ),
            Err(AppError::OutOfStock(_)) => {
                tracing::warn!(item_id, user_id = actor.user_id, "borrow refused: out of stock")
            }
            Err(_) => {}
        }

        result
    }

    /// Return a borrowed item, with an optional photo as proof.
    ///
    /// Only the borrower may return a loan, and only once.
    pub async fn return_loan(
        &self,
        actor: &UserClaims,
        loan_id: i32,
        proof: Option<UploadedFile>,
    ) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        if loan.user_id != actor.user_id {
            return Err(AppError::NotFound(format!("Loan with id {} not found", loan_id)));
        }
        if loan.is_returned() {
            return Err(AppError::InvalidState(
                "Loan has already been returned".to_string(),
            ));
        }

        let returned_date = self.today();
        let fee = self.fee_for(&loan, returned_date);

        let proof_ref = match proof {
            Some(file) => Some(self.storage.save_image(RETURN_PROOFS_FOLDER, &file).await?),
            None => None,
        };

        let update = ReturnUpdate {
            returned_date,
            fee,
            proof: proof_ref.clone(),
            restore_stock: self.policy.restore_stock_on_return,
        };

        let outcome = self
            .repository
            .loans
            .mark_returned(loan_id, Some(actor.user_id), &update)
            .await;

        match outcome {
            Ok(Some(returned)) => {
                tracing::info!(loan_id, fee, %returned_date, "loan returned");
                Ok(returned)
            }
            other => {
                // nothing was written: lost a race with another return, or the update failed
                if let Some(reference) = &proof_ref {
                    if let Err(e) = self.storage.remove(reference).await {
                        tracing::warn!(loan_id, "could not remove unused proof: {}", e);
                    }
                }
                match other {
                    Err(e) => Err(e),
                    _ => Err(AppError::InvalidState(
                        "Loan has already been returned".to_string(),
                    )),
                }
            }
        }
    }

    /// Administrator status edit. Setting a borrowed loan to returned
    /// computes the fee the same way a normal return does; a returned loan
    /// cannot go back to borrowed.
    pub async fn admin_update_status(
        &self,
        actor: &UserClaims,
        loan_id: i32,
        status: LoanStatus,
    ) -> AppResult<Loan> {
        actor.require_admin()?;

        let loan = self.repository.loans.get_by_id(loan_id).await?;

        match (loan.status, status) {
            (LoanStatus::Borrowed, LoanStatus::Borrowed)
            | (LoanStatus::Returned, LoanStatus::Returned) => Ok(loan),
            (LoanStatus::Returned, LoanStatus::Borrowed) => Err(AppError::InvalidState(
                "A returned loan cannot be set back to borrowed".to_string(),
            )),
            (LoanStatus::Borrowed, LoanStatus::Returned) => {
                let (returned_date, fee) = match loan.returned_date {
                    Some(date) => (date, loan.fee),
                    None => {
                        let today = self.today();
                        (today, self.fee_for(&loan, today))
                    }
                };
                let update = ReturnUpdate {
                    returned_date,
                    fee,
                    proof: None,
                    restore_stock: self.policy.restore_stock_on_return,
                };
                let returned = self
                    .repository
                    .loans
                    .mark_returned(loan_id, None, &update)
                    .await?
                    .ok_or_else(|| {
                        AppError::InvalidState("Loan has already been returned".to_string())
                    })?;
                tracing::info!(loan_id, fee, admin_id = actor.user_id, "loan returned by administrator");
                Ok(returned)
            }
        }
    }

    /// Administrator fee override
    pub async fn admin_set_fee(&self, actor: &UserClaims, loan_id: i32, data: UpdateLoanFee) -> AppResult<Loan> {
        actor.require_admin()?;
        data.validate()?;
        let fee = data.fee;
        let loan = self.repository.loans.set_fee(loan_id, fee).await?;
        tracing::info!(loan_id, fee, admin_id = actor.user_id, "fee overridden");
        Ok(loan)
    }

    /// All loans of the caller, with verification state
    pub async fn my_loans(&self, actor: &UserClaims) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.list(LoanFilter::User(actor.user_id)).await
    }

    /// A single loan. Borrowers only see their own; staff and
    /// administrators see any.
    pub async fn get_loan(&self, actor: &UserClaims, loan_id: i32) -> AppResult<LoanDetails> {
        let details = self.repository.loans.get_details(loan_id).await?;
        let privileged = actor.has_role(Role::Petugas) || actor.has_role(Role::Admin);
        if details.loan.user_id != actor.user_id && !privileged {
            return Err(AppError::NotFound(format!("Loan with id {} not found", loan_id)));
        }
        Ok(details)
    }

    /// Loans the caller still has to return
    pub async fn my_active_loans(&self, actor: &UserClaims) -> AppResult<Vec<LoanDetails>> {
        self.repository
            .loans
            .list(LoanFilter::UserActive(actor.user_id))
            .await
    }

    /// Administrator view: verified loans only, optionally filtered by
    /// status, borrower or item name and local loan date range
    pub async fn admin_loans(&self, actor: &UserClaims, query: &LoanQuery) -> AppResult<Vec<LoanDetails>> {
        actor.require_admin()?;

        let offset = self.policy.local_offset();
        let start_of = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .and_then(|t| t.and_local_timezone(offset).single())
                .map(|t| t.with_timezone(&Utc))
                .ok_or_else(|| AppError::Validation(format!("Invalid date {}", date)))
        };
        let loaned_from = query.from.map(start_of).transpose()?;
        let loaned_before = query
            .to
            .and_then(|d| d.succ_opt())
            .map(start_of)
            .transpose()?;
        let pattern = search_pattern(query.q.as_deref());

        self.repository
            .loans
            .list_verified(query.status, pattern.as_deref(), loaned_from, loaned_before)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(Some(" budi ")).as_deref(), Some("%budi%"));
        assert_eq!(search_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
    }

    #[test]
    fn test_fee_three_days_late() {
        assert_eq!(compute_fee(date(2024, 1, 10), date(2024, 1, 13), 2000), 6000);
    }

    #[test]
    fn test_fee_on_time_or_early() {
        assert_eq!(compute_fee(date(2024, 1, 10), date(2024, 1, 10), 2000), 0);
        assert_eq!(compute_fee(date(2024, 1, 10), date(2024, 1, 2), 2000), 0);
    }

    #[test]
    fn test_fee_across_month_boundary() {
        assert_eq!(compute_fee(date(2024, 1, 31), date(2024, 2, 1), 2000), 2000);
        assert_eq!(compute_fee(date(2024, 2, 28), date(2024, 3, 1), 2000), 4000);
    }

    #[test]
    fn test_fee_saturates() {
        assert_eq!(compute_fee(date(1, 1, 1), date(9000, 1, 1), 2000), i32::MAX);
    }

    #[test]
    fn test_due_before_cutoff_is_today() {
        let now = wib().with_ymd_and_hms(2024, 1, 10, 15, 59, 0).unwrap();
        let due = default_due_at(now, 16).unwrap();
        assert_eq!(due, wib().with_ymd_and_hms(2024, 1, 10, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_due_at_cutoff_is_tomorrow() {
        let now = wib().with_ymd_and_hms(2024, 1, 10, 16, 0, 0).unwrap();
        let due = default_due_at(now, 16).unwrap();
        assert_eq!(due, wib().with_ymd_and_hms(2024, 1, 11, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_due_after_cutoff_is_tomorrow() {
        let now = wib().with_ymd_and_hms(2024, 1, 10, 16, 1, 0).unwrap();
        let due = default_due_at(now, 16).unwrap();
        assert_eq!(due, wib().with_ymd_and_hms(2024, 1, 11, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_due_rolls_over_month_end() {
        let now = wib().with_ymd_and_hms(2024, 1, 31, 20, 0, 0).unwrap();
        let due = default_due_at(now, 16).unwrap();
        assert_eq!(due, wib().with_ymd_and_hms(2024, 2, 1, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_due_uses_local_clock_not_utc() {
        // 08:30 UTC is 15:30 WIB: still before the cutoff
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 8, 30, 0).unwrap().with_timezone(&wib());
        let due = default_due_at(now, 16).unwrap();
        assert_eq!(due.date_naive(), date(2024, 1, 10));
        assert_eq!(due.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_due_hour() {
        let now = wib().with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();
        assert!(matches!(default_due_at(now, 24), Err(AppError::Internal(_))));
    }
}
