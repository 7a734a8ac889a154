//! Loans repository for database operations

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use super::items::ItemsRepository;
use crate::{
    error::{AppError, AppResult},
    models::loan::{fee_note, CreateLoan, Loan, LoanDetails, LoanStatus},
};

const DETAILS_SELECT: &str = r#"
    SELECT l.*, u.username, i.name AS item_name
    FROM loans l
    JOIN users u ON u.id = l.user_id
    JOIN items i ON i.id = l.item_id
"#;

/// Which slice of the loans table a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanFilter {
    /// Every loan of one borrower
    User(i32),
    /// Borrowed loans of one borrower
    UserActive(i32),
    /// Borrowed and not yet verified: the staff queue
    PendingVerification,
    /// Verified and still borrowed
    VerifiedActive,
    /// Loans with a returned date
    Returned,
}

impl LoanFilter {
    fn clause(&self) -> &'static str {
        match self {
            LoanFilter::User(_) => "WHERE l.user_id = $1 ORDER BY l.loan_date DESC",
            LoanFilter::UserActive(_) => {
                "WHERE l.user_id = $1 AND l.status = 'dipinjam' ORDER BY l.due_at"
            }
            LoanFilter::PendingVerification => {
                "WHERE l.status = 'dipinjam' AND l.staff_verified = FALSE ORDER BY l.loan_date"
            }
            LoanFilter::VerifiedActive => {
                "WHERE l.status = 'dipinjam' AND l.staff_verified = TRUE ORDER BY l.due_at"
            }
            LoanFilter::Returned => {
                "WHERE l.returned_date IS NOT NULL ORDER BY l.returned_date DESC, l.id DESC"
            }
        }
    }

    fn user_id(&self) -> Option<i32> {
        match self {
            LoanFilter::User(id) | LoanFilter::UserActive(id) => Some(*id),
            _ => None,
        }
    }
}

/// Values written when a loan leaves the Borrowed state
#[derive(Debug, Clone)]
pub struct ReturnUpdate {
    pub returned_date: NaiveDate,
    pub fee: i32,
    pub proof: Option<String>,
    pub restore_stock: bool,
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    pub async fn get_details(&self, id: i32) -> AppResult<LoanDetails> {
        let query = format!("{} WHERE l.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, LoanDetails>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(with_fee_note)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    pub async fn list(&self, filter: LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let query = format!("{} {}", DETAILS_SELECT, filter.clause());
        let mut builder = sqlx::query_as::<_, LoanDetails>(&query);
        if let Some(user_id) = filter.user_id() {
            builder = builder.bind(user_id);
        }
        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(with_fee_note).collect())
    }

    /// Administrator queue: verified loans, narrowed by the optional
    /// filters. `pattern` is an ILIKE pattern; the date bounds are half-open.
    pub async fn list_verified(
        &self,
        status: Option<LoanStatus>,
        pattern: Option<&str>,
        loaned_from: Option<DateTime<Utc>>,
        loaned_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<LoanDetails>> {
        let query = format!(
            r#"{}
            WHERE l.staff_verified = TRUE
              AND ($1::VARCHAR IS NULL OR l.status = $1)
              AND ($2::TEXT IS NULL OR u.username ILIKE $2 OR i.name ILIKE $2)
              AND ($3::TIMESTAMPTZ IS NULL OR l.loan_date >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR l.loan_date < $4)
            ORDER BY l.loan_date DESC
            "#,
            DETAILS_SELECT
        );
        let rows = sqlx::query_as::<_, LoanDetails>(&query)
            .bind(status.map(|s| s.as_str()))
            .bind(pattern)
            .bind(loaned_from)
            .bind(loaned_before)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(with_fee_note).collect())
    }

    /// Take one unit of stock and record the loan in a single transaction.
    ///
    /// Either both happen or neither does: an out-of-stock or missing item
    /// rolls the transaction back before any loan row exists.
    pub async fn create_with_stock(
        &self,
        user_id: i32,
        item_id: i32,
        data: &CreateLoan,
        loan_date: DateTime<Utc>,
        due_at: DateTime<Utc>,
    ) -> AppResult<(Loan, i32)> {
        let mut tx = self.pool.begin().await?;

        let remaining = ItemsRepository::decrement_stock(&mut tx, item_id).await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                user_id, item_id, contact_number, class_name, department,
                signature, loan_date, due_at, status, fee, staff_verified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'dipinjam', 0, FALSE)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(&data.contact_number)
        .bind(&data.class_name)
        .bind(&data.department)
        .bind(&data.signature)
        .bind(loan_date)
        .bind(due_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((loan, remaining))
    }

    /// Move a loan from Borrowed to Returned.
    ///
    /// The update only matches rows still in `dipinjam`, so of two racing
    /// returns only one writes. `None` means nothing matched. When
    /// `borrower` is given the loan must also belong to that user.
    pub async fn mark_returned(
        &self,
        loan_id: i32,
        borrower: Option<i32>,
        update: &ReturnUpdate,
    ) -> AppResult<Option<Loan>> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET status = 'dikembalikan',
                returned_date = $1,
                fee = $2,
                return_proof = COALESCE($3, return_proof)
            WHERE id = $4
              AND status = 'dipinjam'
              AND ($5::INTEGER IS NULL OR user_id = $5)
            RETURNING *
            "#,
        )
        .bind(update.returned_date)
        .bind(update.fee)
        .bind(&update.proof)
        .bind(loan_id)
        .bind(borrower)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(loan) = loan else {
            tx.rollback().await?;
            return Ok(None);
        };

        if update.restore_stock {
            ItemsRepository::increment_stock(&mut tx, loan.item_id).await?;
        }

        tx.commit().await?;
        Ok(Some(loan))
    }

    /// Set the staff-verified flag. Setting it twice is harmless.
    pub async fn set_verified(&self, loan_id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            "UPDATE loans SET staff_verified = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Delete a loan, optionally giving a still-borrowed unit back to stock
    pub async fn delete(&self, loan_id: i32, restore_stock: bool) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("DELETE FROM loans WHERE id = $1 RETURNING *")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if restore_stock && !loan.is_returned() {
            ItemsRepository::increment_stock(&mut tx, loan.item_id).await?;
        }

        tx.commit().await?;
        Ok(loan)
    }

    /// Administrative fee override
    pub async fn set_fee(&self, loan_id: i32, fee: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("UPDATE loans SET fee = $1 WHERE id = $2 RETURNING *")
            .bind(fee)
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }
}

fn with_fee_note(mut details: LoanDetails) -> LoanDetails {
    details.fee_note = fee_note(details.loan.fee);
    details
}
