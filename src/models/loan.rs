//! Loan (peminjaman) model and related types

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Loan status. The persisted strings are part of the storage contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LoanStatus {
    #[serde(rename = "dipinjam")]
    Borrowed,
    #[serde(rename = "dikembalikan")]
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "dipinjam",
            LoanStatus::Returned => "dikembalikan",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dipinjam" => Ok(LoanStatus::Borrowed),
            "dikembalikan" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus (stored as VARCHAR)
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub item_id: i32,
    /// WhatsApp / phone number of the borrower
    pub contact_number: String,
    pub class_name: String,
    pub department: String,
    /// Borrower signature, opaque (usually a base64 data URL)
    #[serde(skip_serializing)]
    pub signature: String,
    pub loan_date: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_date: Option<NaiveDate>,
    pub status: LoanStatus,
    /// Late fee in currency minor units
    pub fee: i32,
    pub staff_verified: bool,
    /// Reference of the uploaded proof-of-return image
    pub return_proof: Option<String>,
}

impl Loan {
    /// Calendar date (institution-local) on which the loan falls due
    pub fn due_date(&self, offset: &FixedOffset) -> NaiveDate {
        self.due_at.with_timezone(offset).date_naive()
    }

    pub fn is_returned(&self) -> bool {
        self.status == LoanStatus::Returned
    }
}

/// Loan joined with borrower and item names, for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub loan: Loan,
    pub username: String,
    pub item_name: String,
    /// Human readable fee remark
    #[sqlx(default)]
    pub fee_note: String,
}

/// Remark shown next to a fee in listings
pub fn fee_note(fee: i32) -> String {
    if fee > 0 {
        format!("Telat – Denda Rp {}", fee)
    } else {
        "Tidak kena denda".to_string()
    }
}

/// Borrow form submitted by a user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    #[validate(length(min = 1, max = 15, message = "Contact number must be 1-15 characters"))]
    pub contact_number: String,
    #[validate(length(min = 1, max = 20, message = "Class must be 1-20 characters"))]
    pub class_name: String,
    #[validate(length(min = 1, max = 50, message = "Department must be 1-50 characters"))]
    pub department: String,
    #[validate(length(min = 1, message = "Signature is required"))]
    pub signature: String,
}

/// Administrator status edit
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateLoanStatus {
    pub status: LoanStatus,
}

/// Administrator fee override
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateLoanFee {
    #[validate(range(min = 0, message = "Fee cannot be negative"))]
    pub fee: i32,
}

/// Administrator listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// Only loans in this status
    pub status: Option<LoanStatus>,
    /// Case-insensitive match on borrower username or item name
    pub q: Option<String>,
    /// First local loan date included (YYYY-MM-DD)
    pub from: Option<NaiveDate>,
    /// Last local loan date included (YYYY-MM-DD)
    pub to: Option<NaiveDate>,
}
