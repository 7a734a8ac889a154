//! Borrower loan endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{fee_note, CreateLoan, Loan, LoanDetails},
};

use super::{read_file_field, AuthenticatedUser};

/// Loan created by a borrow request
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    pub loan: Loan,
    /// Units of the item left after this loan
    pub remaining_stock: i32,
    /// Status message
    pub message: String,
}

/// Result of a return
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub loan: Loan,
    /// Human readable fee remark
    pub fee_note: String,
}

/// Borrow an item
#[utoipa::path(
    post,
    path = "/items/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Invalid borrow form"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item out of stock")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(item_id): Path<i32>,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let (loan, remaining_stock) = state.services.loans.create_loan(&claims, item_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            loan,
            remaining_stock,
            message: "Item borrowed successfully".to_string(),
        }),
    ))
}

/// Loans of the current user
#[utoipa::path(
    get,
    path = "/loans/mine",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All loans of the caller", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.my_loans(&claims).await?;
    Ok(Json(loans))
}

/// Loans the current user still has to return
#[utoipa::path(
    get,
    path = "/loans/mine/active",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrowed loans of the caller", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_active_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.my_active_loans(&claims).await?;
    Ok(Json(loans))
}

/// Get a loan with borrower and item names
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(&claims, loan_id).await?;
    Ok(Json(loan))
}

/// Return a borrowed item, optionally with a photo in multipart field `proof`
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Optional field `proof`"),
    responses(
        (status = 200, description = "Item returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
    multipart: Option<Multipart>,
) -> AppResult<Json<ReturnResponse>> {
    let proof = match multipart {
        Some(mut multipart) => read_file_field(&mut multipart, "proof").await?,
        None => None,
    };

    let loan = state.services.loans.return_loan(&claims, loan_id, proof).await?;

    Ok(Json(ReturnResponse {
        fee_note: fee_note(loan.fee),
        loan,
    }))
}
