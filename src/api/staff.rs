//! Staff (petugas) loan verification endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanDetails},
};

use super::AuthenticatedUser;

/// Loans waiting for verification
#[utoipa::path(
    get,
    path = "/staff/loans/pending",
    tag = "staff",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unverified loans", body = Vec<LoanDetails>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn pending_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.verification.pending(&claims).await?;
    Ok(Json(loans))
}

/// Verified loans not yet returned
#[utoipa::path(
    get,
    path = "/staff/loans/active",
    tag = "staff",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Verified borrowed loans", body = Vec<LoanDetails>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn active_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.verification.active(&claims).await?;
    Ok(Json(loans))
}

/// Returned loans with their fees
#[utoipa::path(
    get,
    path = "/staff/loans/returned",
    tag = "staff",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Returned loans", body = Vec<LoanDetails>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn returned_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.verification.returned(&claims).await?;
    Ok(Json(loans))
}

/// Verify a loan
#[utoipa::path(
    post,
    path = "/staff/loans/{id}/verify",
    tag = "staff",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan verified", body = Loan),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn verify_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.verification.verify(&claims, id).await?;
    Ok(Json(loan))
}

/// Reject a loan; the loan record is deleted
#[utoipa::path(
    post,
    path = "/staff/loans/{id}/reject",
    tag = "staff",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan rejected, deleted record returned", body = Loan),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn reject_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.verification.reject(&claims, id).await?;
    Ok(Json(loan))
}
