//! Administrator loan endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanDetails, LoanQuery, UpdateLoanFee, UpdateLoanStatus},
};

use super::AuthenticatedUser;

/// Verified loans, with optional status, text and loan date filters
#[utoipa::path(
    get,
    path = "/admin/loans",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Verified loans", body = Vec<LoanDetails>),
        (status = 403, description = "Administrator only")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.admin_loans(&claims, &query).await?;
    Ok(Json(loans))
}

/// Change the status of a loan
#[utoipa::path(
    put,
    path = "/admin/loans/{id}/status",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = UpdateLoanStatus,
    responses(
        (status = 200, description = "Loan updated", body = Loan),
        (status = 403, description = "Administrator only"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Returned loans cannot be reopened")
    )
)]
pub async fn update_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateLoanStatus>,
) -> AppResult<Json<Loan>> {
    let loan = state
        .services
        .loans
        .admin_update_status(&claims, id, request.status)
        .await?;
    Ok(Json(loan))
}

/// Override the fee of a loan
#[utoipa::path(
    put,
    path = "/admin/loans/{id}/fee",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = UpdateLoanFee,
    responses(
        (status = 200, description = "Fee updated", body = Loan),
        (status = 400, description = "Negative fee"),
        (status = 403, description = "Administrator only"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn update_fee(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateLoanFee>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.admin_set_fee(&claims, id, request).await?;
    Ok(Json(loan))
}
