//! Registration and login endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{RegisterStaff, RegisterUser, User, UserClaims},
};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response with JWT token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    pub user_id: i32,
    pub username: String,
    /// Group memberships (e.g. "petugas", "admin")
    pub groups: Vec<String>,
}

impl LoginResponse {
    fn new(token: String, claims: UserClaims) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            user_id: claims.user_id,
            username: claims.sub,
            groups: claims.groups,
        }
    }
}

/// Current user information
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub groups: Vec<String>,
}

/// Register a borrower account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input or username taken")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Register a staff (petugas) account
#[utoipa::path(
    post,
    path = "/auth/register-staff",
    tag = "auth",
    request_body = RegisterStaff,
    responses(
        (status = 201, description = "Staff account created", body = User),
        (status = 400, description = "Invalid input, passwords differ or username taken")
    )
)]
pub async fn register_staff(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterStaff>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.services.users.register_staff(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, claims) = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    Ok(Json(LoginResponse::new(token, claims)))
}

/// Staff login, refused for accounts outside the petugas group
#[utoipa::path(
    post,
    path = "/auth/login-staff",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or not a staff member")
    )
)]
pub async fn login_staff(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, claims) = state
        .services
        .users
        .authenticate_staff(&request.username, &request.password)
        .await?;
    Ok(Json(LoginResponse::new(token, claims)))
}

/// Get current user information
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user info", body = UserInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserInfo>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    Ok(Json(UserInfo {
        id: user.id,
        username: user.username,
        groups: claims.groups,
    }))
}
