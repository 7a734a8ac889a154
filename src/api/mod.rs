//! API handlers for the Perpustakaan REST endpoints

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod staff;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::request::Parts,
    routing::{delete, get, post, put},
    Router,
};
use axum_extra::{
    extract::Multipart,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    models::user::UserClaims,
    services::storage::UploadedFile,
    AppState,
};

/// Extractor for the authenticated caller, taken from the bearer JWT.
/// Handlers pass the claims explicitly to every service call.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::Authentication("Missing or invalid authorization header".to_string())
                })?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Read the file sent in multipart field `name`, if any. Other fields are skipped.
pub(crate) async fn read_file_field(
    multipart: &mut Multipart,
    name: &str,
) -> AppResult<Option<UploadedFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(name) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(UploadedFile {
            file_name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.storage.max_upload_bytes + 64 * 1024;
    let media = ServeDir::new(state.services.storage.root());

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/register-staff", post(auth::register_staff))
        .route("/auth/login", post(auth::login))
        .route("/auth/login-staff", post(auth::login_staff))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/categories/:id", delete(catalog::delete_category))
        .route("/categories/:id/items", get(catalog::list_category_items))
        .route("/items", get(catalog::list_items).post(catalog::create_item))
        .route("/items/:id", get(catalog::get_item).delete(catalog::delete_item))
        .route("/items/:id/stock", put(catalog::update_stock))
        .route("/items/:id/image", put(catalog::upload_image))
        .route("/items/:id/reviews", get(catalog::list_reviews).post(catalog::create_review))
        // Loans
        .route("/items/:id/loans", post(loans::create_loan))
        .route("/loans/mine", get(loans::my_loans))
        .route("/loans/mine/active", get(loans::my_active_loans))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/return", post(loans::return_loan))
        // Staff (petugas)
        .route("/staff/loans/pending", get(staff::pending_loans))
        .route("/staff/loans/active", get(staff::active_loans))
        .route("/staff/loans/returned", get(staff::returned_loans))
        .route("/staff/loans/:id/verify", post(staff::verify_loan))
        .route("/staff/loans/:id/reject", post(staff::reject_loan))
        // Administration
        .route("/admin/loans", get(admin::list_loans))
        .route("/admin/loans/:id/status", put(admin::update_status))
        .route("/admin/loans/:id/fee", put(admin::update_fee))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .nest_service("/media", media)
        .merge(openapi)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
