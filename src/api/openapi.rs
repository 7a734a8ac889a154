//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, catalog, health, loans, staff};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Perpustakaan API",
        version = "1.0.0",
        description = "School lending tracker REST API: catalog, loans, verification and late fees"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::register_staff,
        auth::login,
        auth::login_staff,
        auth::me,
        // Catalog
        catalog::list_categories,
        catalog::create_category,
        catalog::delete_category,
        catalog::list_category_items,
        catalog::list_items,
        catalog::get_item,
        catalog::create_item,
        catalog::update_stock,
        catalog::upload_image,
        catalog::delete_item,
        catalog::list_reviews,
        catalog::create_review,
        // Loans
        loans::create_loan,
        loans::my_loans,
        loans::my_active_loans,
        loans::get_loan,
        loans::return_loan,
        // Staff
        staff::pending_loans,
        staff::active_loans,
        staff::returned_loans,
        staff::verify_loan,
        staff::reject_loan,
        // Admin
        admin::list_loans,
        admin::update_status,
        admin::update_fee,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            crate::models::user::User,
            crate::models::user::RegisterUser,
            crate::models::user::RegisterStaff,
            // Catalog
            catalog::CategoryItems,
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            crate::models::item::Item,
            crate::models::item::ItemShort,
            crate::models::item::CreateItem,
            crate::models::item::UpdateStock,
            crate::models::review::Review,
            crate::models::review::CreateReview,
            // Loans
            loans::LoanResponse,
            loans::ReturnResponse,
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStatus,
            crate::models::loan::CreateLoan,
            crate::models::loan::UpdateLoanStatus,
            crate::models::loan::UpdateLoanFee,
            crate::models::loan::LoanQuery,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and authentication"),
        (name = "catalog", description = "Categories, items, stock and reviews"),
        (name = "loans", description = "Borrowing and returning"),
        (name = "staff", description = "Loan verification by staff"),
        (name = "admin", description = "Administrator loan overrides")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
