//! Catalog endpoints: categories, items, stock, images and reviews

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{Category, CreateCategory},
        item::{CreateItem, Item, ItemShort, UpdateStock},
        review::{CreateReview, Review},
    },
};

use super::{read_file_field, AuthenticatedUser};

/// Items of a single category
#[derive(Serialize, ToSchema)]
pub struct CategoryItems {
    pub category: Category,
    pub items: Vec<ItemShort>,
}

/// List categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 403, description = "Administrator only")
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.services.catalog.create_category(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Delete a category and all of its items
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Administrator only"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_category(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the items of a category
#[utoipa::path(
    get,
    path = "/categories/{id}/items",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category with its items", body = CategoryItems),
        (status = 404, description = "Category not found")
    )
)]
pub async fn list_category_items(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<CategoryItems>> {
    let (category, items) = state.services.catalog.list_items_by_category(id).await?;
    Ok(Json(CategoryItems { category, items }))
}

/// List all items
#[utoipa::path(
    get,
    path = "/items",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All items with category names", body = Vec<ItemShort>)
    )
)]
pub async fn list_items(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ItemShort>>> {
    let items = state.services.catalog.list_items().await?;
    Ok(Json(items))
}

/// Get item details
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(item))
}

/// Create an item
#[utoipa::path(
    post,
    path = "/items",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator only"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let item = state.services.catalog.create_item(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Set the stock of an item
#[utoipa::path(
    put,
    path = "/items/{id}/stock",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateStock,
    responses(
        (status = 200, description = "Stock updated", body = Item),
        (status = 400, description = "Negative stock"),
        (status = 403, description = "Administrator only"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStock>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.set_stock(&claims, id, request.stock).await?;
    Ok(Json(item))
}

/// Upload the picture of an item (multipart field `image`)
#[utoipa::path(
    put,
    path = "/items/{id}/image",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Field `image`: jpg, png, gif or webp"),
    responses(
        (status = 200, description = "Image stored", body = Item),
        (status = 400, description = "Missing or invalid image"),
        (status = 403, description = "Administrator only"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn upload_image(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> AppResult<Json<Item>> {
    let file = read_file_field(&mut multipart, "image")
        .await?
        .ok_or_else(|| AppError::BadRequest("Missing 'image' field".to_string()))?;
    let item = state.services.catalog.set_image(&claims, id, file).await?;
    Ok(Json(item))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Administrator only"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_item(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List reviews of an item, newest first
#[utoipa::path(
    get,
    path = "/items/{id}/reviews",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Reviews", body = Vec<Review>),
        (status = 404, description = "Item not found")
    )
)]
pub async fn list_reviews(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = state.services.catalog.list_reviews(id).await?;
    Ok(Json(reviews))
}

/// Review an item
#[utoipa::path(
    post,
    path = "/items/{id}/reviews",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Item ID")),
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review posted", body = Review),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn create_review(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CreateReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = state.services.catalog.create_review(&claims, id, request).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
