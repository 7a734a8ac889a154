//! Catalog item (barang) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Item record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    /// Reference of the uploaded image, relative to the media root
    pub image: Option<String>,
    /// Units available for lending, never negative
    pub stock: i32,
}

/// Item with its category name, for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ItemShort {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    pub category_name: String,
    pub image: Option<String>,
    pub stock: i32,
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub category_id: i32,
    /// Defaults to 1
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
}

/// Set stock request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStock {
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
}
