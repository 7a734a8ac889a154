//! Catalog management service: categories, items, stock and reviews

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{Category, CreateCategory},
        item::{CreateItem, Item, ItemShort},
        review::{CreateReview, Review},
        user::UserClaims,
    },
    repository::Repository,
    services::storage::{StorageService, UploadedFile, ITEMS_FOLDER},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    storage: StorageService,
}

impl CatalogService {
    pub fn new(repository: Repository, storage: StorageService) -> Self {
        Self { repository, storage }
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn create_category(&self, actor: &UserClaims, data: CreateCategory) -> AppResult<Category> {
        actor.require_admin()?;
        data.validate()?;
        self.repository.categories.create(&data.name).await
    }

    /// Delete a category together with all of its items
    pub async fn delete_category(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        actor.require_admin()?;
        self.repository.categories.delete(id).await?;
        tracing::info!(category_id = id, "category deleted with its items");
        Ok(())
    }

    pub async fn list_items(&self) -> AppResult<Vec<ItemShort>> {
        self.repository.items.list().await
    }

    /// Items of a category; unknown categories are reported as not found
    pub async fn list_items_by_category(&self, category_id: i32) -> AppResult<(Category, Vec<ItemShort>)> {
        let category = self.repository.categories.get_by_id(category_id).await?;
        let items = self.repository.items.list_by_category(category_id).await?;
        Ok((category, items))
    }

    pub async fn get_item(&self, id: i32) -> AppResult<Item> {
        self.repository.items.get_by_id(id).await
    }

    pub async fn create_item(&self, actor: &UserClaims, data: CreateItem) -> AppResult<Item> {
        actor.require_admin()?;
        data.validate()?;
        self.repository.categories.get_by_id(data.category_id).await?;
        self.repository.items.create(&data).await
    }

    pub async fn set_stock(&self, actor: &UserClaims, id: i32, stock: i32) -> AppResult<Item> {
        actor.require_admin()?;
        if stock < 0 {
            return Err(AppError::Validation("Stock cannot be negative".to_string()));
        }
        let item = self.repository.items.set_stock(id, stock).await?;
        tracing::info!(item_id = id, stock, admin_id = actor.user_id, "stock set");
        Ok(item)
    }

    /// Replace the picture of an item
    pub async fn set_image(&self, actor: &UserClaims, id: i32, file: UploadedFile) -> AppResult<Item> {
        actor.require_admin()?;
        let previous = self.repository.items.get_by_id(id).await?.image;
        let reference = self.storage.save_image(ITEMS_FOLDER, &file).await?;
        let item = match self.repository.items.set_image(id, &reference).await {
            Ok(item) => item,
            Err(e) => {
                self.storage.remove(&reference).await?;
                return Err(e);
            }
        };
        if let Some(old) = previous {
            if let Err(e) = self.storage.remove(&old).await {
                tracing::warn!(item_id = id, "could not remove old image: {}", e);
            }
        }
        Ok(item)
    }

    pub async fn delete_item(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        actor.require_admin()?;
        self.repository.items.delete(id).await
    }

    pub async fn list_reviews(&self, item_id: i32) -> AppResult<Vec<Review>> {
        self.repository.items.get_by_id(item_id).await?;
        self.repository.reviews.list_for_item(item_id).await
    }

    pub async fn create_review(&self, actor: &UserClaims, item_id: i32, data: CreateReview) -> AppResult<Review> {
        data.validate()?;
        self.repository.items.get_by_id(item_id).await?;
        self.repository
            .reviews
            .create(actor.user_id, item_id, &data.content)
            .await
    }
}
