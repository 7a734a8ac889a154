//! Items repository: catalog records and the stock adjuster

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::item::{CreateItem, Item, ItemShort},
};

const ITEM_SHORT_SELECT: &str = r#"
    SELECT i.id, i.name, i.category_id, c.name AS category_name, i.image, i.stock
    FROM items i
    JOIN categories c ON c.id = i.category_id
"#;

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// List all items with their category
    pub async fn list(&self) -> AppResult<Vec<ItemShort>> {
        let query = format!("{} ORDER BY i.name", ITEM_SHORT_SELECT);
        let items = sqlx::query_as::<_, ItemShort>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// List items of one category
    pub async fn list_by_category(&self, category_id: i32) -> AppResult<Vec<ItemShort>> {
        let query = format!("{} WHERE i.category_id = $1 ORDER BY i.name", ITEM_SHORT_SELECT);
        let items = sqlx::query_as::<_, ItemShort>(&query)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn create(&self, data: &CreateItem) -> AppResult<Item> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, category_id, stock)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(data.category_id)
        .bind(data.stock.unwrap_or(1))
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    /// Set an absolute stock count (administration)
    pub async fn set_stock(&self, id: i32, stock: i32) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("UPDATE items SET stock = $1 WHERE id = $2 RETURNING *")
            .bind(stock)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    pub async fn set_image(&self, id: i32, image: &str) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("UPDATE items SET image = $1 WHERE id = $2 RETURNING *")
            .bind(image)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item with id {} not found", id)));
        }
        Ok(())
    }

    /// Take one unit out of stock and return the new count.
    ///
    /// Runs as a single conditional `UPDATE`, so the row lock serialises
    /// concurrent borrowers: when one unit is left only one of them gets it.
    /// Must be called on the connection of the transaction that also
    /// records the loan.
    pub async fn decrement_stock(conn: &mut PgConnection, item_id: i32) -> AppResult<i32> {
        let updated: Option<i32> = sqlx::query_scalar(
            "UPDATE items SET stock = stock - 1 WHERE id = $1 AND stock > 0 RETURNING stock",
        )
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(stock) = updated {
            return Ok(stock);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE id = $1)")
            .bind(item_id)
            .fetch_one(&mut *conn)
            .await?;

        if exists {
            Err(AppError::OutOfStock(format!("Item {} is out of stock", item_id)))
        } else {
            Err(AppError::NotFound(format!("Item with id {} not found", item_id)))
        }
    }

    /// Put one unit back in stock. A vanished item is ignored.
    pub async fn increment_stock(conn: &mut PgConnection, item_id: i32) -> AppResult<Option<i32>> {
        let stock: Option<i32> =
            sqlx::query_scalar("UPDATE items SET stock = stock + 1 WHERE id = $1 RETURNING stock")
                .bind(item_id)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(stock)
    }
}
