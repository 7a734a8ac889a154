//! Reviews repository

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::review::Review};

#[derive(Clone)]
pub struct ReviewsRepository {
    pool: Pool<Postgres>,
}

impl ReviewsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Reviews of an item, newest first
    pub async fn list_for_item(&self, item_id: i32) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(
            r#"
            SELECT r.id, r.user_id, u.username, r.item_id, r.content, r.created_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.item_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, user_id: i32, item_id: i32, content: &str) -> AppResult<Review> {
        let row = sqlx::query_as::<_, Review>(
            r#"
            WITH inserted AS (
                INSERT INTO reviews (user_id, item_id, content)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT i.id, i.user_id, u.username, i.item_id, i.content, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
