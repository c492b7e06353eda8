use super::models::{Item, ItemRow, NewItem, View};
use crate::backend::{BackendError, RowStore};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

/// Postgres backed row store for drive items.
#[derive(Debug, Clone)]
pub struct ItemDb {
    pool: PgPool,
}

impl ItemDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowStore for ItemDb {
    async fn query(&self, owner_id: &str, view: View) -> Result<Vec<Item>, BackendError> {
        debug!("Querying items for {owner_id} in {view}");

        sqlx::query_as::<_, ItemRow>(
            "SELECT id, name, kind, view, file_path, owner_id, last_modified
            FROM items WHERE owner_id = $1 AND view = $2
            ORDER BY last_modified",
        )
        .bind(owner_id)
        .bind(view.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Item::try_from)
        .collect()
    }

    async fn insert(&self, item: NewItem) -> Result<Item, BackendError> {
        let NewItem {
            name,
            kind,
            last_modified,
            view,
            file_path,
            owner_id,
        } = item;

        let row = sqlx::query_as::<_, ItemRow>(
            "INSERT INTO items(name, kind, view, file_path, owner_id, last_modified)
            VALUES($1, $2, $3, $4, $5, $6)
            RETURNING id, name, kind, view, file_path, owner_id, last_modified",
        )
        .bind(name)
        .bind(kind.as_str())
        .bind(view.as_str())
        .bind(file_path)
        .bind(owner_id)
        .bind(last_modified)
        .fetch_one(&self.pool)
        .await?;

        Item::try_from(row)
    }
}
