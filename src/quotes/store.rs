use anyhow::{Context, Result};
use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{CreateQuoteRequestEntity, QuoteRequestEntity, QuoteStatus},
    schema::quote_requests,
};

/// Row-level access to the `quote_requests` table.
///
/// Each call is independent; there is no cross-call transaction.
#[async_trait]
pub trait QuoteRequestStore: Send + Sync {
    async fn insert(&self, request: CreateQuoteRequestEntity) -> Result<QuoteRequestEntity>;

    /// Returns whether a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    async fn find(&self, id: Uuid) -> Result<Option<QuoteRequestEntity>>;

    /// Newest first.
    async fn list(&self, status: Option<QuoteStatus>) -> Result<Vec<QuoteRequestEntity>>;

    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<QuoteRequestEntity>>;

    async fn update_status(
        &self,
        id: Uuid,
        status: QuoteStatus,
        admin_notes: Option<String>,
    ) -> Result<Option<QuoteRequestEntity>>;
}

pub struct PgQuoteRequestStore {
    pool: DbPool,
}

impl PgQuoteRequestStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuoteRequestStore for PgQuoteRequestStore {
    async fn insert(&self, request: CreateQuoteRequestEntity) -> Result<QuoteRequestEntity> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let row = diesel::insert_into(quote_requests::table)
            .values(request)
            .returning(QuoteRequestEntity::as_returning())
            .get_result(conn)
            .await
            .context("Failed to create quote request")?;

        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let deleted = diesel::delete(quote_requests::table.find(id))
            .execute(conn)
            .await
            .context("Failed to delete quote request")?;

        Ok(deleted > 0)
    }

    async fn find(&self, id: Uuid) -> Result<Option<QuoteRequestEntity>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let row = quote_requests::table
            .find(id)
            .get_result(conn)
            .await
            .optional()
            .context("Failed to get quote request")?;

        Ok(row)
    }

    async fn list(&self, status: Option<QuoteStatus>) -> Result<Vec<QuoteRequestEntity>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let rows = match status {
            Some(status) => {
                quote_requests::table
                    .filter(quote_requests::status.eq(status.as_str()))
                    .order_by(quote_requests::created_at.desc())
                    .get_results(conn)
                    .await
            }
            None => {
                quote_requests::table
                    .order_by(quote_requests::created_at.desc())
                    .get_results(conn)
                    .await
            }
        }
        .context("Failed to get quote requests")?;

        Ok(rows)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<QuoteRequestEntity>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let rows = quote_requests::table
            .filter(quote_requests::user_id.eq(user_id))
            .order_by(quote_requests::created_at.desc())
            .get_results(conn)
            .await
            .context("Failed to get my quote requests")?;

        Ok(rows)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: QuoteStatus,
        admin_notes: Option<String>,
    ) -> Result<Option<QuoteRequestEntity>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let row = diesel::update(quote_requests::table.find(id))
            .set((
                quote_requests::status.eq(status.as_str()),
                quote_requests::admin_notes.eq(admin_notes),
                quote_requests::updated_at.eq(diesel::dsl::now),
            ))
            .returning(QuoteRequestEntity::as_returning())
            .get_result(conn)
            .await
            .optional()
            .context("Failed to update quote request status")?;

        Ok(row)
    }
}
