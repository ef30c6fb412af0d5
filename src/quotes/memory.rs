use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{CreateQuoteRequestEntity, QuoteRequestEntity, QuoteStatus};

use super::QuoteRequestStore;

/// Process-local quote request table. Inserts for selected products can be
/// made to fail, which is how the partial-failure paths are exercised.
#[derive(Default)]
pub struct InMemoryQuoteRequests {
    rows: Mutex<Vec<QuoteRequestEntity>>,
    failing_products: Mutex<HashSet<Uuid>>,
    insert_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryQuoteRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later insert for `product_id` returns an error.
    pub fn fail_inserts_for(&self, product_id: Uuid) {
        self.failing_products.lock().insert(product_id);
    }

    pub fn rows(&self) -> Vec<QuoteRequestEntity> {
        self.rows.lock().clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Inserts a fully formed row, bypassing failure injection.
    pub fn seed(&self, row: QuoteRequestEntity) {
        self.rows.lock().push(row);
    }
}

fn newest_first(mut rows: Vec<QuoteRequestEntity>) -> Vec<QuoteRequestEntity> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

#[async_trait]
impl QuoteRequestStore for InMemoryQuoteRequests {
    async fn insert(&self, request: CreateQuoteRequestEntity) -> Result<QuoteRequestEntity> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_products.lock().contains(&request.product_id) {
            bail!(
                "Failed to create quote request for product {}",
                request.product_id
            );
        }

        let now = Utc::now();
        let row = QuoteRequestEntity {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            subject: request.subject,
            message: request.message,
            product_id: request.product_id,
            quantity: request.quantity,
            custom_specifications: request.custom_specifications,
            status: request.status,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().push(row.clone());

        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }

    async fn find(&self, id: Uuid) -> Result<Option<QuoteRequestEntity>> {
        Ok(self.rows.lock().iter().find(|row| row.id == id).cloned())
    }

    async fn list(&self, status: Option<QuoteStatus>) -> Result<Vec<QuoteRequestEntity>> {
        let rows = self
            .rows
            .lock()
            .iter()
            .filter(|row| status.is_none_or(|s| row.status == s.as_str()))
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<QuoteRequestEntity>> {
        let rows = self
            .rows
            .lock()
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: QuoteStatus,
        admin_notes: Option<String>,
    ) -> Result<Option<QuoteRequestEntity>> {
        let mut rows = self.rows.lock();
        Ok(rows.iter_mut().find(|row| row.id == id).map(|row| {
            row.status = status.as_str().to_string();
            row.admin_notes = admin_notes;
            row.updated_at = Utc::now();
            row.clone()
        }))
    }
}
