use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::Storage;

use super::{CartLine, ProductSummary};

/// Persistent cart. Every mutation rewrites the whole blob and notifies
/// subscribers; persistence failures are logged and never surface to callers.
pub struct CartStore {
    storage: Arc<dyn Storage>,
    key: String,
    lines: Vec<CartLine>,
    changes: watch::Sender<Vec<CartLine>>,
}

impl CartStore {
    /// Loads the cart stored under `key`. A missing, unreadable or corrupt
    /// blob yields an empty cart.
    pub fn open(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let lines = match storage.get(&key) {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<CartLine>>(&blob) {
                Ok(lines) => dedupe(lines),
                Err(err) => {
                    warn!("Discarding corrupt cart blob under {}: {}", key, err);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Failed to read cart under {}: {}", key, err);
                Vec::new()
            }
        };
        let (changes, _) = watch::channel(lines.clone());

        Self {
            storage,
            key,
            lines,
            changes,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn get(&self, product_id: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products in the cart, not the sum of quantities.
    pub fn total_items(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|line| line.quantity as i64).sum()
    }

    /// Receives a snapshot of the lines after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartLine>> {
        self.changes.subscribe()
    }

    /// Adds a product with quantity 1. Re-adding a product already in the
    /// cart changes nothing.
    pub fn add(&mut self, item: ProductSummary) {
        if self.get(item.id).is_some() {
            debug!("Product {} already in cart {}", item.id, self.key);
            return;
        }
        self.lines.push(item.into());
        self.commit();
    }

    pub fn remove(&mut self, product_id: Uuid) {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        if self.lines.len() != before {
            self.commit();
        }
    }

    /// Sets the quantity of a line, coercing anything below 1 to 1.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i32) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity.max(1);
            self.commit();
        }
    }

    pub fn update_custom_specs(&mut self, product_id: Uuid, text: Option<String>) {
        if let Some(line) = self.line_mut(product_id) {
            line.custom_specifications = text;
            self.commit();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.commit();
    }

    /// Drops the lines that went out with a submission. Lines added or
    /// edited after `submitted` was taken stay in the cart.
    pub fn remove_submitted(&mut self, submitted: &[CartLine]) {
        let before = self.lines.len();
        self.lines.retain(|line| !submitted.contains(line));
        if self.lines.len() != before {
            self.commit();
        }
    }

    fn line_mut(&mut self, product_id: Uuid) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }

    fn commit(&mut self) {
        match serde_json::to_string(&self.lines) {
            Ok(blob) => {
                if let Err(err) = self.storage.set(&self.key, &blob) {
                    warn!("Failed to persist cart {}: {}", self.key, err);
                }
            }
            Err(err) => warn!("Failed to serialize cart {}: {}", self.key, err),
        }
        self.changes.send_replace(self.lines.clone());
    }
}

/// Keeps the first occurrence of each product and floors quantities, so a
/// hand-edited blob cannot break the cart invariants.
fn dedupe(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut seen = Vec::with_capacity(lines.len());
    lines
        .into_iter()
        .filter(|line| {
            if seen.contains(&line.product_id) {
                false
            } else {
                seen.push(line.product_id);
                true
            }
        })
        .map(|mut line| {
            line.quantity = line.quantity.max(1);
            line
        })
        .collect()
}
