use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::storage::Storage;

pub const SEARCH_HISTORY_KEY: &str = "recent_searches";
pub const MAX_RECENT_SEARCHES: usize = 5;

pub fn search_history_key(user_id: Uuid) -> String {
    format!("{}.{}", SEARCH_HISTORY_KEY, user_id)
}

/// Hands out search histories that share one lock per user, so concurrent
/// requests of the same user cannot drop each other's terms.
#[derive(Clone)]
pub struct SearchHistories {
    storage: Arc<dyn Storage>,
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl SearchHistories {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn for_user(&self, user_id: Uuid) -> SearchHistory {
        let lock = self.locks.lock().entry(user_id).or_default().clone();
        SearchHistory {
            storage: self.storage.clone(),
            key: search_history_key(user_id),
            lock,
        }
    }
}

/// Most-recent-first list of a user's last five distinct search terms.
pub struct SearchHistory {
    storage: Arc<dyn Storage>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl SearchHistory {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            lock: Arc::default(),
        }
    }

    pub fn list(&self) -> Vec<String> {
        match self.storage.get(&self.key) {
            Ok(Some(blob)) => serde_json::from_str::<Vec<String>>(&blob)
                .map(|mut terms| {
                    terms.truncate(MAX_RECENT_SEARCHES);
                    terms
                })
                .unwrap_or_else(|err| {
                    warn!("Discarding corrupt search history {}: {}", self.key, err);
                    Vec::new()
                }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Failed to read search history {}: {}", self.key, err);
                Vec::new()
            }
        }
    }

    /// Records a term and returns the updated list. Blank terms are ignored.
    pub fn record(&self, term: &str) -> Vec<String> {
        let _guard = self.lock.lock();
        let term = term.trim();
        let mut terms = self.list();
        if term.is_empty() {
            return terms;
        }

        terms.retain(|existing| existing != term);
        terms.insert(0, term.to_string());
        terms.truncate(MAX_RECENT_SEARCHES);
        self.persist(&terms);
        terms
    }

    pub fn clear(&self) {
        let _guard = self.lock.lock();
        if let Err(err) = self.storage.remove(&self.key) {
            warn!("Failed to clear search history {}: {}", self.key, err);
        }
    }

    fn persist(&self, terms: &[String]) {
        let result = serde_json::to_string(terms)
            .map_err(|err| err.to_string())
            .and_then(|blob| {
                self.storage
                    .set(&self.key, &blob)
                    .map_err(|err| err.to_string())
            });
        if let Err(err) = result {
            warn!("Failed to persist search history {}: {}", self.key, err);
        }
    }
}
