use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::notifications::Notifier,
    cart::CartRegistry,
    catalog_events::CatalogEvents,
    db::DbPool,
    profiles::ProfileStore,
    quotes::{CompensationPolicy, ConfirmationDelay, QuoteRequestStore, QuoteSubmission},
    search_history::{SearchHistories, SearchHistory},
    storage::Storage,
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub quote_requests: Arc<dyn QuoteRequestStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub notifier: Arc<dyn Notifier>,
    pub submission: Arc<QuoteSubmission>,
    pub carts: CartRegistry,
    pub search_histories: SearchHistories,
    pub catalog_events: CatalogEvents,
    pub confirmation_delay: ConfirmationDelay,
}

impl AppState {
    pub fn new(
        db_pool: DbPool,
        quote_requests: Arc<dyn QuoteRequestStore>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        storage: Arc<dyn Storage>,
        compensation: CompensationPolicy,
    ) -> Self {
        let submission = Arc::new(QuoteSubmission::new(
            quote_requests.clone(),
            profiles.clone(),
            notifier.clone(),
            compensation,
        ));

        Self {
            db_pool,
            quote_requests,
            profiles,
            notifier,
            submission,
            carts: CartRegistry::new(storage.clone()),
            search_histories: SearchHistories::new(storage),
            catalog_events: CatalogEvents::new(),
            confirmation_delay: ConfirmationDelay::default(),
        }
    }

    pub fn with_confirmation_delay(mut self, delay: ConfirmationDelay) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn search_history(&self, user_id: Uuid) -> SearchHistory {
        self.search_histories.for_user(user_id)
    }
}
