use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

/// Coarse change signal for the product catalog. Subscribers refetch the
/// whole listing on any event.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogChange {
    ProductCreated { product_id: Uuid },
    ProductUpdated { product_id: Uuid },
    ProductDeleted { product_id: Uuid },
}

#[derive(Clone)]
pub struct CatalogEvents {
    sender: broadcast::Sender<CatalogChange>,
}

impl CatalogEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, change: CatalogChange) {
        // No subscribers is not an error.
        if self.sender.send(change.clone()).is_err() {
            debug!("No catalog subscribers for {:?}", change);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogChange> {
        self.sender.subscribe()
    }
}

impl Default for CatalogEvents {
    fn default() -> Self {
        Self::new()
    }
}
