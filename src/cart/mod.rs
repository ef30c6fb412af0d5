//! The quote cart: an ordered set of product lines owned by a single user,
//! persisted as one JSON blob in a [`Storage`](crate::storage::Storage).

mod registry;
mod store;

pub use registry::{CartHandle, CartRegistry, SubmissionGuard};
pub use store::CartStore;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Fixed storage key of the cart blob. The server namespaces it per user.
pub const CART_STORAGE_KEY: &str = "quote_cart";

pub fn cart_key(user_id: Uuid) -> String {
    format!("{}.{}", CART_STORAGE_KEY, user_id)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Option<f64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub quantity: i32,
    pub custom_specifications: Option<String>,
}

/// What the catalog hands over when a product is added to the cart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub specifications: Option<String>,
}

impl From<ProductSummary> for CartLine {
    fn from(item: ProductSummary) -> Self {
        Self {
            product_id: item.id,
            name: item.name,
            unit_price: item.price,
            image_url: item.image_url,
            category: item.category,
            quantity: 1,
            custom_specifications: item.specifications.filter(|s| !s.trim().is_empty()),
        }
    }
}
