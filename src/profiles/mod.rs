//! Profiles of the users known to the service. A profile row backs every
//! quote request and holds the role that decides back-office access.

mod memory;
mod store;

pub use memory::InMemoryProfiles;
pub use store::PgProfileStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{ProfileEntity, Role};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Registers `user_id` with the `user` role unless a profile exists.
    async fn ensure(&self, user_id: Uuid) -> Result<()>;

    /// Stored role, or `None` for unknown users.
    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>>;

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<Option<ProfileEntity>>;
}
