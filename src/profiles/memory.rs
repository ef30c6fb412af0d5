use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{ProfileEntity, Role};

use super::ProfileStore;

/// Process-local profile table.
#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: Mutex<HashMap<Uuid, ProfileEntity>>,
    fail_ensure: AtomicBool,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later `ensure` returns an error.
    pub fn fail_ensures(&self) {
        self.fail_ensure.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, user_id: Uuid) -> Option<ProfileEntity> {
        self.profiles.lock().get(&user_id).cloned()
    }

    /// Inserts or overwrites a profile with the given role.
    pub fn seed(&self, user_id: Uuid, role: Role) {
        self.profiles.lock().insert(user_id, profile(user_id, role));
    }
}

fn profile(id: Uuid, role: Role) -> ProfileEntity {
    ProfileEntity {
        id,
        email: None,
        full_name: None,
        phone: None,
        company: None,
        role: role.as_str().to_string(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn ensure(&self, user_id: Uuid) -> Result<()> {
        if self.fail_ensure.load(Ordering::SeqCst) {
            bail!("Failed to register profile {}", user_id);
        }
        self.profiles
            .lock()
            .entry(user_id)
            .or_insert_with(|| profile(user_id, Role::User));
        Ok(())
    }

    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>> {
        match self.profiles.lock().get(&user_id) {
            Some(profile) => profile
                .role
                .parse::<Role>()
                .map(Some)
                .map_err(anyhow::Error::msg),
            None => Ok(None),
        }
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<Option<ProfileEntity>> {
        Ok(self.profiles.lock().get_mut(&user_id).map(|profile| {
            profile.role = role.as_str().to_string();
            profile.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_keeps_an_existing_role() {
        let profiles = InMemoryProfiles::new();
        let admin = Uuid::new_v4();
        profiles.seed(admin, Role::Admin);

        profiles.ensure(admin).await.unwrap();
        profiles.ensure(Uuid::nil()).await.unwrap();

        assert_eq!(profiles.role_of(admin).await.unwrap(), Some(Role::Admin));
        assert_eq!(profiles.role_of(Uuid::nil()).await.unwrap(), Some(Role::User));
        assert_eq!(profiles.role_of(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_role_ignores_unknown_users() {
        let profiles = InMemoryProfiles::new();
        let user = Uuid::new_v4();

        assert!(profiles.set_role(user, Role::Admin).await.unwrap().is_none());

        profiles.ensure(user).await.unwrap();
        let updated = profiles.set_role(user, Role::Admin).await.unwrap().unwrap();
        assert_eq!(updated.role, "admin");
    }
}
