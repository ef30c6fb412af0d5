use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{ProfileEntity, Role},
    schema::profiles,
};

use super::ProfileStore;

pub struct PgProfileStore {
    pool: DbPool,
}

impl PgProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn ensure(&self, user_id: Uuid) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let created = diesel::insert_into(profiles::table)
            .values(profiles::id.eq(user_id))
            .on_conflict(profiles::id)
            .do_nothing()
            .execute(conn)
            .await
            .context("Failed to register profile")?;

        if created > 0 {
            info!("Registered profile {}", user_id);
        }
        Ok(())
    }

    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let role: Option<String> = profiles::table
            .find(user_id)
            .select(profiles::role)
            .get_result(conn)
            .await
            .optional()
            .context("Failed to get profile role")?;

        role.map(|role| role.parse::<Role>().map_err(|err| anyhow!(err)))
            .transpose()
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<Option<ProfileEntity>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let profile = diesel::update(profiles::table.find(user_id))
            .set(profiles::role.eq(role.as_str()))
            .returning(ProfileEntity::as_returning())
            .get_result(conn)
            .await
            .optional()
            .context("Failed to update profile role")?;

        Ok(profile)
    }
}
