use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use storefront_quoteservice::{
    api::notifications::{HttpNotifier, NoopNotifier, Notifier},
    app_state::AppState,
    bootstrap, config, db,
    profiles::PgProfileStore,
    quotes::{ConfirmationDelay, PgQuoteRequestStore},
    routes,
    storage::FileStorage,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let db_pool = db::create_pool(&config.database).await?;

    let notifier: Arc<dyn Notifier> = match &config.notifications.function_url {
        Some(url) => Arc::new(HttpNotifier::new(
            reqwest::Client::new(),
            url.clone(),
            config.notifications.api_key.clone(),
        )),
        None => {
            tracing::warn!("NOTIFICATION_FUNCTION_URL is not set, notifications are disabled");
            Arc::new(NoopNotifier)
        }
    };

    let storage = FileStorage::open(&config.storage.dir).with_context(|| {
        format!(
            "Failed to open cart storage at {}",
            config.storage.dir.display()
        )
    })?;

    let state = AppState::new(
        db_pool.clone(),
        Arc::new(PgQuoteRequestStore::new(db_pool.clone())),
        Arc::new(PgProfileStore::new(db_pool)),
        notifier,
        Arc::new(storage),
        config.quotes.compensation,
    )
    .with_confirmation_delay(ConfirmationDelay::new(config.quotes.confirmation_delay));

    let (router, mut openapi) = routes::routes_with_openapi(&state).split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Storefront QuoteService API")
        .version("1.0.0")
        .build();
    bootstrap::add_security_schemes(&mut openapi);
    let swagger_ui = bootstrap::create_swagger_ui(openapi);

    let app = Router::new()
        .merge(router)
        .merge(swagger_ui)
        .with_state(state);

    tracing::info!("Bootstrapping...");
    bootstrap::serve("QuoteService", app, &config.server).await?;
    Ok(())
}
