use std::convert::Infallible;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use diesel::{ExpressionMethods, PgTextExpressionMethods, QueryDsl, QueryResult, pg::Pg};
use diesel_async::RunQueryDsl;
use futures::{Stream, stream};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    db::DieselError,
    middleware::optional_user_id,
    models::ProductEntity,
    schema::products,
};

/// Public catalog routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_products))
            .routes(utoipa_axum::routes!(get_catalog_changes))
            .routes(utoipa_axum::routes!(get_product)),
    )
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ProductFilter {
    /// Only products of this category.
    category_id: Option<Uuid>,
    /// Case-insensitive name search.
    q: Option<String>,
}

/// List active products, optionally filtered by category and name.
///
/// Signed-in callers get the search term added to their recent searches.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    params(ProductFilter),
    responses(
        (status = 200, description = "List products", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let term = filter
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string);

    if let (Some(term), Some(user_id)) = (&term, optional_user_id(&headers)) {
        let history = state.search_history(user_id);
        let term = term.clone();
        tokio::task::spawn_blocking(move || history.record(&term))
            .await
            .context("Search history task failed")?;
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut query: products::BoxedQuery<'_, Pg> = products::table
        .filter(products::is_active.eq(true))
        .into_boxed();
    if let Some(category_id) = filter.category_id {
        query = query.filter(products::category_id.eq(category_id));
    }
    if let Some(term) = term {
        query = query.filter(products::name.ilike(format!("%{}%", escape_like(&term))));
    }

    let products: Vec<ProductEntity> = query
        .order_by(products::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get products")?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

/// Fetch a single product.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = Uuid, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: QueryResult<ProductEntity> = products::table.find(id).get_result(conn).await;

    match product {
        Ok(product) => Ok(StdResponse {
            data: Some(product),
            message: Some("Get product successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Server-sent events fired on every product write. Clients refetch the
/// listing on each event.
#[utoipa::path(
    get,
    path = "/changes",
    tags = ["Products"],
    responses(
        (status = 200, description = "Stream of catalog changes", body = String, content_type = "text/event-stream")
    )
)]
async fn get_catalog_changes(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.catalog_events.subscribe();

    let changes = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(change) => {
                    let event = Event::default().event("catalog_change");
                    let event = match serde_json::to_string(&change) {
                        Ok(data) => event.data(data),
                        Err(err) => {
                            warn!("Failed to serialize catalog change: {}", err);
                            event.data("{}")
                        }
                    };
                    return Some((Ok(event), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Catalog subscriber skipped {} changes", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(changes).keep_alive(KeepAlive::default())
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("bolt"), "bolt");
    }
}
