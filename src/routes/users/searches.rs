use anyhow::Context;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    search_history::SearchHistory,
};

/// Recent catalog searches of the authenticated user.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/users/searches",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_recent_searches))
            .routes(utoipa_axum::routes!(record_search))
            .routes(utoipa_axum::routes!(clear_recent_searches))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

/// Runs `op` on the caller's history on the blocking pool, since the
/// history is read from and written to disk.
async fn with_history<T, F>(state: &AppState, user_id: Uuid, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&SearchHistory) -> T + Send + 'static,
{
    let history = state.search_history(user_id);
    let result = tokio::task::spawn_blocking(move || op(&history))
        .await
        .context("Search history task failed")?;

    Ok(result)
}

/// Fetch the five most recent search terms, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Searches"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "List recent searches", body = StdResponse<Vec<String>, String>)
    )
)]
async fn get_recent_searches(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(StdResponse {
        data: Some(with_history(&state, user_id, SearchHistory::list).await?),
        message: Some("Get recent searches successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct RecordSearchReq {
    term: String,
}

/// Remember a search term.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Searches"],
    security(("userId" = [])),
    request_body = RecordSearchReq,
    responses(
        (status = 200, description = "Recorded search successfully", body = StdResponse<Vec<String>, String>)
    )
)]
async fn record_search(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<RecordSearchReq>,
) -> Result<impl IntoResponse, AppError> {
    let recent = with_history(&state, user_id, move |history| history.record(&body.term)).await?;

    Ok(StdResponse {
        data: Some(recent),
        message: Some("Recorded search successfully"),
    })
}

/// Forget every recent search.
#[utoipa::path(
    delete,
    path = "/",
    tags = ["Searches"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "Cleared recent searches successfully", body = StdResponse<Vec<String>, String>)
    )
)]
async fn clear_recent_searches(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    with_history(&state, user_id, SearchHistory::clear).await?;

    Ok(StdResponse {
        data: Some(Vec::<String>::new()),
        message: Some("Cleared recent searches successfully"),
    })
}
