use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::QuoteRequestEntity,
};

/// Quote requests submitted by the authenticated user.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/users/quote-requests",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_quote_requests))
            .routes(utoipa_axum::routes!(get_my_quote_request))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

/// Fetch every quote request row of the authenticated user, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Quote requests"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "List my quote requests", body = StdResponse<Vec<QuoteRequestEntity>, String>)
    )
)]
async fn get_my_quote_requests(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let rows = state
        .quote_requests
        .list_for_user(user_id)
        .await
        .context("Failed to get my quote requests")?;

    Ok(StdResponse {
        data: Some(rows),
        message: Some("Get my quote requests successfully"),
    })
}

/// Fetch one quote request row belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Quote requests"],
    security(("userId" = [])),
    params(
        ("id" = Uuid, Path, description = "Quote request ID to fetch")
    ),
    responses(
        (status = 200, description = "Get quote request successfully", body = StdResponse<QuoteRequestEntity, String>)
    )
)]
async fn get_my_quote_request(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let row = state
        .quote_requests
        .find(id)
        .await
        .context("Failed to get quote request")?
        .filter(|row| row.user_id == user_id)
        .ok_or(AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(row),
        message: Some("Get quote request successfully"),
    })
}
