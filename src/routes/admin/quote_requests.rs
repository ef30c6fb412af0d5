use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    api::notifications::{Notification, notify_best_effort},
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::{QuoteRequestEntity, QuoteStatus},
};

/// Back-office review of submitted quote requests.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/quote-requests",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_quote_requests))
            .routes(utoipa_axum::routes!(get_quote_request))
            .routes(utoipa_axum::routes!(update_status))
            .routes(utoipa_axum::routes!(delete_quote_request))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::admins_authorization,
            )),
    )
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct StatusFilter {
    status: Option<QuoteStatus>,
}

/// List quote requests, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin quote requests"],
    security(("userId" = [])),
    params(StatusFilter),
    responses(
        (status = 200, description = "List quote requests", body = StdResponse<Vec<QuoteRequestEntity>, String>)
    )
)]
async fn get_quote_requests(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<impl IntoResponse, AppError> {
    let requests = state.quote_requests.list(filter.status).await?;

    Ok(StdResponse {
        data: Some(requests),
        message: Some("Get quote requests successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Admin quote requests"],
    security(("userId" = [])),
    params(
        ("id" = Uuid, Path, description = "Quote request ID to fetch")
    ),
    responses(
        (status = 200, description = "Get quote request successfully", body = StdResponse<QuoteRequestEntity, String>)
    )
)]
async fn get_quote_request(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let request = state
        .quote_requests
        .find(id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(request),
        message: Some("Get quote request successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateStatusReq {
    status: QuoteStatus,
    admin_notes: Option<String>,
}

/// Approve, reject or reopen a quote request. The requester is notified of
/// approvals and rejections.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Admin quote requests"],
    security(("userId" = [])),
    params(
        ("id" = Uuid, Path, description = "Quote request ID to update")
    ),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Updated quote request successfully", body = StdResponse<QuoteRequestEntity, String>)
    )
)]
async fn update_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let admin_notes = body
        .admin_notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());

    let request = state
        .quote_requests
        .update_status(id, body.status, admin_notes)
        .await?
        .ok_or(AppError::NotFound)?;

    info!("Quote request {} is now {}", id, body.status);

    if body.status != QuoteStatus::Pending {
        notify_best_effort(
            state.notifier.as_ref(),
            Notification::StatusChanged {
                quote_request_id: id,
                status: body.status,
            },
        )
        .await;
    }

    Ok(StdResponse {
        data: Some(request),
        message: Some("Updated quote request successfully"),
    })
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin quote requests"],
    security(("userId" = [])),
    params(
        ("id" = Uuid, Path, description = "Quote request ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted quote request successfully", body = StdResponse<Uuid, String>)
    )
)]
async fn delete_quote_request(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if !state.quote_requests.delete(id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: Some(id),
        message: Some("Deleted quote request successfully"),
    })
}
