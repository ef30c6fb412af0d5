use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::{ProfileEntity, Role},
    schema::profiles,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/profiles",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_profiles))
            .routes(utoipa_axum::routes!(update_role))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::admins_authorization,
            )),
    )
}

/// List every registered user, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin profiles"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "List profiles", body = StdResponse<Vec<ProfileEntity>, String>)
    )
)]
async fn get_profiles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let profiles: Vec<ProfileEntity> = profiles::table
        .order_by(profiles::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get profiles")?;

    Ok(StdResponse {
        data: Some(profiles),
        message: Some("Get profiles successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateRoleReq {
    role: Role,
}

/// Promote or demote a user. Administrators cannot demote themselves.
#[utoipa::path(
    patch,
    path = "/{id}/role",
    tags = ["Admin profiles"],
    security(("userId" = [])),
    params(
        ("id" = Uuid, Path, description = "Profile ID to update")
    ),
    request_body = UpdateRoleReq,
    responses(
        (status = 200, description = "Updated role successfully", body = StdResponse<ProfileEntity, String>)
    )
)]
async fn update_role(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(caller_id): Extension<Uuid>,
    Json(body): Json<UpdateRoleReq>,
) -> Result<impl IntoResponse, AppError> {
    if caller_id == id && body.role != Role::Admin {
        return Err(AppError::BadRequest(
            "Administrators cannot demote themselves".into(),
        ));
    }

    let profile = state
        .profiles
        .set_role(id, body.role)
        .await?
        .ok_or(AppError::NotFound)?;

    info!("Profile {} now has role {}", id, body.role.as_str());
    Ok(StdResponse {
        data: Some(profile),
        message: Some("Updated role successfully"),
    })
}
