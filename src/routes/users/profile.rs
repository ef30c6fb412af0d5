use anyhow::Context;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use diesel::{QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    db::DieselError,
    middleware,
    models::{ProfileEntity, UpdateProfileEntity},
    schema::profiles,
};

/// Profile of the authenticated user.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/users/profile",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_profile))
            .routes(utoipa_axum::routes!(update_my_profile))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

/// Fetch the profile of the authenticated user, registering it on first use.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Profile"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "Get profile successfully", body = StdResponse<ProfileEntity, String>)
    )
)]
async fn get_my_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.profiles.ensure(user_id).await?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let profile: QueryResult<ProfileEntity> = profiles::table.find(user_id).get_result(conn).await;

    match profile {
        Ok(profile) => Ok(StdResponse {
            data: Some(profile),
            message: Some("Get profile successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Update contact details of the authenticated user.
#[utoipa::path(
    patch,
    path = "/",
    tags = ["Profile"],
    security(("userId" = [])),
    request_body = UpdateProfileEntity,
    responses(
        (status = 200, description = "Updated profile successfully", body = StdResponse<ProfileEntity, String>)
    )
)]
async fn update_my_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<UpdateProfileEntity>,
) -> Result<impl IntoResponse, AppError> {
    if body.full_name.is_none() && body.phone.is_none() && body.company.is_none() {
        return Err(AppError::BadRequest("Nothing to update".into()));
    }

    state.profiles.ensure(user_id).await?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let profile: QueryResult<ProfileEntity> = diesel::update(profiles::table.find(user_id))
        .set(&body)
        .returning(ProfileEntity::as_returning())
        .get_result(conn)
        .await;

    match profile {
        Ok(profile) => Ok(StdResponse {
            data: Some(profile),
            message: Some("Updated profile successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}
