use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    db::DieselError,
    middleware,
    models::{CategoryEntity, CreateCategoryEntity},
    schema::categories,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/categories",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_category))
            .routes(utoipa_axum::routes!(delete_category))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::admins_authorization,
            )),
    )
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin categories"],
    security(("userId" = [])),
    request_body = CreateCategoryEntity,
    responses(
        (status = 200, description = "Created category successfully", body = StdResponse<CategoryEntity, String>),
        (status = 409, description = "A category with this name exists")
    )
)]
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryEntity>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Category name must not be empty".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let category: QueryResult<CategoryEntity> = diesel::insert_into(categories::table)
        .values(&body)
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await;

    match category {
        Ok(category) => Ok(StdResponse {
            data: Some(category),
            message: Some("Created category successfully"),
        }),
        Err(DieselError::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _)) => {
            Err(AppError::Conflict(format!(
                "Category {} already exists",
                body.name
            )))
        }
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Delete a category. Its products become uncategorized.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin categories"],
    security(("userId" = [])),
    params(
        ("id" = Uuid, Path, description = "Category ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted category successfully", body = StdResponse<CategoryEntity, String>)
    )
)]
async fn delete_category(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let category: QueryResult<CategoryEntity> = diesel::delete(categories::table.find(id))
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await;

    match category {
        Ok(category) => Ok(StdResponse {
            data: Some(category),
            message: Some("Deleted category successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}
