use anyhow::Context;
use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use diesel::QueryDsl;
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::{CategoryEntity, ProductEntity},
    schema::{categories, products, profiles},
    stats::{self, DashboardStats},
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/stats",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_dashboard))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::admins_authorization,
            )),
    )
}

/// Dashboard aggregates over every quote request, product and category.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin stats"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "Get stats successfully", body = StdResponse<DashboardStats, String>)
    )
)]
async fn get_dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = state.quote_requests.list(None).await?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let products: Vec<ProductEntity> = products::table
        .get_results(conn)
        .await
        .context("Failed to get products")?;
    let categories: Vec<CategoryEntity> = categories::table
        .get_results(conn)
        .await
        .context("Failed to get categories")?;
    let user_count: i64 = profiles::table
        .count()
        .get_result(conn)
        .await
        .context("Failed to count profiles")?;

    let dashboard = stats::dashboard(
        &rows,
        &products,
        &categories,
        usize::try_from(user_count).unwrap_or_default(),
        Utc::now().date_naive(),
    );

    Ok(StdResponse {
        data: Some(dashboard),
        message: Some("Get stats successfully"),
    })
}
