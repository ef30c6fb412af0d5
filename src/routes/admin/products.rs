use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    catalog_events::CatalogChange,
    db::DieselError,
    middleware,
    models::{CreateProductEntity, ProductEntity, UpdateProductEntity},
    schema::products,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_all_products))
            .routes(utoipa_axum::routes!(create_product))
            .routes(utoipa_axum::routes!(update_product))
            .routes(utoipa_axum::routes!(delete_product))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::admins_authorization,
            )),
    )
}

/// List every product, inactive ones included, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin products"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "List products", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_all_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let products: Vec<ProductEntity> = products::table
        .order_by(products::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get products")?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin products"],
    security(("userId" = [])),
    request_body = CreateProductEntity,
    responses(
        (status = 200, description = "Created product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name must not be empty".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::insert_into(products::table)
        .values(&body)
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create product")?;

    info!("Created product {}", product.id);
    state.catalog_events.publish(CatalogChange::ProductCreated {
        product_id: product.id,
    });

    Ok(StdResponse {
        data: Some(product),
        message: Some("Created product successfully"),
    })
}

/// Update some fields of a product. Absent fields are left untouched.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin products"],
    security(("userId" = [])),
    params(
        ("id" = Uuid, Path, description = "Product ID to update")
    ),
    request_body = UpdateProductEntity,
    responses(
        (status = 200, description = "Updated product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn update_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    if is_empty_update(&body) {
        return Err(AppError::BadRequest("Nothing to update".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: QueryResult<ProductEntity> = diesel::update(products::table.find(id))
        .set((&body, products::updated_at.eq(diesel::dsl::now)))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await;

    match product {
        Ok(product) => {
            state
                .catalog_events
                .publish(CatalogChange::ProductUpdated { product_id: id });
            Ok(StdResponse {
                data: Some(product),
                message: Some("Updated product successfully"),
            })
        }
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Delete a product along with the quote requests referencing it.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin products"],
    security(("userId" = [])),
    params(
        ("id" = Uuid, Path, description = "Product ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn delete_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: QueryResult<ProductEntity> = diesel::delete(products::table.find(id))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await;

    match product {
        Ok(product) => {
            info!("Deleted product {}", id);
            state
                .catalog_events
                .publish(CatalogChange::ProductDeleted { product_id: id });
            Ok(StdResponse {
                data: Some(product),
                message: Some("Deleted product successfully"),
            })
        }
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

fn is_empty_update(body: &UpdateProductEntity) -> bool {
    body.name.is_none()
        && body.description.is_none()
        && body.price.is_none()
        && body.image_url.is_none()
        && body.category_id.is_none()
        && body.specifications.is_none()
        && body.is_active.is_none()
}
