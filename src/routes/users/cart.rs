use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    cart::{CartHandle, CartLine, CartStore, ProductSummary},
    middleware,
    quotes::{QuoteForm, SubmissionReceipt, SubmissionState, SubmitError},
};

/// Quote cart of the authenticated user.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/users/cart",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart))
            .routes(utoipa_axum::routes!(clear_cart))
            .routes(utoipa_axum::routes!(add_item))
            .routes(utoipa_axum::routes!(remove_item))
            .routes(utoipa_axum::routes!(update_quantity))
            .routes(utoipa_axum::routes!(update_custom_specs))
            .routes(utoipa_axum::routes!(submit_cart))
            .routes(utoipa_axum::routes!(confirm_submission, cancel_confirmation))
            .routes(utoipa_axum::routes!(get_submission_state))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

#[derive(Serialize, ToSchema)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    /// Distinct products, used for the cart badge.
    pub total_items: usize,
    pub total_quantity: i64,
    pub submission: SubmissionState,
}

impl CartView {
    fn new(store: &CartStore, cart: &CartHandle) -> Self {
        Self {
            lines: store.lines().to_vec(),
            total_items: store.total_items(),
            total_quantity: store.total_quantity(),
            submission: cart.submission_state(),
        }
    }
}

/// Applies `edit` to the caller's cart and returns the resulting view.
/// Runs on the blocking pool since every edit is written through to disk.
async fn edit_cart<F>(state: &AppState, user_id: Uuid, edit: F) -> Result<CartView, AppError>
where
    F: FnOnce(&mut CartStore) + Send + 'static,
{
    let carts = state.carts.clone();
    let view = tokio::task::spawn_blocking(move || {
        let cart = carts.cart_for(user_id);
        let mut store = cart.lock();
        edit(&mut store);
        CartView::new(&store, &cart)
    })
    .await
    .context("Cart update task failed")?;

    Ok(view)
}

/// Fetch the cart of the authenticated user.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Cart"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<CartView, String>)
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = edit_cart(&state, user_id, |_| {}).await?;

    Ok(StdResponse {
        data: Some(view),
        message: Some("Get cart successfully"),
    })
}

/// Remove every line from the cart.
#[utoipa::path(
    delete,
    path = "/",
    tags = ["Cart"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "Cleared cart successfully", body = StdResponse<CartView, String>)
    )
)]
async fn clear_cart(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = edit_cart(&state, user_id, |store| store.clear()).await?;

    Ok(StdResponse {
        data: Some(view),
        message: Some("Cleared cart successfully"),
    })
}

/// Add a product to the cart. Adding a product that is already in the cart
/// leaves it unchanged.
#[utoipa::path(
    post,
    path = "/items",
    tags = ["Cart"],
    security(("userId" = [])),
    request_body = ProductSummary,
    responses(
        (status = 200, description = "Added item successfully", body = StdResponse<CartView, String>)
    )
)]
async fn add_item(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<ProductSummary>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name must not be empty".into()));
    }

    let view = edit_cart(&state, user_id, move |store| store.add(body)).await?;

    Ok(StdResponse {
        data: Some(view),
        message: Some("Added item successfully"),
    })
}

/// Remove a product from the cart. Unknown products are ignored.
#[utoipa::path(
    delete,
    path = "/items/{product_id}",
    tags = ["Cart"],
    security(("userId" = [])),
    params(
        ("product_id" = Uuid, Path, description = "Product ID to remove")
    ),
    responses(
        (status = 200, description = "Removed item successfully", body = StdResponse<CartView, String>)
    )
)]
async fn remove_item(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = edit_cart(&state, user_id, move |store| store.remove(product_id)).await?;

    Ok(StdResponse {
        data: Some(view),
        message: Some("Removed item successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateQuantityReq {
    quantity: i32,
}

/// Set the quantity of a cart line. Values below 1 are stored as 1.
#[utoipa::path(
    patch,
    path = "/items/{product_id}/quantity",
    tags = ["Cart"],
    security(("userId" = [])),
    params(
        ("product_id" = Uuid, Path, description = "Product ID to update")
    ),
    request_body = UpdateQuantityReq,
    responses(
        (status = 200, description = "Updated quantity successfully", body = StdResponse<CartView, String>)
    )
)]
async fn update_quantity(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<UpdateQuantityReq>,
) -> Result<impl IntoResponse, AppError> {
    let view = edit_cart(&state, user_id, move |store| {
        store.update_quantity(product_id, body.quantity)
    })
    .await?;

    Ok(StdResponse {
        data: Some(view),
        message: Some("Updated quantity successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateCustomSpecsReq {
    custom_specifications: Option<String>,
}

/// Replace the custom specification text of a cart line.
#[utoipa::path(
    patch,
    path = "/items/{product_id}/specifications",
    tags = ["Cart"],
    security(("userId" = [])),
    params(
        ("product_id" = Uuid, Path, description = "Product ID to update")
    ),
    request_body = UpdateCustomSpecsReq,
    responses(
        (status = 200, description = "Updated specifications successfully", body = StdResponse<CartView, String>)
    )
)]
async fn update_custom_specs(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<UpdateCustomSpecsReq>,
) -> Result<impl IntoResponse, AppError> {
    let view = edit_cart(&state, user_id, move |store| {
        store.update_custom_specs(product_id, body.custom_specifications)
    })
    .await?;

    Ok(StdResponse {
        data: Some(view),
        message: Some("Updated specifications successfully"),
    })
}

/// Submit the cart as quote requests, one per line. The submitted lines
/// leave the cart.
#[utoipa::path(
    post,
    path = "/submit",
    tags = ["Cart"],
    security(("userId" = [])),
    request_body = QuoteForm,
    responses(
        (status = 200, description = "Submitted quote request successfully", body = StdResponse<SubmissionReceipt, String>),
        (status = 400, description = "The cart is empty"),
        (status = 409, description = "A submission is already in flight"),
        (status = 502, description = "Some lines could not be saved")
    )
)]
async fn submit_cart(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<QuoteForm>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.carts.cart_for(user_id);
    let receipt = state.submission.submit(&cart, Some(user_id), body).await?;

    Ok(StdResponse {
        data: Some(receipt),
        message: Some("Submitted quote request successfully"),
    })
}

/// Start a cancellable submission. The cart is sent once the confirmation
/// delay elapses unless the confirmation is cancelled first.
#[utoipa::path(
    post,
    path = "/submit/confirmation",
    tags = ["Cart"],
    security(("userId" = [])),
    request_body = QuoteForm,
    responses(
        (status = 202, description = "Awaiting confirmation", body = StdResponse<SubmissionState, String>),
        (status = 400, description = "The cart is empty"),
        (status = 409, description = "A submission is already pending or in flight")
    )
)]
async fn confirm_submission(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<QuoteForm>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.carts.cart_for(user_id);
    if cart.lock().is_empty() {
        return Err(SubmitError::EmptyCart.into());
    }
    if cart.is_submitting() {
        return Err(SubmitError::AlreadySubmitting.into());
    }
    let cancel = cart
        .arm_confirmation()
        .ok_or_else(|| AppError::Conflict("A confirmation is already pending".into()))?;

    let submission = state.submission.clone();
    let delay = state.confirmation_delay;
    tokio::spawn(async move {
        let result = submission
            .submit_after_confirmation(&cart, Some(user_id), body, delay, &cancel)
            .await;
        cart.disarm_confirmation(&cancel);
        if let Err(err) = result {
            debug!("Confirmed submission for user {} ended: {}", user_id, err);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        StdResponse {
            data: Some(SubmissionState::Confirming),
            message: Some("Awaiting confirmation"),
        },
    ))
}

/// Cancel a pending confirmation. Nothing is sent and the cart is kept.
#[utoipa::path(
    delete,
    path = "/submit/confirmation",
    tags = ["Cart"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "Cancelled confirmation successfully", body = StdResponse<SubmissionState, String>),
        (status = 404, description = "No confirmation is pending"),
        (status = 409, description = "The cart is already being sent")
    )
)]
async fn cancel_confirmation(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.carts.cart_for(user_id);
    if cart.submission_state() == SubmissionState::Submitting {
        return Err(AppError::Conflict("The quote request is already being sent".into()));
    }
    if !cart.cancel_confirmation() {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: Some(SubmissionState::Idle),
        message: Some("Cancelled confirmation successfully"),
    })
}

/// Progress of the most recent submission of this cart.
#[utoipa::path(
    get,
    path = "/submission",
    tags = ["Cart"],
    security(("userId" = [])),
    responses(
        (status = 200, description = "Get submission state successfully", body = StdResponse<SubmissionState, String>)
    )
)]
async fn get_submission_state(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.carts.cart_for(user_id);

    Ok(StdResponse {
        data: Some(cart.submission_state()),
        message: Some("Get submission state successfully"),
    })
}
