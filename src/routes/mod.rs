use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub mod admin;
pub mod categories;
pub mod products;
pub mod users;

/// Every route of the service with its OpenAPI description. `state` backs
/// the stored-role check on the back-office routes.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    products::routes_with_openapi()
        .merge(categories::routes_with_openapi())
        .merge(users::cart::routes_with_openapi())
        .merge(users::quote_requests::routes_with_openapi())
        .merge(users::searches::routes_with_openapi())
        .merge(users::profile::routes_with_openapi())
        .merge(admin::products::routes_with_openapi(state))
        .merge(admin::categories::routes_with_openapi(state))
        .merge(admin::quote_requests::routes_with_openapi(state))
        .merge(admin::profiles::routes_with_openapi(state))
        .merge(admin::stats::routes_with_openapi(state))
}
