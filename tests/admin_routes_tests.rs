mod common;

use axum::http::StatusCode;
use serde_json::json;
use storefront_quoteservice::{
    api::notifications::Notification,
    models::{QuoteStatus, Role},
    quotes::CompensationPolicy,
};
use uuid::Uuid;

use common::{request, send, test_app};

fn role_change(admin: Uuid, target: Uuid, role: &str) -> axum::http::Request<axum::body::Body> {
    request(
        "PATCH",
        &format!("/admin/profiles/{}/role", target),
        Some(admin),
        Some(json!({ "role": role })),
    )
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let app = test_app(CompensationPolicy::None);
    let user = Uuid::new_v4();
    app.profiles.seed(user, Role::User);

    let req = request("GET", "/admin/quote-requests", Some(user), None);
    let (status, _) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_reject_unknown_users() {
    let app = test_app(CompensationPolicy::None);

    let req = request("GET", "/admin/quote-requests", Some(Uuid::new_v4()), None);
    let (status, _) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn a_role_header_does_not_grant_admin_access() {
    let app = test_app(CompensationPolicy::None);
    let mut req = request("GET", "/admin/quote-requests", Some(Uuid::new_v4()), None);
    req.headers_mut().insert("x-user-role", "admin".parse().unwrap());

    let (status, _) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn promoting_and_demoting_takes_effect_on_the_next_request() {
    let app = test_app(CompensationPolicy::None);
    let admin = app.admin();
    let user = Uuid::new_v4();
    app.profiles.seed(user, Role::User);
    let list = || request("GET", "/admin/quote-requests", Some(user), None);

    assert_eq!(send(&app.router, list()).await.0, StatusCode::FORBIDDEN);

    let (status, body) = send(&app.router, role_change(admin, user, "admin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(send(&app.router, list()).await.0, StatusCode::OK);

    let (status, _) = send(&app.router, role_change(admin, user, "user")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(send(&app.router, list()).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn administrators_cannot_demote_themselves() {
    let app = test_app(CompensationPolicy::None);
    let admin = app.admin();

    let (status, _) = send(&app.router, role_change(admin, admin, "user")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.profiles.get(admin).unwrap().role, "admin");
}

#[tokio::test]
async fn changing_the_role_of_an_unknown_profile_is_not_found() {
    let app = test_app(CompensationPolicy::None);
    let admin = app.admin();

    let (status, _) = send(&app.router, role_change(admin, Uuid::new_v4(), "admin")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_status_change_notifies_the_requester() {
    let app = test_app(CompensationPolicy::None);
    let caller = Some(Uuid::new_v4());
    let admin = Some(app.admin());
    let bolt = json!({ "id": Uuid::new_v4(), "name": "Bolt", "price": 12.5 });
    send(&app.router, request("POST", "/users/cart/items", caller, Some(bolt))).await;
    send(&app.router, request("POST", "/users/cart/submit", caller, Some(json!({})))).await;
    let id = app.quote_requests.rows()[0].id;

    let (status, body) = send(
        &app.router,
        request(
            "PATCH",
            &format!("/admin/quote-requests/{}/status", id),
            admin,
            Some(json!({ "status": "approved", "admin_notes": "  Ships next week " })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["admin_notes"], "Ships next week");
    assert_eq!(
        app.notifier.sent.lock().last(),
        Some(&Notification::StatusChanged {
            quote_request_id: id,
            status: QuoteStatus::Approved,
        })
    );

    let req = request("GET", "/admin/quote-requests?status=pending", admin, None);
    let (_, pending) = send(&app.router, req).await;
    assert!(pending["data"].as_array().unwrap().is_empty());
}
