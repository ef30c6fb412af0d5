mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use storefront_quoteservice::{
    cart::cart_key,
    quotes::{CompensationPolicy, ConfirmationDelay, SubmissionState},
    storage::Storage,
};
use uuid::Uuid;

use common::{request, send, test_app, test_app_with_delay};

fn product(name: &str) -> (Uuid, serde_json::Value) {
    let id = Uuid::new_v4();
    (
        id,
        json!({ "id": id, "name": name, "price": 12.5, "specifications": "M8 thread" }),
    )
}

#[tokio::test]
async fn cart_routes_require_a_signed_in_user() {
    let app = test_app(CompensationPolicy::None);

    let (status, body) = send(&app.router, request("GET", "/users/cart", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn adding_twice_keeps_one_line_and_persists_it() {
    let app = test_app(CompensationPolicy::None);
    let user = Uuid::new_v4();
    let (id, bolt) = product("Bolt");

    for _ in 0..2 {
        let req = request("POST", "/users/cart/items", Some(user), Some(bolt.clone()));
        let (status, _) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app.router, request("GET", "/users/cart", Some(user), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 1);
    assert_eq!(body["data"]["lines"][0]["product_id"], json!(id));
    assert_eq!(body["data"]["lines"][0]["custom_specifications"], "M8 thread");

    let stored = app.storage.get(&cart_key(user)).unwrap().unwrap();
    assert!(stored.contains("Bolt"));
}

#[tokio::test]
async fn cart_view_fields_share_one_casing() {
    let app = test_app(CompensationPolicy::None);
    let user = Some(Uuid::new_v4());
    let (_, bolt) = product("Bolt");

    let (_, body) = send(&app.router, request("POST", "/users/cart/items", user, Some(bolt))).await;

    let view = body["data"].as_object().unwrap();
    let line = body["data"]["lines"][0].as_object().unwrap();
    for key in view.keys().chain(line.keys()) {
        assert!(!key.chars().any(|c| c.is_ascii_uppercase()), "{key} is not snake_case");
    }
    assert!(line.contains_key("unit_price"));
    assert!(line.contains_key("custom_specifications"));
}

#[tokio::test]
async fn quantity_below_one_is_stored_as_one() {
    let app = test_app(CompensationPolicy::None);
    let user = Some(Uuid::new_v4());
    let (id, bolt) = product("Bolt");
    send(&app.router, request("POST", "/users/cart/items", user, Some(bolt))).await;

    let uri = format!("/users/cart/items/{}/quantity", id);
    let req = request("PATCH", &uri, user, Some(json!({ "quantity": 7 })));
    let (_, body) = send(&app.router, req).await;
    assert_eq!(body["data"]["total_quantity"], 7);

    let req = request("PATCH", &uri, user, Some(json!({ "quantity": -3 })));
    let (_, body) = send(&app.router, req).await;
    assert_eq!(body["data"]["lines"][0]["quantity"], 1);
}

#[tokio::test]
async fn carts_are_isolated_per_user() {
    let app = test_app(CompensationPolicy::None);
    let (alice, bob) = (Some(Uuid::new_v4()), Some(Uuid::new_v4()));
    let (_, bolt) = product("Bolt");
    send(&app.router, request("POST", "/users/cart/items", alice, Some(bolt))).await;

    let (_, body) = send(&app.router, request("GET", "/users/cart", bob, None)).await;

    assert_eq!(body["data"]["total_items"], 0);
}

#[tokio::test]
async fn submitting_creates_one_request_per_line_and_empties_the_cart() {
    let app = test_app(CompensationPolicy::None);
    let user = Uuid::new_v4();
    let caller = Some(user);
    let (_, bolt) = product("Bolt");
    let (_, nut) = product("Nut");
    send(&app.router, request("POST", "/users/cart/items", caller, Some(bolt))).await;
    send(&app.router, request("POST", "/users/cart/items", caller, Some(nut))).await;

    let form = json!({ "note": "Deliver to dock 4" });
    let (status, body) = send(
        &app.router,
        request("POST", "/users/cart/submit", caller, Some(form)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject"], "Quote request for 2 products");
    assert_eq!(body["data"]["request_ids"].as_array().unwrap().len(), 2);

    let rows = app.quote_requests.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.user_id == user));
    assert!(rows.iter().all(|row| row.message.contains("Deliver to dock 4")));
    assert_eq!(app.notifier.sent.lock().len(), 1);

    let (_, cart) = send(&app.router, request("GET", "/users/cart", caller, None)).await;
    assert_eq!(cart["data"]["total_items"], 0);
    assert_eq!(cart["data"]["submission"]["state"], "succeeded");

    let req = request("GET", "/users/quote-requests", caller, None);
    let (_, mine) = send(&app.router, req).await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn first_submission_registers_the_requester_profile() {
    let app = test_app(CompensationPolicy::None);
    let user = Uuid::new_v4();
    let (_, bolt) = product("Bolt");
    send(&app.router, request("POST", "/users/cart/items", Some(user), Some(bolt))).await;
    assert!(app.profiles.get(user).is_none());

    let req = request("POST", "/users/cart/submit", Some(user), Some(json!({})));
    let (status, _) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.profiles.get(user).unwrap().role, "user");
}

#[tokio::test]
async fn submitting_an_empty_cart_is_rejected_without_inserts() {
    let app = test_app(CompensationPolicy::None);

    let req = request("POST", "/users/cart/submit", Some(Uuid::new_v4()), Some(json!({})));
    let (status, _) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.quote_requests.insert_calls(), 0);
}

#[tokio::test]
async fn partial_failure_keeps_the_cart_and_reports_bad_gateway() {
    let app = test_app(CompensationPolicy::None);
    let caller = Some(Uuid::new_v4());
    let (_, bolt) = product("Bolt");
    let (nut_id, nut) = product("Nut");
    app.quote_requests.fail_inserts_for(nut_id);
    send(&app.router, request("POST", "/users/cart/items", caller, Some(bolt))).await;
    send(&app.router, request("POST", "/users/cart/items", caller, Some(nut))).await;

    let req = request("POST", "/users/cart/submit", caller, Some(json!({})));
    let (status, body) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("1 of 2"));
    assert_eq!(app.quote_requests.rows().len(), 1);
    assert!(app.notifier.sent.lock().is_empty());

    let (_, cart) = send(&app.router, request("GET", "/users/cart", caller, None)).await;
    assert_eq!(cart["data"]["total_items"], 2);
    assert_eq!(cart["data"]["submission"]["state"], "failed");
}

#[tokio::test]
async fn delete_compensation_removes_the_rows_that_did_land() {
    let app = test_app(CompensationPolicy::DeleteInserted);
    let caller = Some(Uuid::new_v4());
    let (_, bolt) = product("Bolt");
    let (nut_id, nut) = product("Nut");
    app.quote_requests.fail_inserts_for(nut_id);
    send(&app.router, request("POST", "/users/cart/items", caller, Some(bolt))).await;
    send(&app.router, request("POST", "/users/cart/items", caller, Some(nut))).await;

    let req = request("POST", "/users/cart/submit", caller, Some(json!({})));
    let (status, _) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(app.quote_requests.rows().is_empty());
    assert_eq!(app.quote_requests.delete_calls(), 1);
}

#[tokio::test]
async fn confirmed_submission_is_sent_once_the_delay_elapses() {
    let app = test_app_with_delay(
        CompensationPolicy::None,
        ConfirmationDelay::new(Duration::ZERO),
    );
    let user = Uuid::new_v4();
    let (_, bolt) = product("Bolt");
    send(&app.router, request("POST", "/users/cart/items", Some(user), Some(bolt))).await;

    let form = json!({ "note": "Rush order" });
    let req = request("POST", "/users/cart/submit/confirmation", Some(user), Some(form));
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["state"], "confirming");

    app.wait_for_submission(user, |state| {
        matches!(state, SubmissionState::Succeeded { .. })
    })
    .await;

    let rows = app.quote_requests.rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].message.contains("Rush order"));
    let (_, cart) = send(&app.router, request("GET", "/users/cart", Some(user), None)).await;
    assert_eq!(cart["data"]["total_items"], 0);
}

#[tokio::test]
async fn cancelling_a_confirmation_sends_nothing_and_keeps_the_cart() {
    let app = test_app_with_delay(
        CompensationPolicy::None,
        ConfirmationDelay::new(Duration::from_secs(60)),
    );
    let user = Uuid::new_v4();
    let (_, bolt) = product("Bolt");
    send(&app.router, request("POST", "/users/cart/items", Some(user), Some(bolt))).await;

    let req = request("POST", "/users/cart/submit/confirmation", Some(user), Some(json!({})));
    let (status, _) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    app.wait_for_submission(user, |state| *state == SubmissionState::Confirming)
        .await;

    let req = request("DELETE", "/users/cart/submit/confirmation", Some(user), None);
    let (status, _) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    app.wait_for_submission(user, |state| *state == SubmissionState::Idle)
        .await;

    assert_eq!(app.quote_requests.insert_calls(), 0);
    assert!(app.notifier.sent.lock().is_empty());
    let (_, cart) = send(&app.router, request("GET", "/users/cart", Some(user), None)).await;
    assert_eq!(cart["data"]["total_items"], 1);
}

#[tokio::test]
async fn only_one_confirmation_may_be_pending() {
    let app = test_app_with_delay(
        CompensationPolicy::None,
        ConfirmationDelay::new(Duration::from_secs(60)),
    );
    let user = Some(Uuid::new_v4());
    let (_, bolt) = product("Bolt");
    send(&app.router, request("POST", "/users/cart/items", user, Some(bolt))).await;

    let confirm = || request("POST", "/users/cart/submit/confirmation", user, Some(json!({})));
    let (first, _) = send(&app.router, confirm()).await;
    let (second, _) = send(&app.router, confirm()).await;

    assert_eq!(first, StatusCode::ACCEPTED);
    assert_eq!(second, StatusCode::CONFLICT);

    let cancel = || request("DELETE", "/users/cart/submit/confirmation", user, None);
    assert_eq!(send(&app.router, cancel()).await.0, StatusCode::OK);
    assert_eq!(send(&app.router, cancel()).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn confirming_an_empty_cart_is_rejected() {
    let app = test_app(CompensationPolicy::None);
    let user = Some(Uuid::new_v4());

    let req = request("POST", "/users/cart/submit/confirmation", user, Some(json!({})));
    let (status, _) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = request("DELETE", "/users/cart/submit/confirmation", user, None);
    assert_eq!(send(&app.router, req).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn users_only_see_their_own_quote_requests() {
    let app = test_app(CompensationPolicy::None);
    let owner = Some(Uuid::new_v4());
    let (_, bolt) = product("Bolt");
    send(&app.router, request("POST", "/users/cart/items", owner, Some(bolt))).await;
    send(&app.router, request("POST", "/users/cart/submit", owner, Some(json!({})))).await;
    let id = app.quote_requests.rows()[0].id;

    let uri = format!("/users/quote-requests/{}", id);
    let (status, _) = send(&app.router, request("GET", &uri, Some(Uuid::new_v4()), None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
