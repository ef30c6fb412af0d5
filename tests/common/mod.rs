#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use anyhow::bail;
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, bb8::Pool};
use parking_lot::Mutex;
use serde_json::Value;
use storefront_quoteservice::{
    api::notifications::{Notification, Notifier},
    app_state::AppState,
    middleware::USER_ID_HEADER,
    models::Role,
    profiles::InMemoryProfiles,
    quotes::{CompensationPolicy, ConfirmationDelay, InMemoryQuoteRequests, SubmissionState},
    routes,
    storage::{MemoryStorage, Storage},
};
use tower::ServiceExt;
use uuid::Uuid;

/// Captures every notification; optionally fails each send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().push(notification.clone());
        if self.fail {
            bail!("notification function is down");
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub quote_requests: Arc<InMemoryQuoteRequests>,
    pub profiles: Arc<InMemoryProfiles>,
    pub notifier: Arc<RecordingNotifier>,
    pub storage: Arc<MemoryStorage>,
}

impl TestApp {
    /// Registers a fresh user with the admin role.
    pub fn admin(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.profiles.seed(id, Role::Admin);
        id
    }

    /// Blocks until the submission state of `user`'s cart satisfies `done`.
    pub async fn wait_for_submission(
        &self,
        user: Uuid,
        done: impl FnMut(&SubmissionState) -> bool,
    ) {
        let mut rx = self.state.carts.cart_for(user).watch_submission();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
            .await
            .expect("submission state did not settle")
            .expect("submission state channel closed");
    }
}

/// App wired to in-memory stores. The DB pool never connects, so only routes
/// that go through the quote request or profile stores, or the cart, may be
/// exercised.
pub fn test_app(compensation: CompensationPolicy) -> TestApp {
    test_app_with_delay(compensation, ConfirmationDelay::default())
}

pub fn test_app_with_delay(compensation: CompensationPolicy, delay: ConfirmationDelay) -> TestApp {
    let manager = AsyncDieselConnectionManager::new("postgres://unused@localhost/unused");
    let db_pool = Pool::builder().build_unchecked(manager);

    let quote_requests = Arc::new(InMemoryQuoteRequests::new());
    let profiles = Arc::new(InMemoryProfiles::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let storage = Arc::new(MemoryStorage::new());

    let state = AppState::new(
        db_pool,
        quote_requests.clone(),
        profiles.clone(),
        notifier.clone(),
        storage.clone() as Arc<dyn Storage>,
        compensation,
    )
    .with_confirmation_delay(delay);
    let (router, _) = routes::routes_with_openapi(&state).split_for_parts();

    TestApp {
        router: router.with_state(state.clone()),
        state,
        quote_requests,
        profiles,
        notifier,
        storage,
    }
}

pub fn request(method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        builder = builder.header(USER_ID_HEADER, id.to_string());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
