//! Common test utilities
#![allow(dead_code)]

pub mod factories;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;

use debit_card_api::auth::issue_token;
use debit_card_api::domain::User;
use debit_card_api::store::{InMemoryRecordStore, RecordStore};
use debit_card_api::{api, AppState};

/// Full router over a fresh in-memory store
pub struct TestApp {
    pub store: Arc<InMemoryRecordStore>,
    router: Router,
}

/// A user together with a valid bearer token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let state = AppState::new(store.clone());
        Self {
            store,
            router: api::app(state),
        }
    }

    /// Create a user and sign them in
    pub async fn user(&self) -> TestUser {
        let user = factories::create_user(self.store.as_ref()).await;
        let issued = issue_token(self.store.as_ref(), user.id, "test").await.unwrap();
        TestUser {
            user,
            token: issued.token,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, as_user: &TestUser, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(&as_user.token), None).await
    }

    pub async fn post(&self, as_user: &TestUser, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(&as_user.token), Some(body))
            .await
    }

    pub async fn put(&self, as_user: &TestUser, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(&as_user.token), Some(body))
            .await
    }

    pub async fn delete(&self, as_user: &TestUser, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(&as_user.token), None)
            .await
    }

    pub fn dyn_store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }
}
