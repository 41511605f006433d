//! API Middleware
//!
//! Bearer-token authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{hash_token, parse_bearer};
use crate::error::AppError;
use crate::policy::Caller;
use crate::state::AppState;

/// Header carrying the request correlation id, in and out
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// =========================================================================
// Bearer Token Authentication Middleware
// =========================================================================

/// Resolve `Authorization: Bearer <token>` to a [`Caller`].
///
/// Runs before any handler; a missing, unknown or revoked token ends the
/// request with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token_hash = match parse_bearer(request.headers()) {
        Some(token) => hash_token(token),
        None => {
            tracing::debug!("Missing bearer token");
            return Err(AppError::Unauthenticated.into_response());
        }
    };

    let record = state
        .store
        .find_access_token(&token_hash)
        .await
        .map_err(|e| AppError::from(e).into_response())?;

    let record = match record {
        Some(record) if !record.is_revoked() => record,
        Some(record) => {
            tracing::info!(token_id = %record.id, "Revoked access token presented");
            return Err(AppError::Unauthenticated.into_response());
        }
        None => {
            tracing::info!("Unknown access token presented");
            return Err(AppError::Unauthenticated.into_response());
        }
    };

    if let Err(e) = state.store.touch_access_token(record.id, Utc::now()).await {
        tracing::warn!(token_id = %record.id, "Failed to record token use: {}", e);
    }

    tracing::Span::current().record("user_id", record.user_id.get());
    request
        .extensions_mut()
        .insert(Caller::new(record.user_id, record.id));

    Ok(next.run(request).await)
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
///
/// Outermost layer. Everything downstream runs inside a `request` span
/// carrying the correlation id (and `user_id` once authenticated), and the
/// id is echoed back on the response.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        user_id = tracing::field::Empty,
    );

    let mut response = log_request(request, next).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    response
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    // Mask sensitive headers
    let headers = mask_headers_for_logging(request.headers());

    let client_ip = request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip());

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        version = ?version,
        client_ip = ?client_ip,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fmt;
    use std::sync::{Arc, Mutex};

    use tower::util::ServiceExt;
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    use crate::auth::issue_token;
    use crate::domain::NewUser;
    use crate::store::{InMemoryRecordStore, RecordStore};

    /// Fields of interest, as recorded on a span or an event
    #[derive(Debug, Clone, Default)]
    struct Fields {
        message: Option<String>,
        correlation_id: Option<String>,
        user_id: Option<String>,
    }

    impl Visit for Fields {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            let value = Some(format!("{:?}", value));
            match field.name() {
                "message" => self.message = value,
                "correlation_id" => self.correlation_id = value,
                "user_id" => self.user_id = value,
                _ => {}
            }
        }

        fn record_i64(&mut self, field: &Field, value: i64) {
            self.record_debug(field, &value);
        }
    }

    /// Records each event with the fields of its enclosing spans
    #[derive(Clone, Default)]
    struct CaptureLayer(Arc<Mutex<Vec<Fields>>>);

    impl<S> Layer<S> for CaptureLayer
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
            let mut fields = Fields::default();
            attrs.record(&mut fields);
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(fields);
            }
        }

        fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
            if let Some(span) = ctx.span(id) {
                if let Some(fields) = span.extensions_mut().get_mut::<Fields>() {
                    values.record(fields);
                }
            }
        }

        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let mut captured = Fields::default();
            event.record(&mut captured);

            if let Some(scope) = ctx.event_scope(event) {
                for span in scope.from_root() {
                    if let Some(fields) = span.extensions().get::<Fields>() {
                        captured.correlation_id = captured
                            .correlation_id
                            .or_else(|| fields.correlation_id.clone());
                        captured.user_id = captured.user_id.or_else(|| fields.user_id.clone());
                    }
                }
            }

            self.0.lock().unwrap().push(captured);
        }
    }

    #[tokio::test]
    async fn test_handler_events_carry_the_correlation_id() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = Arc::new(InMemoryRecordStore::new());
        let user = store
            .create_user(NewUser {
                name: "Span Owner".to_string(),
                email: "span@example.test".to_string(),
            })
            .await
            .unwrap();
        let issued = issue_token(store.as_ref(), user.id, "test").await.unwrap();
        let router = crate::api::app(AppState::new(store));

        let correlation_id = Uuid::new_v4();
        let request = Request::builder()
            .method("POST")
            .uri("/api/debit-cards")
            .header("authorization", format!("Bearer {}", issued.token))
            .header("content-type", "application/json")
            .header(CORRELATION_ID_HEADER, correlation_id.to_string())
            .body(Body::from(r#"{"type":"visa"}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);

        let events = capture.0.lock().unwrap().clone();
        let created = events
            .iter()
            .find(|e| e.message.as_deref() == Some("Debit card created"))
            .expect("handler event was not recorded");

        assert_eq!(created.correlation_id, Some(correlation_id.to_string()));

        let completed = events
            .iter()
            .find(|e| e.message.as_deref() == Some("Request completed"))
            .expect("completion event was not recorded");
        assert_eq!(completed.correlation_id, Some(correlation_id.to_string()));
        assert_eq!(completed.user_id, Some(user.id.get().to_string()));
    }

    #[test]
    fn test_mask_headers_for_logging() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("authorization", "Bearer secret-token".parse().unwrap());
        headers.insert("x-correlation-id", "abc".parse().unwrap());

        let masked = mask_headers_for_logging(&headers);

        let auth = masked.iter().find(|(k, _)| k == "authorization");
        let content_type = masked.iter().find(|(k, _)| k == "content-type");
        let correlation = masked.iter().find(|(k, _)| k == "x-correlation-id");

        assert_eq!(auth.unwrap().1, "[REDACTED]");
        assert_eq!(content_type.unwrap().1, "application/json");
        assert_eq!(correlation.unwrap().1, "abc");
    }

    #[test]
    fn test_sensitive_headers_list() {
        assert!(SENSITIVE_HEADERS.contains(&"authorization"));
        assert!(SENSITIVE_HEADERS.contains(&"cookie"));
        assert!(!SENSITIVE_HEADERS.contains(&"content-type"));
    }
}
