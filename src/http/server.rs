//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all user handlers
//! - Wire up middleware (request ID, tracing, timeout, metrics)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown within the grace period

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Request,
    http::HeaderName,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::time;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HttpConfig;
use crate::database::UserStore;
use crate::http::handlers::{
    create_user, delete_user, fetch_user, health_check, list_users, not_found, update_user,
};
use crate::http::middleware::track_metrics;
use crate::http::request::X_REQUEST_ID;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
}

/// Server failure.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("graceful shutdown did not finish within {0:?}")]
    GracePeriodElapsed(Duration),
}

/// HTTP server for the user API.
pub struct HttpServer {
    router: Router,
    grace_period: Duration,
}

impl HttpServer {
    /// Create a new HTTP server over the given store.
    pub fn new(config: &HttpConfig, users: Arc<dyn UserStore>) -> Self {
        let state = AppState { users };
        let router = Self::build_router(config, state);
        Self {
            router,
            grace_period: config.shutdown_grace_period(),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HttpConfig, state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        let mut router = Router::new()
            .route("/api/user", get(list_users).post(create_user))
            .route(
                "/api/user/{id}",
                get(fetch_user).put(update_user).delete(delete_user),
            );

        if config.health_check {
            router = router.route("/api/health-check", get(health_check));
        }

        router
            .fallback(not_found)
            .with_state(state)
            .layer(middleware::from_fn(track_metrics))
            .layer(TimeoutLayer::new(config.request_timeout()))
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Serve until `shutdown` fires, then drain within the grace period.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server listening");

        let (signalled_tx, signalled_rx) = oneshot::channel();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
                let _ = signalled_tx.send(());
            })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => result?,
            _ = signalled_rx => {
                match time::timeout(self.grace_period, &mut serve).await {
                    Ok(result) => result?,
                    Err(_) => {
                        tracing::error!(grace_period = ?self.grace_period, "Graceful shutdown timed out");
                        return Err(ServerError::GracePeriodElapsed(self.grace_period));
                    }
                }
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::database::{DatabaseError, MemoryUserStore, NewUser, User};

    fn http_config(health_check: bool) -> HttpConfig {
        HttpConfig {
            port: "0".into(),
            shutdown_grace_period: 1,
            health_check,
            ..Default::default()
        }
    }

    fn user(id: i64, first: &str) -> User {
        User {
            id,
            first_name: first.into(),
            last_name: "Hopper".into(),
            role: "Employee".into(),
            user_id: 100 + id,
        }
    }

    fn app(users: Arc<dyn UserStore>) -> Router {
        HttpServer::new(&http_config(true), users).router()
    }

    fn seeded() -> Router {
        app(Arc::new(MemoryUserStore::with_users([user(1, "Grace"), user(2, "Alan")])))
    }

    async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let response = router.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn fetch_user(&self, _id: i64) -> Result<Option<User>, DatabaseError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn update_user(&self, _id: i64, _user: NewUser) -> Result<Option<User>, DatabaseError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn create_user(&self, _user: NewUser) -> Result<i64, DatabaseError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn delete_user(&self, _id: i64) -> Result<bool, DatabaseError> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
    }

    fn body(role: &str, user_id: i64) -> Value {
        json!({
            "first_name": "Katherine",
            "last_name": "Johnson",
            "role": role,
            "user_id": user_id,
        })
    }

    #[tokio::test]
    async fn test_list_users() {
        let (status, json) = send(seeded(), Method::GET, "/api/user", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["users"].as_array().unwrap().len(), 2);
        assert_eq!(json["users"][0]["first_name"], "Grace");
    }

    #[tokio::test]
    async fn test_fetch_user() {
        let (status, json) = send(seeded(), Method::GET, "/api/user/2", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["id"], 2);
        assert_eq!(json["user"]["user_id"], 102);
    }

    #[tokio::test]
    async fn test_fetch_invalid_id() {
        let (status, json) = send(seeded(), Method::GET, "/api/user/two", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Not a valid ID");
    }

    #[tokio::test]
    async fn test_fetch_missing_user() {
        let (status, _) = send(seeded(), Method::GET, "/api/user/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_user() {
        let store = Arc::new(MemoryUserStore::new());
        let router = app(store.clone());

        let (status, json) = send(router, Method::POST, "/api/user", Some(body("Customer", 7))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json, json!({ "object_id": 1 }));
        assert_eq!(store.fetch_user(1).await.unwrap().unwrap().first_name, "Katherine");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_user() {
        let (status, json) = send(seeded(), Method::POST, "/api/user", Some(body("Admin", 0))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["validation_errors"]["role"].is_string());
        assert!(json["validation_errors"]["user_id"].is_string());
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_body() {
        let response = seeded()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/user")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_user() {
        let (status, json) = send(seeded(), Method::PUT, "/api/user/1", Some(body("Customer", 5))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["id"], 1);
        assert_eq!(json["user"]["first_name"], "Katherine");
        assert_eq!(json["user"]["role"], "Customer");
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let (status, _) = send(seeded(), Method::PUT, "/api/user/42", Some(body("Customer", 5))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let router = seeded();

        let (status, json) = send(router.clone(), Method::DELETE, "/api/user/1", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["message"], "object successfully deleted");

        let (status, json) = send(router, Method::DELETE, "/api/user/1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Object does not exist");
    }

    #[tokio::test]
    async fn test_store_failures_are_500() {
        let router = app(Arc::new(FailingStore));

        let (status, json) = send(router.clone(), Method::GET, "/api/user", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Error retrieving data");

        let (status, json) = send(router.clone(), Method::DELETE, "/api/user/3", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Error validating object");

        let (status, _) = send(router, Method::POST, "/api/user", Some(body("Employee", 1))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_check_is_optional() {
        let (status, json) = send(seeded(), Method::GET, "/api/health-check", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "ok");

        let without = HttpServer::new(&http_config(false), Arc::new(MemoryUserStore::new())).router();
        let (status, json) = send(without, Method::GET, "/api/health-check", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Page not found");
    }

    #[tokio::test]
    async fn test_request_id_is_set_and_propagated() {
        let response = seeded()
            .oneshot(Request::builder().uri("/api/user").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let generated = response.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap();
        assert_eq!(generated.len(), 36);

        let response = seeded()
            .oneshot(
                Request::builder()
                    .uri("/api/user")
                    .header(X_REQUEST_ID, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "abc-123");
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = HttpServer::new(&http_config(true), Arc::new(MemoryUserStore::new()));
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(server.run(listener, rx));
        tx.send(()).unwrap();

        let result = time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }
}
