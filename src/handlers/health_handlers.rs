//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the storage backend answers a listing

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// `GET /healthz`
///
/// Very small liveness probe: always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ok",
            files: None,
            error: None,
        }),
    )
}

/// `GET /readyz`
///
/// Lists the upload container. HTTP 200 with the object count when the
/// backend answers, HTTP 503 with the error kind otherwise; the full error
/// only goes to the log.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.storage.list().await {
        Ok(files) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ok",
                files: Some(files.len()),
                error: None,
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "error",
                    files: None,
                    error: Some(err.kind()),
                }),
            )
        }
    }
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

#[cfg(test)]
mod tests {
    use crate::{
        routes::routes::routes, services::upload_service::tests::FakeStorage, state::AppState,
        views::Views,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::{Arc, atomic::Ordering};

    fn server(storage: Arc<FakeStorage>) -> TestServer {
        let state = AppState::new(storage, 1024, Views::new().unwrap());
        TestServer::new(routes(1024).with_state(state)).unwrap()
    }

    #[tokio::test]
    async fn healthz_is_always_ok() {
        let storage = Arc::new(FakeStorage::default());
        storage.fail_list.store(true, Ordering::SeqCst);
        let response = server(storage).get("/healthz").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<serde_json::Value>(), json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readyz_reflects_backend() {
        let storage = Arc::new(FakeStorage::default());
        let response = server(storage.clone()).get("/readyz").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({ "status": "ok", "files": 0 })
        );

        storage.fail_list.store(true, Ordering::SeqCst);
        let response = server(storage).get("/readyz").await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body, json!({ "status": "error", "error": "provisioning" }));
        assert!(!body.to_string().contains("secret-backend-detail"));
    }
}
