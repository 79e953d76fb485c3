//! Axum web server for lookups and artifacts

use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use verbach_browser::screenshot::AFTER_FILL_CAPTURE;
use verbach_browser::Verifier;
use verbach_core::{
    VerbachConfig, VerbachError, VerificationPayload, VerificationRequest, VerificationResult,
};

/// Shared application state
pub struct AppState {
    pub verifier: Arc<dyn Verifier>,
    pub config: Arc<VerbachConfig>,
}

pub type SharedState = Arc<AppState>;

/// Build the application router
pub fn router(state: SharedState) -> Router {
    let prints_prefix = format!(
        "/{}",
        state.config.artifacts.public_prefix.trim_matches('/')
    );
    let prints = ServeDir::new(&state.config.artifacts.dir);

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/consulta-bachillerato", post(lookup))
        .route("/debug/screenshot", get(debug_screenshot))
        .nest_service(&prints_prefix, prints)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until the process is stopped
pub async fn serve(state: SharedState, addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// POST /api/consulta-bachillerato - run one lookup
async fn lookup(
    State(app): State<SharedState>,
    payload: Result<Json<VerificationPayload>, JsonRejection>,
) -> Result<Json<VerificationResult>, ApiError> {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        // A form post or bare POST carries no fields at all
        Err(JsonRejection::MissingJsonContentType(_)) => VerificationPayload::default(),
        Err(rejection) => {
            warn!("Rejected lookup body: {}", rejection.body_text());
            return Err(ApiError(VerbachError::InvalidInput(format!(
                "Invalid JSON body: {}",
                rejection.body_text()
            ))));
        }
    };

    let request = VerificationRequest::try_from(payload).map_err(|e| {
        warn!("Rejected lookup: {}", e);
        ApiError(e)
    })?;

    let span = info_span!(
        "lookup",
        request_id = %Uuid::new_v4(),
        document = %request.identifier()
    );

    async move {
        info!("Lookup requested");
        if let Some(birth_date) = request.birth_date() {
            info!("Birth date supplied: {}", birth_date);
        }

        let result = app.verifier.verify(&request).await?;
        Ok::<_, ApiError>(Json(result))
    }
    .instrument(span)
    .await
}

/// GET /debug/screenshot - latest capture taken when no result appeared
async fn debug_screenshot(State(app): State<SharedState>) -> Response {
    let path = app.config.artifacts.dir.join(AFTER_FILL_CAPTURE);

    match tokio::fs::read(&path).await {
        Ok(data) => ([(header::CONTENT_TYPE, "image/png")], data).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Debug screenshot not found" })),
        )
            .into_response(),
    }
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "verbach"
    }))
}

/// GET / - service description
async fn index(State(app): State<SharedState>) -> Json<serde_json::Value> {
    let prints = app.config.artifacts.public_prefix.trim_end_matches('/');
    Json(json!({
        "message": "verbach - MEC diploma verification API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "lookup": "POST /api/consulta-bachillerato",
            "downloads": format!("GET {}/:filename", prints),
            "health": "GET /api/health",
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use verbach_core::{Result, Stage};

    /// Answers every lookup with a canned outcome and remembers the requests
    struct CannedVerifier {
        fail: bool,
        seen: Mutex<Vec<VerificationRequest>>,
    }

    impl CannedVerifier {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Verifier for CannedVerifier {
        async fn verify(&self, request: &VerificationRequest) -> Result<VerificationResult> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(VerbachError::Automation {
                    stage: Stage::AwaitResult,
                    message: "No result appeared after filling the form fields.".to_string(),
                });
            }
            Ok(VerificationResult::not_validated(
                request.identifier(),
                "No se encontraron resultados",
            ))
        }
    }

    fn state_with(verifier: Arc<CannedVerifier>, temp_dir: &TempDir) -> SharedState {
        let mut config = VerbachConfig::default();
        config.artifacts.dir = temp_dir.path().to_path_buf();
        Arc::new(AppState {
            verifier,
            config: Arc::new(config),
        })
    }

    async fn send(state: SharedState, request: Request<Body>) -> Response {
        router(state).oneshot(request).await.unwrap()
    }

    fn post_lookup(content_type: Option<&str>, body: &'static str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/consulta-bachillerato");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_success() {
        let temp_dir = TempDir::new().unwrap();
        let verifier = CannedVerifier::new(false);
        let state = state_with(Arc::clone(&verifier), &temp_dir);

        let payload = VerificationPayload {
            identifier: Some(" 0000000 ".to_string()),
            birth_date: Some("".to_string()),
        };
        let response = lookup(State(state), Ok(Json(payload))).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "NOT_VALIDATED");
        assert_eq!(body["identifier"], "0000000");
        assert!(body["artifactUrl"].is_null());

        let seen = verifier.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].birth_date().is_none());
    }

    #[tokio::test]
    async fn test_blank_identifier_is_bad_request() {
        let temp_dir = TempDir::new().unwrap();
        let verifier = CannedVerifier::new(false);
        let state = state_with(Arc::clone(&verifier), &temp_dir);

        let payload = VerificationPayload {
            identifier: Some("   ".to_string()),
            birth_date: None,
        };
        let response = lookup(State(state), Ok(Json(payload))).await.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ERROR");
        assert_eq!(body["error"], "Identifier is required");
        assert!(verifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_agent_failure_is_server_error_with_details() {
        let temp_dir = TempDir::new().unwrap();
        let state = state_with(CannedVerifier::new(true), &temp_dir);

        let payload = VerificationPayload {
            identifier: Some("1234567".to_string()),
            birth_date: None,
        };
        let response = lookup(State(state), Ok(Json(payload))).await.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to process lookup");
        assert_eq!(body["status"], "ERROR");
        assert!(body["details"]
            .as_str()
            .unwrap()
            .starts_with("Automation failed: No result appeared"));
    }

    #[tokio::test]
    async fn test_debug_screenshot_missing() {
        let temp_dir = TempDir::new().unwrap();
        let state = state_with(CannedVerifier::new(false), &temp_dir);

        let response = debug_screenshot(State(state)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_debug_screenshot_served() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(AFTER_FILL_CAPTURE), b"\x89PNG").unwrap();
        let state = state_with(CannedVerifier::new(false), &temp_dir);

        let response = debug_screenshot(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let temp_dir = TempDir::new().unwrap();
        let state = state_with(CannedVerifier::new(false), &temp_dir);

        let Json(body) = index(State(state)).await;
        assert_eq!(body["endpoints"]["downloads"], "GET /prints/:filename");
    }

    #[tokio::test]
    async fn test_bare_post_is_json_bad_request() {
        let temp_dir = TempDir::new().unwrap();
        let verifier = CannedVerifier::new(false);
        let state = state_with(Arc::clone(&verifier), &temp_dir);

        let response = send(state, post_lookup(None, "")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Identifier is required");
        assert_eq!(body["status"], "ERROR");
        assert!(verifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_json_bad_request() {
        let temp_dir = TempDir::new().unwrap();
        let verifier = CannedVerifier::new(false);
        let state = state_with(Arc::clone(&verifier), &temp_dir);

        let response = send(state, post_lookup(Some("application/json"), "{\"identifier\":")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ERROR");
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
        assert!(verifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_router_accepts_legacy_field_names() {
        let temp_dir = TempDir::new().unwrap();
        let verifier = CannedVerifier::new(false);
        let state = state_with(Arc::clone(&verifier), &temp_dir);

        let response = send(
            state,
            post_lookup(
                Some("application/json"),
                r#"{"bachillerato":"0000000","fechaNacimiento":"01/02/2003"}"#,
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["identifier"], "0000000");
        let seen = verifier.seen.lock().unwrap();
        assert_eq!(seen[0].birth_date(), Some("01/02/2003"));
    }

    #[tokio::test]
    async fn test_prints_served_byte_for_byte() {
        let temp_dir = TempDir::new().unwrap();
        let pdf = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj\n";
        std::fs::write(temp_dir.path().join("bachillerato_1234567_1700000000000.pdf"), pdf).unwrap();
        let state = state_with(CannedVerifier::new(false), &temp_dir);

        let response = send(state, get("/prints/bachillerato_1234567_1700000000000.pdf")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], &pdf[..]);
    }

    #[tokio::test]
    async fn test_missing_print_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let state = state_with(CannedVerifier::new(false), &temp_dir);

        let response = send(state, get("/prints/missing.pdf")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prints_prefix_is_normalized() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"%PDF").unwrap();
        let mut config = VerbachConfig::default();
        config.artifacts.dir = temp_dir.path().to_path_buf();
        config.artifacts.public_prefix = "prints/".to_string();
        let state = Arc::new(AppState {
            verifier: CannedVerifier::new(false),
            config: Arc::new(config),
        });

        let response = send(state, get("/prints/a.pdf")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_through_router_allows_any_origin() {
        let temp_dir = TempDir::new().unwrap();
        let state = state_with(CannedVerifier::new(false), &temp_dir);

        let request = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "https://verbach.example")
            .body(Body::empty())
            .unwrap();
        let response = send(state, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        let body = body_json(response).await;
        assert_eq!(body["service"], "verbach");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }
}
