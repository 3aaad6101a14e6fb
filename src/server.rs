/// HTTP surface: the verification API
///
/// Thin boundary over the core pipeline. Every /verify request gets a
/// fresh verification id; input errors map to 400, broken ontology
/// documents to 400, anything unexpected to 500, always with the
/// `{error, type, verification_id}` envelope. A completed verification is
/// 200 whether or not constraints were satisfied.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use uuid::Uuid;

use crate::errors::VeritextError;
use crate::ontology::store::OntologyStore;
use crate::verify;

#[derive(Clone)]
pub struct AppState {
    store: Arc<OntologyStore>,
}

/// Build the application router.
pub fn router(store: Arc<OntologyStore>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/verify", post(verify_handler))
        .route("/ontologies", get(list_ontologies))
        .route("/ontologies/{name}", get(get_ontology))
        .layer(cors)
        .with_state(AppState { store })
}

/// CORS layer from the comma-separated origin list; `*` allows any origin.
pub fn cors_layer(origins: &str) -> CorsLayer {
    let configured: Vec<&str> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ]);

    if configured.is_empty() || configured.contains(&"*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = configured
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    llm_output: String,
    #[serde(default = "default_ontology_name")]
    ontology: String,
}

fn default_ontology_name() -> String {
    "example".to_string()
}

async fn verify_handler(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let verification_id = Uuid::new_v4().to_string();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid JSON in request body",
                "BadRequest",
                &verification_id,
            );
        }
    };

    if request.llm_output.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "llm_output is required",
            "Validation",
            &verification_id,
        );
    }

    tracing::info!(
        verification_id = %verification_id,
        ontology = %request.ontology,
        "verifying"
    );

    let ontology = match state.store.load(&request.ontology) {
        Ok(ontology) => ontology,
        Err(e) => {
            tracing::error!(verification_id = %verification_id, error = %e, "ontology load failed");
            let (status, kind) = classify(&e);
            return error_response(status, &e.to_string(), kind, &verification_id);
        }
    };

    let (facts, outcome) = verify::verify_output(&request.llm_output, &ontology, false);

    tracing::info!(
        verification_id = %verification_id,
        verified = outcome.verified,
        violations = outcome.violations.len(),
        "verification complete"
    );

    let body = json!({
        "verified": outcome.verified,
        "violations": outcome.violations,
        "parsed_data": facts,
        "ontology": {
            "name": ontology.name,
            "version": ontology.version,
            "constraints_checked": ontology.constraints.len(),
        },
        "proof": outcome.proof,
        "verification_id": verification_id,
        "execution_time_ms": outcome.execution_time_ms,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    });

    (StatusCode::OK, Json(body)).into_response()
}

async fn list_ontologies(State(state): State<AppState>) -> Response {
    Json(json!({"ontologies": state.store.list_available()})).into_response()
}

async fn get_ontology(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.store.load(&name) {
        Ok(ontology) => Json(ontology.as_ref()).into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn health() -> Response {
    Json(json!({"status": "healthy", "service": "veritext"})).into_response()
}

async fn root() -> Response {
    Json(json!({
        "service": "veritext",
        "description": "Ontology-driven compliance verification for LLM output",
        "endpoints": {
            "POST /verify": "Verify LLM output against compliance constraints",
            "GET /ontologies": "List available ontologies",
            "GET /ontologies/{name}": "Get ontology definition",
            "GET /health": "Health check",
        },
    }))
    .into_response()
}

fn classify(error: &VeritextError) -> (StatusCode, &'static str) {
    match error {
        VeritextError::Validation { .. } => (StatusCode::BAD_REQUEST, "Validation"),
        VeritextError::OntologyInvalid { .. } => (StatusCode::BAD_REQUEST, "OntologyInvalid"),
        VeritextError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Config"),
        VeritextError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
    }
}

fn error_response(
    status: StatusCode,
    message: &str,
    kind: &str,
    verification_id: &str,
) -> Response {
    (
        status,
        Json(json!({
            "error": message,
            "type": kind,
            "verification_id": verification_id,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let dir = std::env::temp_dir().join("veritext-no-such-dir");
        router(Arc::new(OntologyStore::new(dir)), cors_layer("*"))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "veritext");
    }

    #[tokio::test]
    async fn test_verify_happy_path() {
        let request = post_json(
            "/verify",
            r#"{"llm_output": "DTI: 35, FICO 720, approved"}"#,
        );
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified"], true);
        assert_eq!(body["ontology"]["name"], "mortgage-compliance-v1");
        assert_eq!(body["ontology"]["constraints_checked"], 5);
        assert!(body["verification_id"].is_string());
        assert!(body["execution_time_ms"].is_number());
        assert!(body["timestamp"].is_string());
        assert_eq!(body["parsed_data"]["dti"], 35.0);
    }

    #[tokio::test]
    async fn test_verify_missing_llm_output_is_400() {
        let request = post_json("/verify", r#"{"ontology": "hipaa-v1"}"#);
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "llm_output is required");
        assert!(body["verification_id"].is_string());
    }

    #[tokio::test]
    async fn test_verify_undecodable_body_is_400() {
        let request = post_json("/verify", "{not json");
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "BadRequest");
    }

    #[tokio::test]
    async fn test_list_ontologies() {
        let request = Request::builder()
            .uri("/ontologies")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        let names = body["ontologies"].as_array().unwrap();
        assert!(names.iter().any(|n| n == "mortgage-compliance-v1"));
        assert!(names.iter().any(|n| n == "hipaa-v1"));
    }

    #[tokio::test]
    async fn test_get_ontology_document() {
        let request = Request::builder()
            .uri("/ontologies/fair-lending-v1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "fair-lending-v1");
        assert!(body["constraints"].is_array());
        assert!(body["extractors"].is_object());
    }
}
