//! API Handlers Module
//!
//! Request handlers for the HTTP surface. Pipeline failures become
//! `{success: false, error}` bodies with a status code per error kind;
//! nothing panics across the handler boundary.

use axum::{extract::State, http::StatusCode, response::Json};
use sqlsage_core::{QueryService, ServiceError};
use std::sync::Arc;

use crate::models::{ErrorResponse, HealthResponse, HealthServices, QueryRequest, QueryResponse};

/// Shared state handed to every handler
pub struct ApiState {
    /// Query pipeline context
    pub service: Arc<QueryService>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let services = HealthServices {
        schema_loaded: state.service.schema_loaded(),
        completion_configured: !state.service.config().api_key.trim().is_empty(),
    };
    let status = if services.schema_loaded && services.completion_configured {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        services,
    })
}

/// Run one question through the pipeline
pub async fn handle_query(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let question = request.query.trim();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Query cannot be empty")),
        ));
    }

    tracing::debug!("Handling query: {question}");

    match state.service.process(question).await {
        Ok(outcome) => Ok(Json(QueryResponse::from(outcome))),
        Err(e) => {
            tracing::error!("Failed to process query: {e}");
            Err((error_status(&e), Json(ErrorResponse::new(e.to_string()))))
        }
    }
}

fn error_status(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Transport(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Config(_)
        | ServiceError::Database(_)
        | ServiceError::Skipped(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use sqlsage_core::{AppConfig, StubBackend};
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn seed_database() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE tickets (id INTEGER PRIMARY KEY, location TEXT NOT NULL);
             INSERT INTO tickets (id, location) VALUES (1, 'X'), (2, 'X');",
        )
        .unwrap();
        file
    }

    fn state_with_stub(db_path: PathBuf, responses: Vec<String>) -> Arc<ApiState> {
        let config = AppConfig {
            api_key: "test-key".to_string(),
            db_path,
            base_url: "https://api.example.com/v1".to_string(),
            model: "test-model".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            history_path: None,
        };
        let backend = Arc::new(StubBackend::with_responses(responses));
        Arc::new(ApiState {
            service: Arc::new(QueryService::with_backend(config, backend)),
        })
    }

    #[tokio::test]
    async fn test_handle_query_success() {
        let db = seed_database();
        let state = state_with_stub(
            db.path().to_path_buf(),
            vec![
                "SELECT COUNT(*) AS n FROM tickets WHERE location='X'".to_string(),
                "Location X has 2 tickets.".to_string(),
                "What about other locations?".to_string(),
            ],
        );

        let response = handle_query(
            State(state),
            Json(QueryRequest {
                query: "How many tickets are in Location X".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(response.0.success);
        assert_eq!(response.0.columns, vec!["n"]);
        assert_eq!(response.0.results[0]["n"], serde_json::json!(2));
        assert_eq!(response.0.explanation, "Location X has 2 tickets.");
        assert!(!response.0.followup_questions.is_empty());
    }

    #[tokio::test]
    async fn test_handle_query_rejects_blank_input() {
        let db = seed_database();
        let state = state_with_stub(db.path().to_path_buf(), vec!["SELECT 1".to_string()]);

        let err = handle_query(
            State(state),
            Json(QueryRequest {
                query: "   ".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(!err.1 .0.success);
    }

    #[tokio::test]
    async fn test_handle_query_maps_extraction_failure() {
        let db = seed_database();
        let state = state_with_stub(
            db.path().to_path_buf(),
            vec!["DROP TABLE tickets;".to_string()],
        );

        let err = handle_query(
            State(state),
            Json(QueryRequest {
                query: "remove everything".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_health_reflects_schema_state() {
        let db = seed_database();
        let state = state_with_stub(db.path().to_path_buf(), vec!["SELECT 1".to_string()]);
        let healthy = health_check(State(state)).await;
        assert_eq!(healthy.0.status, "healthy");
        assert!(healthy.0.services.schema_loaded);

        let missing = state_with_stub(
            PathBuf::from("/nonexistent/sqlsage.db"),
            vec!["SELECT 1".to_string()],
        );
        let degraded = health_check(State(missing)).await;
        assert_eq!(degraded.0.status, "degraded");
        assert!(!degraded.0.services.schema_loaded);
    }
}
