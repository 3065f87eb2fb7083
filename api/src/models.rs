//! API Models Module
//!
//! Request and response shapes for the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sqlsage_core::{AppConfig, QueryOutcome};

/// Server bind configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl From<&AppConfig> for ApiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Body of `POST /api/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Successful response of `POST /api/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub results: Vec<Map<String, JsonValue>>,
    pub columns: Vec<String>,
    pub explanation: String,
    pub followup_questions: Vec<String>,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        Self {
            success: true,
            results: outcome.results,
            columns: outcome.columns,
            explanation: outcome.explanation,
            followup_questions: outcome.followup_questions,
        }
    }
}

/// Failure body for any endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Per-service readiness flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthServices {
    pub schema_loaded: bool,
    pub completion_configured: bool,
}

/// Response of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: HealthServices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_serializes_with_success_false() {
        let value = serde_json::to_value(ErrorResponse::new("boom")).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "boom");
    }

    #[test]
    fn test_query_response_from_outcome() {
        let outcome = QueryOutcome {
            question: "q".to_string(),
            sql: "SELECT 1".to_string(),
            columns: vec!["n".to_string()],
            results: vec![],
            explanation: "none".to_string(),
            followup_questions: vec!["next?".to_string()],
        };

        let response = QueryResponse::from(outcome);
        assert!(response.success);
        assert_eq!(response.columns, vec!["n"]);
        assert_eq!(response.followup_questions, vec!["next?"]);
    }
}
