//! Explanation Generation Module
//!
//! Turns query results back into a natural-language answer. A failed
//! upstream result short-circuits before any entity extraction or
//! model call; a successful one is flattened to records, enriched with
//! extracted entities, and summarized by one chat-completion call.

use crate::entities::{extract_entities, Entity};
use crate::error::ServiceError;
use crate::executor::SqlResult;
use crate::llm::{ChatBackend, ChatMessage, CompletionRequest};
use crate::prompt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Token budget for the explanation call
pub const EXPLAIN_MAX_TOKENS: u32 = 500;
/// Temperature for the explanation call
pub const EXPLAIN_TEMPERATURE: f64 = 0.3;

/// Natural-language explanation plus the entities that informed it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub text: String,
    pub entities: Vec<Entity>,
}

/// Explain `result` in the context of the original `question`.
///
/// Returns [`ServiceError::Skipped`] without touching the backend when
/// the query step already failed.
pub async fn explain_results(
    backend: &dyn ChatBackend,
    result: &SqlResult,
    question: &str,
) -> Result<Explanation, ServiceError> {
    let rows = match result {
        SqlResult::Success(rows) => rows,
        SqlResult::Failure { error } => {
            debug!("Skipping explanation; query already failed: {error}");
            return Err(ServiceError::Skipped(format!("query failed: {error}")));
        }
    };

    let data_summary = rows.summary_text();
    let entities = extract_entities(&data_summary);
    let entities_json =
        serde_json::to_string_pretty(&entities).unwrap_or_else(|_| "[]".to_string());

    let request = CompletionRequest {
        messages: vec![
            ChatMessage::system(prompt::explanation_system_prompt()),
            ChatMessage::user(prompt::explanation_user_prompt(
                question,
                &entities_json,
                &data_summary,
            )),
        ],
        max_tokens: EXPLAIN_MAX_TOKENS,
        temperature: EXPLAIN_TEMPERATURE,
    };

    let text = backend.complete(&request).await?;
    info!("Generated explanation ({} chars)", text.len());
    Ok(Explanation { text, entities })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::QueryRows;
    use crate::llm::StubBackend;
    use serde_json::Value as JsonValue;

    fn success_result() -> SqlResult {
        SqlResult::Success(QueryRows {
            columns: vec!["location".to_string(), "ticket_count".to_string()],
            rows: vec![vec![JsonValue::from("Harbor East"), JsonValue::from(12)]],
        })
    }

    #[tokio::test]
    async fn test_failed_result_never_calls_backend() {
        let stub = StubBackend::with_response("should not be used");
        let failed = SqlResult::Failure {
            error: "no such table: tickets".to_string(),
        };

        let err = explain_results(&stub, &failed, "How many tickets?")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "skipped");
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_result_produces_explanation() {
        let stub = StubBackend::with_response("Harbor East has 12 tickets.");
        let explanation = explain_results(&stub, &success_result(), "How many tickets?")
            .await
            .unwrap();

        assert_eq!(explanation.text, "Harbor East has 12 tickets.");
        assert_eq!(stub.call_count(), 1);
        assert!(explanation
            .entities
            .iter()
            .any(|e| e.text == "12" && e.label == "QUANTITY"));
        assert!(explanation.entities.iter().any(|e| e.label == "NAME"));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        struct FailingBackend;

        #[async_trait::async_trait]
        impl ChatBackend for FailingBackend {
            async fn complete(
                &self,
                _request: &CompletionRequest,
            ) -> Result<String, ServiceError> {
                Err(ServiceError::Transport("connection refused".to_string()))
            }

            fn backend_name(&self) -> &str {
                "failing"
            }
        }

        let err = explain_results(&FailingBackend, &success_result(), "q")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transport");
    }
}
