//! SQL Generation Module
//!
//! Turns a natural-language question into a single SELECT statement via
//! one chat-completion call, then applies the syntactic acceptance
//! guard: strip Markdown fences and keep the text only if it starts
//! with `SELECT` (case-insensitive). The guard is deliberately no
//! stronger than that; it does not validate against the schema.

use crate::error::ServiceError;
use crate::llm::{ChatBackend, ChatMessage, CompletionRequest};
use crate::prompt;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Token budget for the generation call
pub const SQL_MAX_TOKENS: u32 = 500;
/// Low temperature keeps the statement deterministic
pub const SQL_TEMPERATURE: f64 = 0.1;

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)```(?:sql)?").expect("valid fence pattern"))
}

/// Extract a SELECT statement from raw model output.
///
/// Markdown code fences are removed and surrounding whitespace trimmed;
/// anything that does not then start with `SELECT` is rejected.
pub fn extract_sql(content: &str) -> Result<String, ServiceError> {
    let cleaned = fence_pattern().replace_all(content, "");
    let cleaned = cleaned.trim();

    let starts_with_select = cleaned
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"));
    if starts_with_select {
        Ok(cleaned.to_string())
    } else {
        let preview: String = content.chars().take(80).collect();
        Err(ServiceError::Extraction(preview))
    }
}

/// Ask the model for a SQL statement answering `question` over the
/// schema described by `schema_block`.
pub async fn generate_sql(
    backend: &dyn ChatBackend,
    schema_block: &str,
    question: &str,
) -> Result<String, ServiceError> {
    info!("Generating SQL for question: {question}");

    let request = CompletionRequest {
        messages: vec![
            ChatMessage::system(prompt::sql_system_prompt(schema_block)),
            ChatMessage::user(question),
        ],
        max_tokens: SQL_MAX_TOKENS,
        temperature: SQL_TEMPERATURE,
    };

    let content = backend.complete(&request).await?;
    let sql = extract_sql(&content)?;
    debug!("Extracted SQL: {sql}");
    Ok(sql)
}
