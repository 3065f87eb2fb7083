//! Follow-up Question Module
//!
//! Suggests 2-3 next questions after an answered query. The model is
//! asked first; on any transport failure the static suggestion set is
//! used instead, keyed on whether the result set came back empty.

use crate::error::ServiceError;
use crate::executor::QueryRows;
use crate::llm::{ChatBackend, ChatMessage, CompletionRequest};
use crate::prompt;
use tracing::warn;

/// Token budget for the follow-up call
pub const FOLLOWUP_MAX_TOKENS: u32 = 200;
/// Higher temperature keeps the suggestions varied
pub const FOLLOWUP_TEMPERATURE: f64 = 0.7;
/// At most this many suggestions are returned
pub const MAX_FOLLOWUPS: usize = 3;

/// Static suggestions when the model is unavailable
pub fn default_followup_questions(rows: &QueryRows) -> Vec<String> {
    if rows.is_empty() {
        vec![
            "Can you rephrase your query?".to_string(),
            "Would you like to try a different search?".to_string(),
            "Do you want to broaden the search criteria?".to_string(),
        ]
    } else {
        vec![
            "Can you provide more details about these results?".to_string(),
            "What insights can we draw from these results?".to_string(),
            "Are there any specific trends you'd like to explore?".to_string(),
        ]
    }
}

/// Ask the model for follow-up questions, falling back to the static
/// set on failure. Never errors.
pub async fn generate_followups(
    backend: &dyn ChatBackend,
    rows: &QueryRows,
    question: &str,
) -> Vec<String> {
    match try_generate(backend, rows, question).await {
        Ok(questions) if !questions.is_empty() => questions,
        Ok(_) => default_followup_questions(rows),
        Err(e) => {
            warn!("Follow-up generation failed, using defaults: {e}");
            default_followup_questions(rows)
        }
    }
}

async fn try_generate(
    backend: &dyn ChatBackend,
    rows: &QueryRows,
    question: &str,
) -> Result<Vec<String>, ServiceError> {
    let request = CompletionRequest {
        messages: vec![ChatMessage::user(prompt::followup_prompt(
            question,
            &rows.summary_text(),
        ))],
        max_tokens: FOLLOWUP_MAX_TOKENS,
        temperature: FOLLOWUP_TEMPERATURE,
    };

    let content = backend.complete(&request).await?;
    Ok(parse_questions(&content))
}

/// Split model output into clean question lines, capped at
/// [`MAX_FOLLOWUPS`]. List numbering and bullet markers are stripped.
pub fn parse_questions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(MAX_FOLLOWUPS)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*']).trim_start();
    // "1." / "2)" style numbering
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim_start();
        }
    }
    line
}
