//! Named-Entity Extraction Module
//!
//! Best-effort, rule-based extraction over flattened query results.
//! The output only enriches the explanation prompt; an empty entity
//! list is a valid outcome, never an error. Three rules: ISO dates,
//! numeric quantities, and capitalized name tokens.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Upper bound on entities passed into the explanation prompt
const MAX_ENTITIES: usize = 20;

/// One extracted entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
}

fn date_pattern() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid date pattern"))
}

fn quantity_pattern() -> &'static Regex {
    static QUANTITY: OnceLock<Regex> = OnceLock::new();
    QUANTITY.get_or_init(|| Regex::new(r"\b\d+(?:\.\d+)?\b").expect("valid quantity pattern"))
}

fn name_pattern() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid name pattern"))
}

/// Extract entities from `text` in first-seen order, deduplicated.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let mut entities: Vec<Entity> = Vec::new();
    let mut date_spans: Vec<(usize, usize)> = Vec::new();

    for m in date_pattern().find_iter(text) {
        date_spans.push((m.start(), m.end()));
        push_unique(&mut entities, m.as_str(), "DATE");
    }

    for m in quantity_pattern().find_iter(text) {
        // Digits inside a date are already covered by the DATE rule
        let inside_date = date_spans
            .iter()
            .any(|&(start, end)| m.start() >= start && m.end() <= end);
        if !inside_date {
            push_unique(&mut entities, m.as_str(), "QUANTITY");
        }
    }

    for m in name_pattern().find_iter(text) {
        push_unique(&mut entities, m.as_str(), "NAME");
    }

    entities.truncate(MAX_ENTITIES);
    debug!("Extracted {} entities", entities.len());
    entities
}

fn push_unique(entities: &mut Vec<Entity>, text: &str, label: &str) {
    if !entities.iter().any(|e| e.text == text && e.label == label) {
        entities.push(Entity {
            text: text.to_string(),
            label: label.to_string(),
        });
    }
}
