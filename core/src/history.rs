//! Conversation History Module
//!
//! Ordered record of user/assistant turns, owned by the presentation
//! layer rather than the pipeline. Persistence to a JSON file is
//! optional and best-effort: load tolerates a missing or corrupt file,
//! save failures are logged and never fail the request.

use crate::executor::QueryRows;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Speaker of one conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryRole {
    User,
    Assistant,
}

/// One turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: Uuid,
    pub role: EntryRole,
    pub content: String,
    pub sql_query: Option<String>,
    pub results: Option<QueryRows>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only conversation log with optional disk persistence
pub struct ChatHistory {
    entries: Vec<ConversationEntry>,
    path: Option<PathBuf>,
}

impl ChatHistory {
    /// In-memory history, nothing written to disk
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            path: None,
        }
    }

    /// History backed by a JSON file; existing contents are loaded
    pub fn with_persistence<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load_entries(&path);
        Self {
            entries,
            path: Some(path),
        }
    }

    fn load_entries(path: &Path) -> Vec<ConversationEntry> {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring corrupt history file {}: {e}", path.display());
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Failed to read history file {}: {e}", path.display());
                Vec::new()
            }
        }
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let serialized = match serde_json::to_string(&self.entries) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize chat history: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(path, serialized) {
            warn!("Failed to save chat history to {}: {e}", path.display());
        }
    }

    /// Append one turn; returns the new entry's id
    pub fn add_entry(
        &mut self,
        role: EntryRole,
        content: impl Into<String>,
        sql_query: Option<String>,
        results: Option<QueryRows>,
    ) -> Uuid {
        let entry = ConversationEntry {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            sql_query,
            results,
            timestamp: Utc::now(),
        };
        let id = entry.id;
        debug!("Recorded {:?} turn {id}", role);
        self.entries.push(entry);
        self.save();
        id
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&ConversationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// The entry plus its immediate successor (a query/response pair)
    pub fn conversation_pair(&self, id: Uuid) -> Vec<&ConversationEntry> {
        match self.entries.iter().position(|e| e.id == id) {
            Some(index) => self.entries[index..].iter().take(2).collect(),
            None => Vec::new(),
        }
    }

    /// Case-insensitive substring search over entry content
    pub fn search(&self, query: &str) -> Vec<&ConversationEntry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .collect()
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new()
    }
}
