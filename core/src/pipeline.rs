//! Query Pipeline Module
//!
//! [`QueryService`] is the explicitly constructed context object every
//! front end shares: configuration, the schema loaded once at
//! construction, the prebuilt schema prompt, and the completion
//! backend. One `process` call runs the full pipeline for a single
//! independent request; stage methods stay public so presentation
//! layers can drive individual steps.

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::executor::{self, QueryRows, SqlResult};
use crate::explain::{self, Explanation};
use crate::followup;
use crate::generator;
use crate::llm::{ChatBackend, LlmClient};
use crate::prompt;
use crate::schema::{self, SchemaMap};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tracing::{debug, info};

/// Aggregate answer for one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub question: String,
    pub sql: String,
    pub columns: Vec<String>,
    /// Rows flattened to column→value records
    pub results: Vec<Map<String, JsonValue>>,
    pub explanation: String,
    pub followup_questions: Vec<String>,
}

/// Shared pipeline context; immutable after construction
pub struct QueryService {
    config: AppConfig,
    schema: SchemaMap,
    schema_block: String,
    backend: Arc<dyn ChatBackend>,
}

impl QueryService {
    /// Build the service with the real HTTP backend.
    ///
    /// Validates configuration and introspects the schema eagerly; an
    /// unreadable database leaves the schema empty (logged) rather than
    /// failing construction.
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let backend: Arc<dyn ChatBackend> = Arc::new(LlmClient::from_config(&config)?);
        Ok(Self::with_backend(config, backend))
    }

    /// Build the service around an arbitrary backend (tests, offline)
    pub fn with_backend(config: AppConfig, backend: Arc<dyn ChatBackend>) -> Self {
        let schema = schema::load_schema(&config.db_path);
        let schema_block = prompt::schema_prompt(&schema);
        info!(
            "Query service ready: {} tables, backend={}",
            schema.len(),
            backend.backend_name()
        );
        Self {
            config,
            schema,
            schema_block,
            backend,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn schema(&self) -> &SchemaMap {
        &self.schema
    }

    /// Schema prompt text sent with every generation request
    pub fn schema_block(&self) -> &str {
        &self.schema_block
    }

    pub fn schema_loaded(&self) -> bool {
        !self.schema.is_empty()
    }

    /// Stage 1: question → SELECT statement
    pub async fn generate_sql(&self, question: &str) -> Result<String, ServiceError> {
        generator::generate_sql(self.backend.as_ref(), &self.schema_block, question).await
    }

    /// Stage 2: SELECT statement → tagged result
    pub fn execute(&self, sql: &str) -> SqlResult {
        executor::execute_query(&self.config.db_path, sql)
    }

    /// Stage 3: result + question → explanation
    pub async fn explain(
        &self,
        result: &SqlResult,
        question: &str,
    ) -> Result<Explanation, ServiceError> {
        explain::explain_results(self.backend.as_ref(), result, question).await
    }

    /// Stage 4: result + question → follow-up suggestions (never fails)
    pub async fn followups(&self, rows: &QueryRows, question: &str) -> Vec<String> {
        followup::generate_followups(self.backend.as_ref(), rows, question).await
    }

    /// Run the full pipeline for one independent request.
    ///
    /// Stops at the first failing stage; the error identifies which
    /// component failed.
    pub async fn process(&self, question: &str) -> Result<QueryOutcome, ServiceError> {
        let sql = self.generate_sql(question).await?;
        debug!("Pipeline: SQL generated");

        let result = self.execute(&sql);
        let rows = match &result {
            SqlResult::Success(rows) => rows.clone(),
            SqlResult::Failure { error } => {
                return Err(ServiceError::Database(error.clone()));
            }
        };
        debug!("Pipeline: query executed ({} rows)", rows.rows.len());

        let explanation = self.explain(&result, question).await?;
        debug!("Pipeline: results explained");

        let followup_questions = self.followups(&rows, question).await;

        Ok(QueryOutcome {
            question: question.to_string(),
            sql,
            columns: rows.columns.clone(),
            results: rows.records(),
            explanation: explanation.text,
            followup_questions,
        })
    }
}
