//! Prompt Construction Module
//!
//! Every prompt the pipeline sends lives here: the schema description
//! rendered from introspected metadata, the fixed SQL-generation rules,
//! and the explanation/follow-up templates. All functions are pure and
//! deterministic; the schema map iterates in sorted order.

use crate::schema::SchemaMap;
use std::fmt::Write as _;

/// Render the introspected schema as a text block for the model.
///
/// One `Table:` header per table, one line per column with
/// PRIMARY KEY / NOT NULL annotations, and the foreign-key edges.
pub fn schema_prompt(schema: &SchemaMap) -> String {
    let mut prompt = String::from("Database Schema:\n\n");

    for (table_name, info) in schema {
        let _ = writeln!(prompt, "Table: {table_name}");
        prompt.push_str("Columns:\n");
        for col in &info.columns {
            let _ = write!(prompt, "- {} ({})", col.name, col.decl_type);
            if col.primary_key {
                prompt.push_str(" PRIMARY KEY");
            }
            if !col.nullable {
                prompt.push_str(" NOT NULL");
            }
            prompt.push('\n');
        }

        if !info.foreign_keys.is_empty() {
            prompt.push_str("Relationships:\n");
            for fk in &info.foreign_keys {
                if fk.to_column.is_empty() {
                    let _ = writeln!(prompt, "- {}.{} -> {}", table_name, fk.from_column, fk.to_table);
                } else {
                    let _ = writeln!(
                        prompt,
                        "- {}.{} -> {}.{}",
                        table_name, fk.from_column, fk.to_table, fk.to_column
                    );
                }
            }
        }
        prompt.push('\n');
    }

    prompt
}

/// System prompt for the SQL generation call.
///
/// Embeds the schema block and the fixed rule set the model must follow.
pub fn sql_system_prompt(schema_block: &str) -> String {
    format!(
        "You are an expert SQL query generator. Your task is to convert natural language \
queries into valid SQL queries based on the provided database schema.

{schema_block}
Rules for generating SQL queries:
1. Use proper JOIN syntax when relating multiple tables
2. Consider table relationships and use appropriate JOIN conditions
3. Handle NULL values appropriately
4. Use table aliases when necessary for clarity
5. Return only the requested columns, use * only when specifically asked
6. Include WHERE clauses based on the natural language conditions
7. Use appropriate aggregation functions when needed (COUNT, SUM, AVG, etc.)
8. For queries involving date or time ranges (e.g. 'last 2 days', 'since last week'), \
always use the datetime() function supported by SQLite rather than DATE_SUB or \
CURRENT_DATE. Example: SELECT * FROM orders WHERE created_at >= datetime('now', '-2 days');

Return only the SQL query without any explanation."
    )
}

/// System prompt for the explanation call
pub fn explanation_system_prompt() -> &'static str {
    "You are a data interpreter that uses named entities to create a clear, natural \
language explanation. Your job is to make sense of the given entities, summarize key \
insights, and answer the original question. Always provide clear, concise, and direct \
answers to user queries. If no relevant data is available, respond with 'We didn't find \
a response to your query.' Keep responses brief and professional, using no more than \
2-3 sentences, and always align them with the user's original question."
}

/// User prompt for the explanation call
pub fn explanation_user_prompt(question: &str, entities_json: &str, data_summary: &str) -> String {
    format!(
        "Original question: {question}
Extracted Entities:
{entities_json}
Data Summary:
{data_summary}
Based on this information, generate a natural language explanation of the query results."
    )
}

/// User prompt for the follow-up question call
pub fn followup_prompt(question: &str, result_summary: &str) -> String {
    format!(
        "Based on the following query and results, suggest 2-3 relevant follow-up questions:

Original Query: {question}
Query Results: {result_summary}

Generate questions that would provide additional valuable insights.
Return only the questions without any additional text or formatting."
    )
}
