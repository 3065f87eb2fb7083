//! SqlSage CLI
//!
//! Thin presentation layer over the shared pipeline: `serve` starts the
//! HTTP API, `ask` answers one question, `chat` runs an interactive
//! loop with conversation history, `schema` prints the introspected
//! schema prompt.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use sqlsage_api::{ApiConfig, ApiServer};
use sqlsage_core::history::{ChatHistory, EntryRole};
use sqlsage_core::{AppConfig, QueryOutcome, QueryService};

#[derive(Parser)]
#[command(name = "sqlsage", version, about = "Natural-language-to-SQL assistant")]
struct Cli {
    /// Optional TOML config file; environment variables take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Answer a single question and exit
    Ask {
        /// The question, in plain English
        question: Vec<String>,
    },
    /// Interactive chat loop (exit with "quit")
    Chat,
    /// Print the schema prompt built from the configured database
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlsage=info,sqlsage_core=info,sqlsage_api=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path),
        None => AppConfig::from_env(),
    }
    .context("invalid configuration")?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Ask { question } => ask(config, question.join(" ")).await,
        Command::Chat => chat(config).await,
        Command::Schema => schema(config),
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let api_config = ApiConfig::from(&config);
    let service = Arc::new(QueryService::new(config)?);
    ApiServer::new(api_config, service).start().await
}

async fn ask(config: AppConfig, question: String) -> Result<()> {
    let question = question.trim().to_string();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let service = QueryService::new(config)?;
    let outcome = service.process(&question).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn chat(config: AppConfig) -> Result<()> {
    let mut history = match &config.history_path {
        Some(path) => ChatHistory::with_persistence(path),
        None => ChatHistory::new(),
    };

    let service = QueryService::new(config)?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("sqlsage chat: ask about your data, type 'quit' to exit");
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "quit" | "exit" | "q") {
            break;
        }

        history.add_entry(EntryRole::User, question, None, None);

        match service.process(question).await {
            Ok(outcome) => {
                print_outcome(&outcome);
                history.add_entry(
                    EntryRole::Assistant,
                    outcome.explanation.clone(),
                    Some(outcome.sql.clone()),
                    Some(outcome_rows(&outcome)),
                );
            }
            Err(e) => {
                eprintln!("error: {e}");
                history.add_entry(EntryRole::Assistant, format!("error: {e}"), None, None);
            }
        }
    }

    Ok(())
}

fn schema(config: AppConfig) -> Result<()> {
    let schema = sqlsage_core::schema::load_schema(&config.db_path);
    if schema.is_empty() {
        eprintln!("no tables found in {}", config.db_path.display());
    }
    print!("{}", sqlsage_core::prompt::schema_prompt(&schema));
    Ok(())
}

fn print_outcome(outcome: &QueryOutcome) {
    println!("sql: {}", outcome.sql);

    if outcome.results.is_empty() {
        println!("(no rows)");
    } else {
        println!("{}", outcome.columns.join(" | "));
        for record in &outcome.results {
            let cells: Vec<String> = outcome
                .columns
                .iter()
                .map(|c| {
                    record
                        .get(c)
                        .map(render_cell)
                        .unwrap_or_default()
                })
                .collect();
            println!("{}", cells.join(" | "));
        }
    }

    println!("\n{}", outcome.explanation);

    if !outcome.followup_questions.is_empty() {
        println!("\nfollow-ups:");
        for question in &outcome.followup_questions {
            println!("  - {question}");
        }
    }
}

fn outcome_rows(outcome: &QueryOutcome) -> sqlsage_core::QueryRows {
    let rows = outcome
        .results
        .iter()
        .map(|record| {
            outcome
                .columns
                .iter()
                .map(|c| record.get(c).cloned().unwrap_or(serde_json::Value::Null))
                .collect()
        })
        .collect();
    sqlsage_core::QueryRows {
        columns: outcome.columns.clone(),
        rows,
    }
}

fn render_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
