//! chatdb CLI
//!
//! Ask questions about a SQLite database, inspect its schema, or serve the HTTP API.

use chatdb::agent::Agent;
use chatdb::config::Config;
use chatdb::db::SqliteDatabase;
use chatdb::llm::LlmClient;
use chatdb::server::{self, AppState};
use chatdb::telemetry::init_tracing;
use chatdb::PipelineResult;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// chatdb - natural language questions over SQL
#[derive(Parser)]
#[command(name = "chatdb")]
#[command(about = "Ask questions about a relational database in plain language", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (overrides CHATDB_CONFIG)
    #[arg(long, env = "CHATDB_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path (overrides database.path)
    #[arg(long, env = "CHATDB_DB")]
    db: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    Ask {
        /// Natural language question
        question: String,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the schema summary
    Schema {
        /// Re-introspect before printing
        #[arg(long)]
        refresh: bool,
    },

    /// List tables, or describe one
    Tables {
        /// Table name
        name: Option<String>,
    },

    /// Start the HTTP API
    Serve {
        /// Bind host (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    match cli.command {
        Commands::Ask { question, json } => {
            cmd_ask(&config, &question, json).await?;
        }
        Commands::Schema { refresh } => {
            cmd_schema(&config, refresh).await?;
        }
        Commands::Tables { name } => {
            cmd_tables(&config, name.as_deref()).await?;
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            cmd_serve(&config, &host, port).await?;
        }
    }

    Ok(())
}

fn open_database(config: &Config) -> anyhow::Result<SqliteDatabase> {
    let path = config.database.resolved_path();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(SqliteDatabase::open(&path)?)
}

fn build_agent(config: &Config) -> anyhow::Result<Agent> {
    let db = open_database(config)?;
    let llm = LlmClient::from_config(&config.llm)?;
    Ok(Agent::new(Arc::new(llm), Arc::new(db), config.agent.clone()))
}

async fn cmd_ask(config: &Config, question: &str, json: bool) -> anyhow::Result<()> {
    let agent = build_agent(config)?;
    let result = agent.process_query(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result)?;
    }
    Ok(())
}

fn print_result(result: &PipelineResult) -> anyhow::Result<()> {
    if let Some(sql) = &result.sql {
        println!("SQL: {}", sql);
        println!();
    }

    if !result.success {
        println!("✗ {}", result.error.as_deref().unwrap_or("Query failed"));
        return Ok(());
    }

    if let Some(answer) = &result.answer {
        println!("{}", answer);
    }

    if let Some(results) = &result.results {
        println!();
        println!("✓ {} rows", results.row_count);
        for row in &results.rows {
            println!("  {}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

async fn cmd_schema(config: &Config, refresh: bool) -> anyhow::Result<()> {
    let agent = build_agent(config)?;
    let snapshot = if refresh {
        agent.refresh_schema().await?
    } else {
        agent.schema().await?
    };
    println!("{}", snapshot.summary());
    Ok(())
}

async fn cmd_tables(config: &Config, name: Option<&str>) -> anyhow::Result<()> {
    let db = open_database(config)?;

    match name {
        Some(table) => {
            let descriptor = db.table_info(table).await?;
            println!("Table: {} ({} rows)", descriptor.name, descriptor.row_count);
            for column in &descriptor.columns {
                let mut flags = Vec::new();
                if column.primary_key {
                    flags.push("PK".to_string());
                }
                if let Some(target) = &column.foreign_key {
                    flags.push(format!("FK->{}", target));
                }
                if !column.nullable {
                    flags.push("NOT NULL".to_string());
                }
                if flags.is_empty() {
                    println!("  - {}: {}", column.name, column.data_type);
                } else {
                    println!("  - {}: {} [{}]", column.name, column.data_type, flags.join(", "));
                }
            }
        }
        None => {
            let tables = db.list_tables().await?;
            println!("✓ {} tables", tables.len());
            for table in tables {
                println!("  {}", table);
            }
        }
    }
    Ok(())
}

async fn cmd_serve(config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    let agent = build_agent(config)?;
    let addr = format!("{}:{}", host, port);

    println!("✓ Serving chatdb API on http://{}", addr);
    println!("  Database: {}", config.database.resolved_path().display());
    println!("  Model: {}", config.llm.model);

    server::serve(&addr, AppState { agent: Arc::new(agent) }).await?;
    Ok(())
}
