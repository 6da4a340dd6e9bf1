use std::collections::HashSet;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use sqlx::SqlitePool;

use maplefile::auth::Requester;
use maplefile::checklist;
use maplefile::db::{default_db_path, open_sqlite_pool};
use maplefile::files;
use maplefile::migrate::{apply_migrations, MIGRATIONS};

#[derive(Debug, Parser)]
#[command(name = "maplefile", about = "Immigration case file engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance and inspection commands.
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Report applied migrations and per-file checklist progress.
    Status {
        /// Emit a machine-readable JSON report instead of the table view.
        #[arg(long)]
        json: bool,
    },
    /// Apply any pending schema migrations.
    Migrate,
}

#[tokio::main]
async fn main() {
    maplefile::init_logging();

    let cli = Cli::parse();
    match handle_cli(cli.command).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

async fn handle_cli(command: Commands) -> Result<i32> {
    match command {
        Commands::Db(db) => handle_db_command(db).await,
    }
}

async fn handle_db_command(command: DbCommand) -> Result<i32> {
    match command {
        DbCommand::Status { json } => handle_db_status(json).await,
        DbCommand::Migrate => handle_db_migrate().await,
    }
}

#[derive(serde::Serialize)]
struct FileProgress {
    file_number: String,
    is_active: bool,
    completed: u32,
    total: u32,
    percentage: f64,
}

async fn applied_set(pool: &SqlitePool) -> Result<HashSet<String>> {
    let exists: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
    )
    .fetch_optional(pool)
    .await?;
    if exists.is_none() {
        return Ok(HashSet::new());
    }

    let versions: Vec<String> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await?;
    Ok(versions.into_iter().collect())
}

async fn collect_progress(pool: &SqlitePool) -> Result<Vec<FileProgress>> {
    let staff = Requester::staff("maintenance-cli");
    let mut rows = Vec::new();
    for file in files::list_files(pool, &staff).await? {
        let items = checklist::list_items(pool, &file.id).await?;
        let stats = checklist::compute_stats(&items);
        rows.push(FileProgress {
            file_number: file.file_number,
            is_active: file.is_active,
            completed: stats.completed,
            total: stats.total,
            percentage: stats.percentage,
        });
    }
    Ok(rows)
}

async fn handle_db_status(emit_json: bool) -> Result<i32> {
    let db_path = default_db_path().context("determine database path")?;

    let mut applied = HashSet::new();
    let mut progress = Vec::new();
    if db_path.exists() {
        let pool = open_sqlite_pool(&db_path)
            .await
            .with_context(|| format!("open sqlite database at {}", db_path.display()))?;
        let gathered = async {
            let applied = applied_set(&pool).await?;
            // Per-file progress needs the full schema; a half-migrated
            // database only reports migration state.
            let schema_ready = MIGRATIONS.iter().all(|(name, _)| applied.contains(*name));
            let progress = if schema_ready {
                collect_progress(&pool).await?
            } else {
                Vec::new()
            };
            Ok::<_, anyhow::Error>((applied, progress))
        }
        .await;
        pool.close().await;
        let (gathered_applied, gathered_progress) = gathered?;
        applied = gathered_applied;
        progress = gathered_progress;
    }

    let applied_count = MIGRATIONS
        .iter()
        .filter(|(name, _)| applied.contains(*name))
        .count();
    let head = MIGRATIONS
        .iter()
        .rev()
        .find(|(name, _)| applied.contains(*name))
        .map(|(name, _)| *name)
        .unwrap_or("<none>");

    if emit_json {
        let payload = json!({
            "db_path": db_path.display().to_string(),
            "migrations": {
                "applied": applied_count,
                "total": MIGRATIONS.len(),
                "head": head,
            },
            "files": progress,
        });
        let serialized =
            serde_json::to_string_pretty(&payload).context("serialize status report")?;
        println!("{serialized}");
    } else {
        println!("DB: {}", db_path.display());
        println!("Applied: {}/{}", applied_count, MIGRATIONS.len());
        println!("Head: {}", head);
        if progress.is_empty() {
            println!("\nFiles: none");
        } else {
            println!("\nFiles:");
            println!("{:<28} {:<7} Progress", "File number", "Active");
            for row in &progress {
                println!(
                    "{:<28} {:<7} {}/{} ({:.1}%)",
                    row.file_number,
                    if row.is_active { "yes" } else { "no" },
                    row.completed,
                    row.total,
                    row.percentage
                );
            }
        }
    }

    Ok(0)
}

async fn handle_db_migrate() -> Result<i32> {
    let db_path = default_db_path().context("determine database path")?;
    let pool = open_sqlite_pool(&db_path)
        .await
        .with_context(|| format!("open sqlite database at {}", db_path.display()))?;
    let result = apply_migrations(&pool).await;
    pool.close().await;
    result.context("apply migrations")?;

    println!("Migrations applied. Database at {}", db_path.display());
    Ok(0)
}
