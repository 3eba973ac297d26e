//! CLI administration tool for api-warden.
//!
//! Provides commands for managing the audit trail and checking backend
//! connectivity without requiring HTTP API access.
//!
//! # Usage
//!
//! ```bash
//! # Create the audit_logs table and its indexes
//! cargo run --bin admin -- audit init
//!
//! # Delete audit data older than the retention window
//! cargo run --bin admin -- audit cleanup
//!
//! # Delete audit data older than 30 days without prompting
//! cargo run --bin admin -- audit cleanup --days 30 --yes
//!
//! # Show per-day audit file sizes and entry counts
//! cargo run --bin admin -- audit stats
//!
//! # Check backend connections
//! cargo run --bin admin -- db check
//! cargo run --bin admin -- redis check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection (required for `audit init`, `db`)
//! - `REDIS_URL`: Redis connection (required for `redis check`)
//! - `AUDIT_LOG_DIR`, `AUDIT_RETENTION_DAYS`: audit file sink settings
//!
//! # Features
//!
//! - **Audit Management**: Schema setup, retention cleanup, file statistics
//! - **Backend Tools**: Database and Redis connection checks
//! - **Interactive Prompts**: Confirmation dialog before destructive cleanup
//! - **Colored Output**: Terminal-friendly formatting using `colored` crate

use api_warden::config::SecurityConfig;
use api_warden::domain::repositories::AuditRepository;
use api_warden::infrastructure::counters::{CounterStore, RedisCounterStore};
use api_warden::infrastructure::persistence::{FileAuditLog, PgAuditRepository};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing api-warden.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage the audit trail
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Redis operations
    Redis {
        #[command(subcommand)]
        action: RedisAction,
    },
}

/// Audit trail subcommands.
#[derive(Subcommand)]
enum AuditAction {
    /// Create the audit_logs table and its indexes
    Init,

    /// Delete audit files and rows older than the retention window
    Cleanup {
        /// Retention window in days (default: AUDIT_RETENTION_DAYS)
        #[arg(short, long)]
        days: Option<u32>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show per-day audit file entry counts and sizes
    Stats,
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

/// Redis operation subcommands.
#[derive(Subcommand)]
enum RedisAction {
    /// Check Redis connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = SecurityConfig::from_env();

    match cli.command {
        Commands::Audit { action } => handle_audit_action(action, &config).await?,
        Commands::Db { action } => handle_db_action(action, &config).await?,
        Commands::Redis { action } => handle_redis_action(action, &config).await?,
    }

    Ok(())
}

/// Connects to the configured database, failing when none is set.
async fn connect(config: &SecurityConfig) -> Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;

    PgPool::connect(url)
        .await
        .context("Failed to connect to database")
}

/// Dispatches audit trail commands.
async fn handle_audit_action(action: AuditAction, config: &SecurityConfig) -> Result<()> {
    match action {
        AuditAction::Init => init_audit_schema(config).await?,
        AuditAction::Cleanup { days, yes } => cleanup_audit(config, days, yes).await?,
        AuditAction::Stats => audit_stats(config).await?,
    }

    Ok(())
}

/// Creates the audit table and indexes.
async fn init_audit_schema(config: &SecurityConfig) -> Result<()> {
    println!("{}", "🗄️  Initialize Audit Schema".bright_blue().bold());
    println!();

    let pool = connect(config).await?;
    let repo = PgAuditRepository::new(Arc::new(pool));

    repo.init_schema()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize schema: {}", e))?;

    println!("{}", "✅ audit_logs table ready".green().bold());
    println!();

    Ok(())
}

/// Deletes audit data older than the retention window with confirmation.
///
/// # Flow
///
/// 1. Resolve the window (`--days` or `AUDIT_RETENTION_DAYS`)
/// 2. Confirm deletion (unless `--yes` flag)
/// 3. Remove expired `audit-YYYY-MM-DD.log` files
/// 4. Remove expired `audit_logs` rows (skipped without a database)
async fn cleanup_audit(config: &SecurityConfig, days: Option<u32>, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Audit Retention Cleanup".bright_blue().bold());
    println!();

    let days = days.unwrap_or(config.audit_retention_days);
    let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(days));

    println!("  Directory: {}", config.audit_log_dir.display().to_string().cyan());
    println!(
        "  Cutoff:    {} ({} days)",
        cutoff.format("%Y-%m-%d").to_string().cyan(),
        days
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete all audit data older than the cutoff?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let file_log = FileAuditLog::new(config.audit_log_dir.clone());
    let files = file_log
        .prune_before(cutoff)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to prune audit files: {}", e))?;

    println!(
        "  Files removed: {}",
        files.to_string().bright_green().bold()
    );

    if config.database_url.is_some() {
        let pool = connect(config).await?;
        let repo = PgAuditRepository::new(Arc::new(pool));

        let rows = repo
            .prune_before(cutoff)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to prune audit rows: {}", e))?;

        println!(
            "  Rows removed:  {}",
            rows.to_string().bright_green().bold()
        );
    } else {
        println!("  Rows removed:  {}", "skipped (no database)".yellow());
    }

    println!();
    println!("{}", "✅ Cleanup complete".green().bold());
    println!();

    Ok(())
}

/// Displays per-day audit file statistics.
///
/// # Output Format
///
/// ```text
/// 📊 Audit Files
///
///   Day                      Entries      Size
///   ─────────────────────────────────────────────
///   audit-2025-11-02.log         142     38 KiB
///   audit-2025-11-03.log          87     21 KiB
/// ```
async fn audit_stats(config: &SecurityConfig) -> Result<()> {
    println!("{}", "📊 Audit Files".bright_blue().bold());
    println!();

    let file_log = FileAuditLog::new(config.audit_log_dir.clone());
    let files = file_log
        .day_files()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read audit directory: {}", e))?;

    if files.is_empty() {
        println!("{}", "  No audit files found".yellow());
        println!();
        return Ok(());
    }

    println!(
        "  {:<24} {:>8} {:>10}",
        "Day".bright_white().bold(),
        "Entries".bright_white().bold(),
        "Size".bright_white().bold()
    );
    println!("  {}", "─".repeat(45).bright_black());

    let mut total_entries = 0u64;
    for (name, size) in &files {
        let entries = count_lines(&config.audit_log_dir.join(name)).await;
        total_entries += entries;

        println!(
            "  {:<24} {:>8} {:>10}",
            name.cyan(),
            entries,
            format_size(*size).bright_black()
        );
    }

    println!();
    println!(
        "  Total entries: {}",
        total_entries.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, config: &SecurityConfig) -> Result<()> {
    let pool = connect(config).await?;

    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(&pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(&pool)
                .await?;

            let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
                .fetch_one(&pool)
                .await
                .unwrap_or(0);

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Audit rows: {}", rows.to_string().bright_green().bold());
            println!();
        }
    }

    Ok(())
}

/// Handles Redis diagnostic commands.
async fn handle_redis_action(action: RedisAction, config: &SecurityConfig) -> Result<()> {
    match action {
        RedisAction::Check => {
            println!("{}", "🔍 Checking Redis connection...".bright_blue());

            let url = config.redis_url.as_deref().context("REDIS_URL must be set")?;

            let store = RedisCounterStore::connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {}", e))?;

            if store.health_check().await {
                println!("{}", "✅ Redis connection OK".green().bold());
            } else {
                println!("{}", "⚠️  Connected, but PING failed".yellow().bold());
            }
        }
    }

    Ok(())
}

/// Counts newline-delimited entries in one audit file.
///
/// Unreadable files count as zero; `audit stats` is a diagnostic, not a
/// consistency check.
async fn count_lines(path: &std::path::Path) -> u64 {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => content.lines().count() as u64,
        Err(_) => 0,
    }
}

/// Formats a byte count for terminal display.
fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
