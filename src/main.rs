//! migrate-projects - move legacy project records into the unified collection

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unified_projects::{
    config::{Args, Command},
    db::mongo::redact_uri,
    migration::{run_rollback, BackupSnapshot, MigrationOrchestrator},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    format!("unified_projects={0},migrate_projects={0},warn", log_level).into()
                }),
        )
        .with(args.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.log_json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Unified Projects Migration");
    info!("======================================");
    info!(
        "Version: {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_SHORT"),
        env!("BUILD_TIMESTAMP")
    );
    info!("MongoDB: {}", redact_uri(args.mongodb_uri.as_deref().unwrap_or_default()));
    info!("Database: {}", args.mongodb_db);
    info!(
        "Collections: {} + {} -> {}",
        args.preparation_collection, args.other_collection, args.unified_collection
    );

    let connector = args.connector()?;

    match args.command() {
        Command::Migrate => {
            let config = args.migration_config();
            info!(
                "Backup: {} | Dry run: {} | Batch size: {}",
                if config.backup_enabled { "enabled" } else { "DISABLED" },
                config.dry_run,
                config.batch_size
            );

            let mut orchestrator = MigrationOrchestrator::new(config, connector);
            let report = orchestrator.run().await?;

            if report.failed() > 0 {
                warn!(
                    failed = report.failed(),
                    "Some records were not migrated; fix them at the source and re-run after rollback"
                );
            }
        }
        Command::Rollback { from_backup } => {
            let snapshot = match &from_backup {
                Some(path) => Some(BackupSnapshot::load(path).await?),
                None => None,
            };
            let outcome = run_rollback(&connector, snapshot.as_ref()).await?;
            info!(
                removed = outcome.removed,
                restored = outcome.restored,
                "Rollback complete"
            );
        }
    }

    Ok(())
}
