//! Configuration for the project migration
//!
//! CLI arguments and environment variable handling using clap. Every
//! setting can come from a flag, the environment, or a `.env` file.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::db::schemas::{
    LEGACY_OTHER_COLLECTION, LEGACY_PREPARATION_COLLECTION, PROJECT_COLLECTION,
};
use crate::migration::{CollectionNames, MigrationConfig, MongoConnector};
use crate::types::{MigrationError, Result};

/// Migrate legacy project collections into the unified projects collection
#[derive(Parser, Debug, Clone)]
#[command(name = "migrate-projects")]
#[command(about = "Migrate legacy project records into the unified projects collection")]
pub struct Args {
    /// What to do; defaults to `migrate`
    #[command(subcommand)]
    pub command: Option<Command>,

    /// MongoDB connection URI (required, no default)
    #[arg(long, env = "MONGODB_URI", global = true)]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "projects", global = true)]
    pub mongodb_db: String,

    /// Legacy internal-preparation collection
    #[arg(
        long,
        env = "LEGACY_PREPARATION_COLLECTION",
        default_value = LEGACY_PREPARATION_COLLECTION,
        global = true
    )]
    pub preparation_collection: String,

    /// Legacy other-project collection
    #[arg(
        long,
        env = "LEGACY_OTHER_COLLECTION",
        default_value = LEGACY_OTHER_COLLECTION,
        global = true
    )]
    pub other_collection: String,

    /// Unified projects collection
    #[arg(long, env = "UNIFIED_COLLECTION", default_value = PROJECT_COLLECTION, global = true)]
    pub unified_collection: String,

    /// Capture a backup file before writing (`--backup-enabled false` to skip)
    #[arg(
        long,
        env = "BACKUP_ENABLED",
        default_value_t = true,
        action = ArgAction::Set,
        global = true
    )]
    pub backup_enabled: bool,

    /// Directory for backup files
    #[arg(long, env = "BACKUP_DIR", default_value = "backups", global = true)]
    pub backup_dir: PathBuf,

    /// Map and validate without writing the unified collection
    #[arg(long, env = "DRY_RUN", default_value_t = false, action = ArgAction::Set, global = true)]
    pub dry_run: bool,

    /// Documents fetched per read round trip
    #[arg(long, env = "BATCH_SIZE", default_value = "100", global = true)]
    pub batch_size: u32,

    /// Log every migrated record, not just failures
    #[arg(
        long,
        env = "LOG_ENABLED",
        default_value_t = true,
        action = ArgAction::Set,
        global = true
    )]
    pub log_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value_t = false, action = ArgAction::Set, global = true)]
    pub log_json: bool,

    /// Server selection and connect timeout in milliseconds
    #[arg(long, env = "MONGODB_TIMEOUT_MS", default_value = "10000", global = true)]
    pub mongodb_timeout_ms: u64,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Migrate both legacy collections into the unified collection
    Migrate,
    /// Empty the unified collection, optionally restoring a backup
    Rollback {
        /// Backup file whose unified records are put back after clearing
        #[arg(long)]
        from_backup: Option<PathBuf>,
    },
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.mongodb_uri.as_deref().map(str::trim) {
            None | Some("") => return Err("MONGODB_URI is required".to_string()),
            Some(_) => {}
        }

        if self.batch_size == 0 {
            return Err("BATCH_SIZE must be greater than zero".to_string());
        }

        let names = [
            ("LEGACY_PREPARATION_COLLECTION", &self.preparation_collection),
            ("LEGACY_OTHER_COLLECTION", &self.other_collection),
            ("UNIFIED_COLLECTION", &self.unified_collection),
            ("MONGODB_DB", &self.mongodb_db),
        ];
        for (var, value) in names {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", var));
            }
        }

        Ok(())
    }

    /// The subcommand to run
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Migrate)
    }

    pub fn collection_names(&self) -> CollectionNames {
        CollectionNames {
            preparation: self.preparation_collection.clone(),
            other: self.other_collection.clone(),
            unified: self.unified_collection.clone(),
        }
    }

    /// Run configuration handed to the orchestrator
    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig {
            backup_enabled: self.backup_enabled,
            dry_run: self.dry_run,
            batch_size: self.batch_size,
            log_enabled: self.log_enabled,
            backup_dir: self.backup_dir.clone(),
        }
    }

    /// MongoDB connector for these settings
    pub fn connector(&self) -> Result<MongoConnector> {
        let uri = self
            .mongodb_uri
            .clone()
            .ok_or_else(|| MigrationError::Config("MONGODB_URI is required".into()))?;
        Ok(MongoConnector {
            uri,
            db_name: self.mongodb_db.clone(),
            names: self.collection_names(),
            timeout_ms: self.mongodb_timeout_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["migrate-projects"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--mongodb-uri", "mongodb://localhost:27017"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.command(), Command::Migrate);

        let config = args.migration_config();
        assert!(config.backup_enabled);
        assert!(!config.dry_run);
        assert!(config.log_enabled);
        assert_eq!(config.batch_size, 100);
        assert_eq!(args.collection_names(), CollectionNames::default());
    }

    #[test]
    fn test_missing_uri_is_rejected() {
        let mut args = parse(&["--mongodb-uri", "mongodb://db"]);
        args.mongodb_uri = None;
        assert!(args.validate().unwrap_err().contains("MONGODB_URI"));
        assert!(matches!(args.connector(), Err(MigrationError::Config(_))));

        args.mongodb_uri = Some("   ".to_string());
        assert!(args.validate().unwrap_err().contains("MONGODB_URI"));
    }

    #[test]
    fn test_batch_size_reaches_run_config() {
        let args = parse(&["--mongodb-uri", "mongodb://db", "--batch-size", "250"]);
        assert_eq!(args.migration_config().batch_size, 250);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let args = parse(&["--mongodb-uri", "mongodb://db", "--batch-size", "0"]);
        assert!(args.validate().unwrap_err().contains("BATCH_SIZE"));
    }

    #[test]
    fn test_empty_collection_name_is_rejected() {
        let args = parse(&["--mongodb-uri", "mongodb://db", "--unified-collection", " "]);
        assert!(args.validate().unwrap_err().contains("UNIFIED_COLLECTION"));
    }

    #[test]
    fn test_flags_turn_features_off() {
        let args = parse(&[
            "--mongodb-uri",
            "mongodb://db",
            "--backup-enabled",
            "false",
            "--dry-run",
            "true",
            "--log-enabled",
            "false",
        ]);
        let config = args.migration_config();
        assert!(!config.backup_enabled);
        assert!(config.dry_run);
        assert!(!config.log_enabled);
    }

    #[test]
    fn test_rollback_subcommand() {
        let args = parse(&[
            "rollback",
            "--from-backup",
            "backups/backup-1.json",
            "--mongodb-uri",
            "mongodb://db",
        ]);
        assert_eq!(
            args.command(),
            Command::Rollback {
                from_backup: Some(PathBuf::from("backups/backup-1.json"))
            }
        );
        let connector = args.connector().unwrap();
        assert_eq!(connector.uri, "mongodb://db");
        assert_eq!(connector.names, CollectionNames::default());
    }
}
