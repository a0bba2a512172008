//! Migration run summary
//!
//! Per-record failures are collected as typed values so a caller can act on
//! them without parsing log lines.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::schemas::LegacySource;
use crate::validator::{self, Violation};

/// Phases of a single migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "source", rename_all = "kebab-case")]
pub enum RunPhase {
    NotStarted,
    Connected,
    BackedUp,
    Migrating(LegacySource),
    Summarized,
    Closed,
    Failed,
}

/// Why a legacy record was not migrated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum FailureReason {
    /// The legacy document did not decode into its legacy shape
    Decode(String),
    /// The mapped record broke unified invariants
    Validation(Vec<Violation>),
    /// The database refused the insert
    Persistence(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Decode(msg) => write!(f, "decode failed: {}", msg),
            FailureReason::Validation(violations) => {
                write!(f, "validation failed: {}", validator::join(violations))
            }
            FailureReason::Persistence(msg) => write!(f, "persistence failed: {}", msg),
        }
    }
}

/// One legacy record that was not migrated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    pub source: LegacySource,
    pub source_id: Option<String>,
    pub reason: FailureReason,
    /// First violated field, for validation failures
    pub violated_field: Option<String>,
}

impl RecordFailure {
    pub fn new(source: LegacySource, source_id: Option<String>, reason: FailureReason) -> Self {
        let violated_field = match &reason {
            FailureReason::Validation(violations) => {
                violations.first().map(|v| v.field.to_string())
            }
            _ => None,
        };
        Self {
            source,
            source_id,
            reason,
            violated_field,
        }
    }
}

/// Tally for one legacy source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source: LegacySource,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SourceReport {
    pub fn new(source: LegacySource) -> Self {
        Self {
            source,
            total: 0,
            succeeded: 0,
            failed: 0,
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub backup_path: Option<PathBuf>,
    pub sources: Vec<SourceReport>,
    pub failures: Vec<RecordFailure>,
    pub warnings: Vec<String>,
}

impl MigrationReport {
    pub fn new(run_id: Uuid, dry_run: bool) -> Self {
        Self {
            run_id,
            dry_run,
            started_at: Utc::now(),
            elapsed_ms: 0,
            backup_path: None,
            sources: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.sources.iter().map(|s| s.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.sources.iter().map(|s| s.failed).sum()
    }

    pub fn total(&self) -> usize {
        self.sources.iter().map(|s| s.total).sum()
    }

    pub fn source(&self, source: LegacySource) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == source)
    }
}
