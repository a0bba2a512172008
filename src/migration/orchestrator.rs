//! Migration Orchestrator
//!
//! Drives one run end to end:
//!
//! ```text
//! not-started → connected → backed-up → migrating(internal-preparation)
//!             → migrating(other-project) → summarized → closed
//!                        (any step) ──fatal──→ failed
//! ```
//!
//! Connect and backup failures are fatal. A record that fails to decode,
//! validate or insert is counted and recorded, and the run moves on to the
//! next record. Records are processed one at a time, sources one after the
//! other, and the connection is closed whichever way the run ends.

use std::path::PathBuf;
use std::time::Instant;

use bson::Document;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::schemas::{
    legacy_id_string, LegacyOrigin, LegacyOtherProjectDoc, LegacyPreparationDoc, LegacySource,
};
use crate::mapper::{self, CandidateProject};
use crate::migration::backup::BackupSnapshot;
use crate::migration::report::{
    FailureReason, MigrationReport, RecordFailure, RunPhase, SourceReport,
};
use crate::migration::store::{ProjectStore, StoreConnector};
use crate::types::{MigrationError, Result};

/// Explicit configuration for one run
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Capture and persist a backup before the first unified write
    pub backup_enabled: bool,
    /// Map and validate only; never write the unified collection
    pub dry_run: bool,
    /// Documents per read round trip, for every collection the run reads
    pub batch_size: u32,
    /// Log every migrated record, not just failures
    pub log_enabled: bool,
    /// Where backup files are written
    pub backup_dir: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            backup_enabled: true,
            dry_run: false,
            batch_size: 100,
            log_enabled: true,
            backup_dir: PathBuf::from("backups"),
        }
    }
}

/// Maps one raw legacy document to a candidate, or explains why it cannot
pub type RecordMapper = fn(Document) -> Result<CandidateProject>;

fn map_preparation_document(doc: Document) -> Result<CandidateProject> {
    let legacy: LegacyPreparationDoc = bson::from_document(doc)?;
    Ok(mapper::map_internal_preparation(legacy))
}

fn map_other_document(doc: Document) -> Result<CandidateProject> {
    let legacy: LegacyOtherProjectDoc = bson::from_document(doc)?;
    Ok(mapper::map_other_project(legacy))
}

/// Decoding mapper for a legacy source
pub fn mapper_for(source: LegacySource) -> RecordMapper {
    match source {
        LegacySource::InternalPreparation => map_preparation_document,
        LegacySource::OtherProject => map_other_document,
    }
}

/// Migration orchestrator for a single run
pub struct MigrationOrchestrator<C: StoreConnector> {
    config: MigrationConfig,
    connector: C,
    run_id: Uuid,
    phases: Vec<RunPhase>,
}

impl<C: StoreConnector> MigrationOrchestrator<C> {
    pub fn new(config: MigrationConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            run_id: Uuid::new_v4(),
            phases: vec![RunPhase::NotStarted],
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Phases entered so far, in order
    pub fn phases(&self) -> &[RunPhase] {
        &self.phases
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!(run_id = %self.run_id, ?phase, "Migration phase");
        self.phases.push(phase);
    }

    /// Run the whole migration
    ///
    /// Returns the summary when the run completes, even if some records
    /// failed. Returns an error only for fatal failures.
    pub async fn run(&mut self) -> Result<MigrationReport> {
        let started = Instant::now();
        let mut report = MigrationReport::new(self.run_id, self.config.dry_run);

        info!(
            run_id = %self.run_id,
            dry_run = self.config.dry_run,
            backup = self.config.backup_enabled,
            "Starting project migration"
        );

        let store = match self.connector.connect().await {
            Ok(store) => store,
            Err(e) => {
                error!(run_id = %self.run_id, error = %e, "Connection failed");
                self.enter(RunPhase::Failed);
                return Err(e);
            }
        };
        self.enter(RunPhase::Connected);

        let outcome = self.run_connected(&store, &mut report).await;

        if let Err(e) = store.close().await {
            warn!(run_id = %self.run_id, error = %e, "Closing the connection failed");
        }

        match outcome {
            Ok(()) => {
                report.elapsed_ms = started.elapsed().as_millis() as u64;
                self.summarize(&report);
                self.enter(RunPhase::Closed);
                Ok(report)
            }
            Err(e) => {
                error!(run_id = %self.run_id, error = %e, "Migration aborted");
                self.enter(RunPhase::Failed);
                Err(e)
            }
        }
    }

    async fn run_connected(
        &mut self,
        store: &C::Store,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let existing = store.count_unified().await?;
        if existing > 0 {
            let warning = format!(
                "unified collection already holds {} records; migrated records are added alongside",
                existing
            );
            warn!(run_id = %self.run_id, existing, "Unified collection is not empty");
            report.warnings.push(warning);
        }

        let snapshot = if self.config.backup_enabled {
            let snapshot =
                BackupSnapshot::capture(store, self.run_id, self.config.batch_size).await?;
            report.backup_path = Some(snapshot.persist(&self.config.backup_dir).await?);
            Some(snapshot)
        } else {
            warn!(run_id = %self.run_id, "Backup disabled; legacy data is read without a snapshot");
            None
        };
        self.enter(RunPhase::BackedUp);

        for source in LegacySource::ALL {
            self.enter(RunPhase::Migrating(source));
            let docs = match &snapshot {
                Some(snapshot) => snapshot.legacy(source).to_vec(),
                None => store.load_legacy(source, self.config.batch_size).await?,
            };
            let (tally, failures) = self
                .migrate_source(store, source, docs, mapper_for(source))
                .await;
            report.sources.push(tally);
            report.failures.extend(failures);
        }

        self.enter(RunPhase::Summarized);
        Ok(())
    }

    /// Map, validate and persist every record of one source
    ///
    /// Never fails as a whole: each record's outcome lands in the tally.
    pub async fn migrate_source<S: ProjectStore + ?Sized>(
        &self,
        store: &S,
        source: LegacySource,
        docs: Vec<Document>,
        mapper: RecordMapper,
    ) -> (SourceReport, Vec<RecordFailure>) {
        let mut tally = SourceReport::new(source);
        let mut failures = Vec::new();

        info!(run_id = %self.run_id, %source, records = docs.len(), "Migrating legacy source");

        for doc in docs {
            tally.total += 1;
            let source_id = legacy_id_string(doc.get("_id"));

            match self.migrate_record(store, source, doc, mapper).await {
                Ok(name) => {
                    tally.succeeded += 1;
                    if self.config.log_enabled {
                        info!(
                            outcome = "success",
                            %source,
                            source_id = source_id.as_deref().unwrap_or("-"),
                            name = %name,
                            dry_run = self.config.dry_run,
                            "Record migrated"
                        );
                    }
                }
                Err(reason) => {
                    tally.failed += 1;
                    warn!(
                        outcome = "failure",
                        %source,
                        source_id = source_id.as_deref().unwrap_or("-"),
                        reason = %reason,
                        "Record not migrated"
                    );
                    failures.push(RecordFailure::new(source, source_id, reason));
                }
            }
        }

        info!(
            run_id = %self.run_id,
            %source,
            total = tally.total,
            succeeded = tally.succeeded,
            failed = tally.failed,
            "Legacy source done"
        );

        (tally, failures)
    }

    async fn migrate_record<S: ProjectStore + ?Sized>(
        &self,
        store: &S,
        source: LegacySource,
        doc: Document,
        mapper: RecordMapper,
    ) -> std::result::Result<String, FailureReason> {
        let candidate = mapper(doc).map_err(|e| match e {
            MigrationError::Decode(msg) => FailureReason::Decode(msg),
            other => FailureReason::Decode(other.to_string()),
        })?;
        let legacy_id = candidate.legacy_id.clone();

        let mut project = candidate
            .into_project()
            .map_err(FailureReason::Validation)?;
        project.migrated_from = Some(LegacyOrigin { source, legacy_id });
        let name = project.name.clone();

        if self.config.dry_run {
            return Ok(name);
        }

        store
            .insert_project(project)
            .await
            .map_err(|e| FailureReason::Persistence(e.to_string()))?;
        Ok(name)
    }

    fn summarize(&self, report: &MigrationReport) {
        for failure in &report.failures {
            debug!(
                source = %failure.source,
                source_id = failure.source_id.as_deref().unwrap_or("-"),
                field = failure.violated_field.as_deref().unwrap_or("-"),
                reason = %failure.reason,
                "Failed record"
            );
        }

        let summary = format!(
            "{} migrated, {} failed, {} total in {} ms",
            report.succeeded(),
            report.failed(),
            report.total(),
            report.elapsed_ms
        );
        if report.failed() == 0 {
            info!(
                outcome = "success",
                run_id = %self.run_id,
                dry_run = report.dry_run,
                "Migration complete: {}",
                summary
            );
        } else {
            warn!(
                run_id = %self.run_id,
                dry_run = report.dry_run,
                "Migration complete with failures: {}",
                summary
            );
        }
        if report.dry_run {
            info!(run_id = %self.run_id, "Dry run: nothing was written to the unified collection");
        }
        if let Some(path) = &report.backup_path {
            info!(run_id = %self.run_id, path = %path.display(), "Backup kept");
        }
    }
}
