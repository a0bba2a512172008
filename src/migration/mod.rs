//! Legacy project migration
//!
//! ```text
//! legacy collections ──read──→ BackupSnapshot ──persist──→ backups/*.json
//!        │
//!        └─→ mapper → CandidateProject → validator ──ok──→ unified collection
//!                                             └──violations──→ RecordFailure
//! ```

pub mod backup;
pub mod orchestrator;
pub mod report;
pub mod rollback;
pub mod store;

pub use backup::BackupSnapshot;
pub use orchestrator::{mapper_for, MigrationConfig, MigrationOrchestrator, RecordMapper};
pub use report::{FailureReason, MigrationReport, RecordFailure, RunPhase, SourceReport};
pub use rollback::{rollback, rollback_to_snapshot, run_rollback, RollbackOutcome};
pub use store::{
    CollectionNames, InMemoryConnector, InMemoryProjectStore, MongoConnector, MongoProjectStore,
    ProjectStore, StoreConnector, StoreEvent,
};
