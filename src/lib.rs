//! Unified projects - data model and legacy migration
//!
//! Projects used to live in two MongoDB collections: internal hospital
//! preparations and every other project type. This crate defines the single
//! unified project record that replaces both, and the one-shot engine that
//! moves legacy records into it.
//!
//! ## Modules
//!
//! - **Registry**: closed vocabularies (tag + display label) for every enumerated field
//! - **Schemas**: legacy document shapes and the unified `ProjectDoc`
//! - **Mapper**: legacy record → candidate unified record
//! - **Validator**: unified invariants, returned as field-level violations
//! - **Migration**: backup, orchestration, per-record failure reporting, rollback

pub mod config;
pub mod db;
pub mod mapper;
pub mod migration;
pub mod registry;
pub mod types;
pub mod validator;

pub use config::{Args, Command};
pub use migration::{MigrationConfig, MigrationOrchestrator, MigrationReport};
pub use types::{MigrationError, Result};
