//! Database schemas
//!
//! The unified project collection plus the two read-only legacy
//! collections it replaces.

mod ai_report;
mod legacy;
mod project;

pub use ai_report::AiReport;
pub use legacy::{
    legacy_id_string, LegacyAiReport, LegacyOtherProjectDoc, LegacyOtherStatus, LegacyPreparationDoc,
    LegacyPreparationStatus, LegacySource, LEGACY_OTHER_COLLECTION, LEGACY_PREPARATION_COLLECTION,
};
pub use project::{
    ClinicalDetails, LegacyOrigin, PreparationDetails, ProjectDoc, ProjectKind,
    PROJECT_COLLECTION,
};
