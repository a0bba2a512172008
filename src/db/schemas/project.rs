//! Unified project document schema
//!
//! One record type for every project. Which fields are mandatory depends on
//! the project type, so the type-specific part is a sum type:
//!
//! - `ProjectKind::InternalPreparation` carries the formulation
//!   (`composition`, `function`)
//! - `ProjectKind::Clinical` covers every other type and carries the dated
//!   follow-up plan (`leader`, `startDate`, `followUpWeeks`)
//!
//! In MongoDB the record is stored flat with `projectType` as the
//! discriminant. Decoding goes through the flat `ProjectRecord` and re-checks the
//! type-conditional invariants, so a stored document that violates them
//! fails to decode instead of producing an inconsistent value.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Timestamped};
use crate::db::schemas::{AiReport, LegacySource};
use crate::registry::{
    Department, Importance, Leader, ProjectSource, ProjectStatus, ProjectType, TransformProgress,
    TransformRequirement,
};
use crate::validator::{self, KindFields, Violation};

/// Collection name for unified projects
pub const PROJECT_COLLECTION: &str = "projects";

/// Fields only an internal preparation has
#[derive(Clone, Debug, PartialEq)]
pub struct PreparationDetails {
    pub composition: String,
    pub function: String,
    pub leader: Option<Leader>,
}

/// Fields every non-internal project type has
#[derive(Clone, Debug, PartialEq)]
pub struct ClinicalDetails {
    project_type: ProjectType,
    pub leader: Leader,
    pub start_date: DateTime,
    pub follow_up_weeks: u32,
}

impl ClinicalDetails {
    /// Build the details for a non-internal project type
    pub fn new(
        project_type: ProjectType,
        leader: Leader,
        start_date: DateTime,
        follow_up_weeks: u32,
    ) -> Result<Self, Violation> {
        if project_type.is_internal_preparation() {
            return Err(Violation::new(
                "projectType",
                "internal-preparation projects carry composition and function, not a follow-up plan",
            ));
        }
        if follow_up_weeks == 0 {
            return Err(Violation::new("followUpWeeks", "followUpWeeks must be greater than 0"));
        }
        Ok(Self {
            project_type,
            leader,
            start_date,
            follow_up_weeks,
        })
    }

    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }
}

/// Type-specific part of a project
#[derive(Clone, Debug, PartialEq)]
pub enum ProjectKind {
    InternalPreparation(PreparationDetails),
    Clinical(ClinicalDetails),
}

impl ProjectKind {
    /// The discriminant stored as `projectType`
    pub fn project_type(&self) -> ProjectType {
        match self {
            ProjectKind::InternalPreparation(_) => ProjectType::InternalPreparation,
            ProjectKind::Clinical(details) => details.project_type,
        }
    }

    pub fn leader(&self) -> Option<Leader> {
        match self {
            ProjectKind::InternalPreparation(details) => details.leader,
            ProjectKind::Clinical(details) => Some(details.leader),
        }
    }
}

/// Where a migrated record came from
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOrigin {
    pub source: LegacySource,
    /// Legacy `_id`, rendered as a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_id: Option<String>,
}

/// Unified project document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "ProjectRecord", into = "ProjectRecord")]
pub struct ProjectDoc {
    /// MongoDB document ID, assigned on insert
    pub id: Option<ObjectId>,

    pub name: String,
    pub department: Department,
    pub source: ProjectSource,
    pub importance: Importance,
    pub status: ProjectStatus,

    /// Type-specific required fields
    pub kind: ProjectKind,

    pub indication: Option<String>,
    pub transform_requirement: Option<TransformRequirement>,
    pub transform_progress: Option<TransformProgress>,
    pub hospital_doctor: Option<String>,
    pub patent: Option<String>,
    pub clinical_data: Option<String>,
    pub market_size: Option<String>,
    pub competitor_status: Option<String>,
    pub conclusion: Option<String>,

    // Meaningful for internal preparations, not exclusive to them.
    // `record_number` is not unique across projects.
    pub specification: Option<String>,
    pub duration: Option<String>,
    pub record_number: Option<String>,

    /// Attachment ids owned by the attachment subsystem
    pub attachments: Vec<ObjectId>,

    pub create_time: Option<DateTime>,
    pub update_time: Option<DateTime>,

    /// Creating user; set once and never changed
    pub created_by: ObjectId,

    pub ai_report: AiReport,

    pub migrated_from: Option<LegacyOrigin>,
}

impl ProjectDoc {
    /// Create a new project with no optional fields set
    pub fn new(
        name: String,
        department: Department,
        source: ProjectSource,
        importance: Importance,
        status: ProjectStatus,
        kind: ProjectKind,
        created_by: ObjectId,
    ) -> Self {
        Self {
            id: None,
            name,
            department,
            source,
            importance,
            status,
            kind,
            indication: None,
            transform_requirement: None,
            transform_progress: None,
            hospital_doctor: None,
            patent: None,
            clinical_data: None,
            market_size: None,
            competitor_status: None,
            conclusion: None,
            specification: None,
            duration: None,
            record_number: None,
            attachments: Vec::new(),
            create_time: None,
            update_time: None,
            created_by,
            ai_report: AiReport::default(),
            migrated_from: None,
        }
    }

    pub fn project_type(&self) -> ProjectType {
        self.kind.project_type()
    }
}

impl IntoIndexes for ProjectDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "projectType": 1 },
                Some(
                    IndexOptions::builder()
                        .name("project_type_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "status": 1 },
                Some(IndexOptions::builder().name("status_index".to_string()).build()),
            ),
            (
                doc! { "department": 1 },
                Some(
                    IndexOptions::builder()
                        .name("department_index".to_string())
                        .build(),
                ),
            ),
            // Deliberately not unique: two legacy preparations may share a
            // record number.
            (
                doc! { "recordNumber": 1 },
                Some(
                    IndexOptions::builder()
                        .name("record_number_index".to_string())
                        .sparse(true)
                        .build(),
                ),
            ),
            (
                doc! { "migratedFrom.legacyId": 1 },
                Some(
                    IndexOptions::builder()
                        .name("migrated_from_index".to_string())
                        .sparse(true)
                        .build(),
                ),
            ),
        ]
    }
}

impl Timestamped for ProjectDoc {
    fn stamp(&mut self, now: DateTime) {
        if self.create_time.is_none() {
            self.create_time = Some(now);
        }
        self.update_time = Some(now);
    }
}

/// Flat stored shape of a project
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    project_type: ProjectType,
    department: Department,
    source: ProjectSource,
    importance: Importance,
    status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    leader: Option<Leader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    indication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform_requirement: Option<TransformRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform_progress: Option<TransformProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hospital_doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clinical_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    market_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    competitor_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    composition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    specification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    record_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    follow_up_weeks: Option<u32>,
    #[serde(default)]
    attachments: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    create_time: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_time: Option<DateTime>,
    created_by: ObjectId,
    #[serde(default)]
    ai_report: AiReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    migrated_from: Option<LegacyOrigin>,
}

impl TryFrom<ProjectRecord> for ProjectDoc {
    type Error = String;

    fn try_from(record: ProjectRecord) -> Result<Self, Self::Error> {
        let violations = validator::validate_kind(&KindFields {
            project_type: record.project_type.as_str(),
            composition: record.composition.as_deref(),
            function: record.function.as_deref(),
            leader: record.leader.map(|l| l.as_str()),
            start_date: record.start_date,
            follow_up_weeks: record.follow_up_weeks.map(i64::from),
        });
        if !violations.is_empty() {
            return Err(validator::join(&violations));
        }

        let kind = if record.project_type.is_internal_preparation() {
            ProjectKind::InternalPreparation(PreparationDetails {
                composition: record.composition.unwrap_or_default(),
                function: record.function.unwrap_or_default(),
                leader: record.leader,
            })
        } else {
            let leader = record
                .leader
                .ok_or_else(|| "leader: missing".to_string())?;
            let start_date = record
                .start_date
                .ok_or_else(|| "startDate: missing".to_string())?;
            ProjectKind::Clinical(
                ClinicalDetails::new(
                    record.project_type,
                    leader,
                    start_date,
                    record.follow_up_weeks.unwrap_or_default(),
                )
                .map_err(|v| v.to_string())?,
            )
        };

        Ok(ProjectDoc {
            id: record.id,
            name: record.name,
            department: record.department,
            source: record.source,
            importance: record.importance,
            status: record.status,
            kind,
            indication: record.indication,
            transform_requirement: record.transform_requirement,
            transform_progress: record.transform_progress,
            hospital_doctor: record.hospital_doctor,
            patent: record.patent,
            clinical_data: record.clinical_data,
            market_size: record.market_size,
            competitor_status: record.competitor_status,
            conclusion: record.conclusion,
            specification: record.specification,
            duration: record.duration,
            record_number: record.record_number,
            attachments: record.attachments,
            create_time: record.create_time,
            update_time: record.update_time,
            created_by: record.created_by,
            ai_report: record.ai_report,
            migrated_from: record.migrated_from,
        })
    }
}

impl From<ProjectDoc> for ProjectRecord {
    fn from(project: ProjectDoc) -> Self {
        let project_type = project.project_type();
        let leader = project.kind.leader();
        let (composition, function, start_date, follow_up_weeks) = match project.kind {
            ProjectKind::InternalPreparation(details) => {
                (Some(details.composition), Some(details.function), None, None)
            }
            ProjectKind::Clinical(details) => (
                None,
                None,
                Some(details.start_date),
                Some(details.follow_up_weeks),
            ),
        };

        ProjectRecord {
            id: project.id,
            name: project.name,
            project_type,
            department: project.department,
            source: project.source,
            importance: project.importance,
            status: project.status,
            leader,
            indication: project.indication,
            transform_requirement: project.transform_requirement,
            transform_progress: project.transform_progress,
            hospital_doctor: project.hospital_doctor,
            patent: project.patent,
            clinical_data: project.clinical_data,
            market_size: project.market_size,
            competitor_status: project.competitor_status,
            conclusion: project.conclusion,
            composition,
            function,
            specification: project.specification,
            duration: project.duration,
            record_number: project.record_number,
            start_date,
            follow_up_weeks,
            attachments: project.attachments,
            create_time: project.create_time,
            update_time: project.update_time,
            created_by: project.created_by,
            ai_report: project.ai_report,
            migrated_from: project.migrated_from,
        }
    }
}
