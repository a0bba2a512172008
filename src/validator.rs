//! Record Validator
//!
//! Checks a candidate project against the unified invariants and gathers
//! every violation instead of stopping at the first. Nothing here mutates
//! or persists.
//!
//! Order of checks:
//! 1. `name`, `projectType`, `source` are non-empty; `projectType` is known
//! 2. internal preparations need `composition` and `function`
//! 3. every other type needs `leader`, `startDate` and a `followUpWeeks`
//!    between 1 and `u32::MAX`
//! 4. `department`, `importance`, `status` and `createdBy` are present
//! 5. enumerated fields hold tags from the registry
//!
//! Steps 2 and 3 are also exposed as [`validate_kind`] so the schema layer
//! can enforce the same rules when decoding stored documents.

use std::fmt;

use bson::DateTime;
use serde::Serialize;

use crate::mapper::CandidateProject;
use crate::registry::{self, EnumField, ProjectType};

/// One broken rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Unified field name the rule is about
    pub field: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Render violations as one line
pub fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The fields whose requiredness depends on the project type
#[derive(Debug, Clone, Copy, Default)]
pub struct KindFields<'a> {
    pub project_type: &'a str,
    pub composition: Option<&'a str>,
    pub function: Option<&'a str>,
    pub leader: Option<&'a str>,
    pub start_date: Option<DateTime>,
    pub follow_up_weeks: Option<i64>,
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Type-conditional required fields
pub fn validate_kind(fields: &KindFields<'_>) -> Vec<Violation> {
    let mut violations = Vec::new();

    if fields.project_type == ProjectType::InternalPreparation.as_str() {
        if is_blank(fields.composition) {
            violations.push(Violation::new(
                "composition",
                "composition is required for internal-preparation projects",
            ));
        }
        if is_blank(fields.function) {
            violations.push(Violation::new(
                "function",
                "function is required for internal-preparation projects",
            ));
        }
    } else {
        if is_blank(fields.leader) {
            violations.push(Violation::new("leader", "leader is required"));
        }
        if fields.start_date.is_none() {
            violations.push(Violation::new(
                "startDate",
                "startDate must be present and a valid date",
            ));
        }
        match fields.follow_up_weeks {
            None => violations.push(Violation::new(
                "followUpWeeks",
                "followUpWeeks is required",
            )),
            Some(weeks) if weeks <= 0 => violations.push(Violation::new(
                "followUpWeeks",
                format!("followUpWeeks must be greater than 0, got {}", weeks),
            )),
            Some(weeks) if weeks > i64::from(u32::MAX) => violations.push(Violation::new(
                "followUpWeeks",
                format!("followUpWeeks must be at most {}, got {}", u32::MAX, weeks),
            )),
            Some(_) => {}
        }
    }

    violations
}

fn check_required(violations: &mut Vec<Violation>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        violations.push(Violation::new(field, format!("{} is required", field)));
    }
}

fn check_tag(violations: &mut Vec<Violation>, field: EnumField, value: Option<&str>) {
    let Some(tag) = value.filter(|v| !v.trim().is_empty()) else {
        return;
    };
    if !registry::is_valid(field, tag) {
        violations.push(Violation::new(
            field.field_name(),
            format!("unknown {} '{}'", field.field_name(), tag),
        ));
    }
}

/// Validate a candidate project; an empty list means it can be persisted
pub fn validate(candidate: &CandidateProject) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_required(&mut violations, "name", &candidate.name);
    check_required(&mut violations, "projectType", &candidate.project_type);
    check_required(&mut violations, "source", &candidate.source);
    check_tag(
        &mut violations,
        EnumField::ProjectType,
        Some(&candidate.project_type),
    );

    violations.extend(validate_kind(&KindFields {
        project_type: &candidate.project_type,
        composition: candidate.composition.as_deref(),
        function: candidate.function.as_deref(),
        leader: candidate.leader.as_deref(),
        start_date: candidate.start_date,
        follow_up_weeks: candidate.follow_up_weeks,
    }));

    check_required(&mut violations, "department", &candidate.department);
    check_required(&mut violations, "importance", &candidate.importance);
    check_required(&mut violations, "status", &candidate.status);
    if candidate.created_by.is_none() {
        violations.push(Violation::new("createdBy", "createdBy is required"));
    }
    check_tag(&mut violations, EnumField::Department, Some(&candidate.department));
    check_tag(&mut violations, EnumField::Source, Some(&candidate.source));
    check_tag(&mut violations, EnumField::Importance, Some(&candidate.importance));
    check_tag(&mut violations, EnumField::Status, Some(&candidate.status));
    check_tag(&mut violations, EnumField::Leader, candidate.leader.as_deref());
    check_tag(
        &mut violations,
        EnumField::TransformRequirement,
        candidate.transform_requirement.as_deref(),
    );
    check_tag(
        &mut violations,
        EnumField::TransformProgress,
        candidate.transform_progress.as_deref(),
    );

    violations
}
