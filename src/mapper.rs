//! Field Mapper
//!
//! Translates each legacy record shape into a [`CandidateProject`]: a flat,
//! loosely typed unified record that the validator can inspect field by
//! field. Both mappers are total. A legacy record missing any field still
//! maps; whatever is missing shows up later as a validation violation.

use bson::{oid::ObjectId, DateTime};

use crate::db::schemas::{
    legacy_id_string, AiReport, ClinicalDetails, LegacyAiReport, LegacyOtherProjectDoc,
    LegacyOtherStatus, LegacyPreparationDoc, LegacyPreparationStatus, PreparationDetails,
    ProjectDoc, ProjectKind,
};
use crate::registry::{
    self, Department, EnumField, Importance, ProjectSource, ProjectStatus, ProjectType,
    TransformRequirement, UnknownTag,
};
use crate::validator::{self, Violation};

/// Unified record before validation
///
/// Enumerated fields are still plain strings so unknown tags survive long
/// enough to be reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateProject {
    /// Legacy `_id`, kept for failure reports and provenance
    pub legacy_id: Option<String>,

    pub name: String,
    pub project_type: String,
    pub department: String,
    pub source: String,
    pub importance: String,
    pub status: String,
    pub leader: Option<String>,

    pub indication: Option<String>,
    pub transform_requirement: Option<String>,
    pub transform_progress: Option<String>,
    pub hospital_doctor: Option<String>,
    pub patent: Option<String>,
    pub clinical_data: Option<String>,
    pub market_size: Option<String>,
    pub competitor_status: Option<String>,
    pub conclusion: Option<String>,

    pub composition: Option<String>,
    pub function: Option<String>,
    pub specification: Option<String>,
    pub duration: Option<String>,
    pub record_number: Option<String>,

    pub start_date: Option<DateTime>,
    pub follow_up_weeks: Option<i64>,

    pub attachments: Vec<ObjectId>,
    pub create_time: Option<DateTime>,
    pub update_time: Option<DateTime>,
    pub created_by: Option<ObjectId>,
    pub ai_report: AiReport,
}

/// Trimmed registry tag for `value`, accepting display labels too.
/// Values that match neither are passed through for the validator to flag.
fn normalize_tag(field: EnumField, value: &str) -> String {
    let value = value.trim();
    if registry::is_valid(field, value) {
        return value.to_string();
    }
    registry::tag_for_label(field, value)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn tag_or(field: EnumField, value: Option<String>, default: &str) -> String {
    non_empty(value)
        .map(|v| normalize_tag(field, &v))
        .unwrap_or_else(|| default.to_string())
}

fn preparation_status(legacy: Option<&str>) -> ProjectStatus {
    match legacy.and_then(LegacyPreparationStatus::parse) {
        Some(LegacyPreparationStatus::Active | LegacyPreparationStatus::Paused) => {
            ProjectStatus::EarlyStage
        }
        Some(LegacyPreparationStatus::Completed) => ProjectStatus::MarketProduct,
        None => ProjectStatus::EarlyStage,
    }
}

fn other_status(legacy: Option<&str>) -> ProjectStatus {
    match legacy.and_then(LegacyOtherStatus::parse) {
        Some(LegacyOtherStatus::InitialAssessment) | None => ProjectStatus::EarlyStage,
        Some(LegacyOtherStatus::ProjectApproval) => ProjectStatus::Preclinical,
        Some(LegacyOtherStatus::Implementation) => ProjectStatus::ClinicalStage,
    }
}

fn other_importance(legacy: Option<&str>) -> Importance {
    legacy
        .and_then(|tag| tag.trim().parse::<Importance>().ok())
        .unwrap_or(Importance::Normal)
}

/// Map an internal preparation record
pub fn map_internal_preparation(legacy: LegacyPreparationDoc) -> CandidateProject {
    CandidateProject {
        legacy_id: legacy_id_string(legacy.id.as_ref()),
        name: legacy.name.unwrap_or_default(),
        project_type: ProjectType::InternalPreparation.as_str().to_string(),
        department: tag_or(
            EnumField::Department,
            legacy.department,
            Department::default().as_str(),
        ),
        source: tag_or(
            EnumField::Source,
            legacy.source,
            ProjectSource::default().as_str(),
        ),
        // The legacy shape had no notion of importance
        importance: Importance::VeryImportant.as_str().to_string(),
        status: preparation_status(legacy.status.as_deref())
            .as_str()
            .to_string(),
        leader: non_empty(legacy.leader).map(|l| normalize_tag(EnumField::Leader, &l)),
        indication: legacy.indication,
        patent: legacy.patent,
        composition: legacy.composition,
        function: legacy.function,
        specification: legacy.specification,
        duration: legacy.duration,
        record_number: legacy.record_number,
        attachments: legacy.attachments.unwrap_or_default(),
        create_time: legacy.create_time,
        update_time: legacy.update_time,
        created_by: legacy.created_by,
        ai_report: legacy
            .ai_report
            .map(LegacyAiReport::into_report)
            .unwrap_or_default(),
        ..Default::default()
    }
}

/// Map a generic (type-2) project record
pub fn map_other_project(legacy: LegacyOtherProjectDoc) -> CandidateProject {
    let start_date = legacy.start_date();
    let follow_up_weeks = legacy.follow_up_weeks();

    CandidateProject {
        legacy_id: legacy_id_string(legacy.id.as_ref()),
        name: legacy.name.unwrap_or_default(),
        project_type: ProjectType::Other.as_str().to_string(),
        department: tag_or(
            EnumField::Department,
            legacy.department,
            Department::default().as_str(),
        ),
        source: tag_or(
            EnumField::Source,
            legacy.source,
            ProjectSource::default().as_str(),
        ),
        importance: other_importance(legacy.importance.as_deref())
            .as_str()
            .to_string(),
        status: other_status(legacy.status.as_deref()).as_str().to_string(),
        leader: non_empty(legacy.leader).map(|l| normalize_tag(EnumField::Leader, &l)),
        indication: legacy.indication,
        // transformMethod is free text with no structured equivalent
        transform_requirement: Some(TransformRequirement::ToBeDetermined.as_str().to_string()),
        transform_progress: non_empty(legacy.transform_progress)
            .map(|p| normalize_tag(EnumField::TransformProgress, &p))
            .filter(|p| registry::is_valid(EnumField::TransformProgress, p)),
        hospital_doctor: legacy.hospital_pi,
        patent: legacy.patent,
        clinical_data: legacy.clinical_data,
        market_size: legacy.market_size,
        competitor_status: legacy.competitor_status,
        conclusion: legacy.project_conclusion,
        start_date,
        follow_up_weeks,
        attachments: legacy.attachments.unwrap_or_default(),
        create_time: legacy.create_time,
        update_time: legacy.update_time,
        created_by: legacy.created_by,
        ai_report: legacy
            .ai_report
            .map(LegacyAiReport::into_report)
            .unwrap_or_default(),
        ..Default::default()
    }
}

fn parse_tag<T>(value: &str) -> Result<T, Violation>
where
    T: std::str::FromStr<Err = UnknownTag>,
{
    value
        .trim()
        .parse()
        .map_err(|e: UnknownTag| Violation::new(e.field.field_name(), e.to_string()))
}

fn parse_optional<T>(value: Option<&str>) -> Result<Option<T>, Violation>
where
    T: std::str::FromStr<Err = UnknownTag>,
{
    value.map(parse_tag::<T>).transpose()
}

impl CandidateProject {
    /// Validate and convert into a typed unified document
    pub fn into_project(self) -> Result<ProjectDoc, Vec<Violation>> {
        let violations = validator::validate(&self);
        if !violations.is_empty() {
            return Err(violations);
        }
        self.build().map_err(|v| vec![v])
    }

    fn build(self) -> Result<ProjectDoc, Violation> {
        let project_type: ProjectType = parse_tag(&self.project_type)?;
        let leader = parse_optional(self.leader.as_deref())?;

        let kind = if project_type.is_internal_preparation() {
            ProjectKind::InternalPreparation(PreparationDetails {
                composition: self.composition.unwrap_or_default(),
                function: self.function.unwrap_or_default(),
                leader,
            })
        } else {
            let leader = leader.ok_or_else(|| Violation::new("leader", "leader is required"))?;
            let start_date = self
                .start_date
                .ok_or_else(|| Violation::new("startDate", "startDate is required"))?;
            let weeks = self
                .follow_up_weeks
                .and_then(|w| u32::try_from(w).ok())
                .ok_or_else(|| {
                    Violation::new("followUpWeeks", "followUpWeeks must fit in 32 bits")
                })?;
            ProjectKind::Clinical(ClinicalDetails::new(project_type, leader, start_date, weeks)?)
        };

        let created_by = self
            .created_by
            .ok_or_else(|| Violation::new("createdBy", "createdBy is required"))?;

        let mut project = ProjectDoc::new(
            self.name,
            parse_tag(&self.department)?,
            parse_tag(&self.source)?,
            parse_tag(&self.importance)?,
            parse_tag(&self.status)?,
            kind,
            created_by,
        );
        project.indication = self.indication;
        project.transform_requirement = parse_optional(self.transform_requirement.as_deref())?;
        project.transform_progress = parse_optional(self.transform_progress.as_deref())?;
        project.hospital_doctor = self.hospital_doctor;
        project.patent = self.patent;
        project.clinical_data = self.clinical_data;
        project.market_size = self.market_size;
        project.competitor_status = self.competitor_status;
        project.conclusion = self.conclusion;
        project.specification = self.specification;
        project.duration = self.duration;
        project.record_number = self.record_number;
        project.attachments = self.attachments;
        project.create_time = self.create_time;
        project.update_time = self.update_time;
        project.ai_report = self.ai_report;
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AiReportStatus, Leader};
    use bson::Bson;

    #[test]
    fn test_preparation_status_table() {
        let cases = [
            ("active", "early-stage"),
            ("paused", "early-stage"),
            ("completed", "market-product"),
            ("archived", "early-stage"),
            ("", "early-stage"),
        ];
        for (legacy, unified) in cases {
            let mapped = map_internal_preparation(LegacyPreparationDoc {
                status: Some(legacy.to_string()),
                ..Default::default()
            });
            assert_eq!(mapped.status, unified, "legacy status '{}'", legacy);
        }

        let mapped = map_internal_preparation(LegacyPreparationDoc::default());
        assert_eq!(mapped.status, "early-stage");
    }

    #[test]
    fn test_other_status_table() {
        let cases = [
            ("initial-assessment", "early-stage"),
            ("project-approval", "preclinical"),
            ("implementation", "clinical-stage"),
            ("active", "early-stage"),
        ];
        for (legacy, unified) in cases {
            let mapped = map_other_project(LegacyOtherProjectDoc {
                status: Some(legacy.to_string()),
                ..Default::default()
            });
            assert_eq!(mapped.status, unified, "legacy status '{}'", legacy);
        }
    }

    #[test]
    fn test_preparation_defaults() {
        let mapped = map_internal_preparation(LegacyPreparationDoc::default());
        assert_eq!(mapped.project_type, "internal-preparation");
        assert_eq!(mapped.importance, "very-important");
        assert_eq!(mapped.department, "transfer-investment-dept-1");
        assert_eq!(mapped.source, "hospital");
        assert_eq!(mapped.ai_report.status, AiReportStatus::Idle);
        assert!(mapped.attachments.is_empty());
    }

    #[test]
    fn test_preparation_pass_through() {
        let attachment = ObjectId::new();
        let creator = ObjectId::new();
        let created = DateTime::from_millis(1_600_000_000_000);
        let mapped = map_internal_preparation(LegacyPreparationDoc {
            id: Some(Bson::String("prep-7".into())),
            department: Some("transfer-investment-dept-3".into()),
            composition: Some("柴胡".into()),
            function: Some("疏肝".into()),
            specification: Some("6g/袋".into()),
            duration: Some("24个月".into()),
            record_number: Some("Z2020".into()),
            patent: Some("ZL2019".into()),
            attachments: Some(vec![attachment]),
            create_time: Some(created),
            created_by: Some(creator),
            ..Default::default()
        });

        assert_eq!(mapped.legacy_id.as_deref(), Some("prep-7"));
        assert_eq!(mapped.department, "transfer-investment-dept-3");
        assert_eq!(mapped.specification.as_deref(), Some("6g/袋"));
        assert_eq!(mapped.duration.as_deref(), Some("24个月"));
        assert_eq!(mapped.record_number.as_deref(), Some("Z2020"));
        assert_eq!(mapped.patent.as_deref(), Some("ZL2019"));
        assert_eq!(mapped.attachments, vec![attachment]);
        assert_eq!(mapped.create_time, Some(created));
        assert_eq!(mapped.created_by, Some(creator));
    }

    #[test]
    fn test_other_field_renames_and_placeholder() {
        let mapped = map_other_project(LegacyOtherProjectDoc {
            hospital_pi: Some("刘主任".into()),
            project_conclusion: Some("建议推进".into()),
            transform_method: Some("专利许可加里程碑付款".into()),
            importance: Some("important".into()),
            ..Default::default()
        });

        assert_eq!(mapped.project_type, "other");
        assert_eq!(mapped.hospital_doctor.as_deref(), Some("刘主任"));
        assert_eq!(mapped.conclusion.as_deref(), Some("建议推进"));
        assert_eq!(mapped.transform_requirement.as_deref(), Some("to-be-determined"));
        assert_eq!(mapped.importance, "important");
    }

    #[test]
    fn test_other_importance_defaults_to_normal() {
        for legacy in [None, Some("urgent"), Some("")] {
            let mapped = map_other_project(LegacyOtherProjectDoc {
                importance: legacy.map(str::to_string),
                ..Default::default()
            });
            assert_eq!(mapped.importance, "normal");
        }
    }

    #[test]
    fn test_leader_labels_are_normalized() {
        let mapped = map_other_project(LegacyOtherProjectDoc {
            leader: Some("王立言".into()),
            ..Default::default()
        });
        assert_eq!(mapped.leader.as_deref(), Some("wang-liyan"));

        let mapped = map_other_project(LegacyOtherProjectDoc {
            leader: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(mapped.leader, None);
    }

    #[test]
    fn test_unknown_transform_progress_is_dropped() {
        let mapped = map_other_project(LegacyOtherProjectDoc {
            transform_progress: Some("已签约".into()),
            ..Default::default()
        });
        assert_eq!(mapped.transform_progress.as_deref(), Some("contract-signed"));

        let mapped = map_other_project(LegacyOtherProjectDoc {
            transform_progress: Some("谈了一半".into()),
            ..Default::default()
        });
        assert_eq!(mapped.transform_progress, None);
    }

    #[test]
    fn test_into_project_builds_typed_record() {
        let mapped = map_other_project(LegacyOtherProjectDoc {
            name: Some("AI辅助诊断系统".into()),
            status: Some("project-approval".into()),
            leader: Some("王立言".into()),
            start_date: Some(Bson::DateTime(DateTime::from_millis(1_704_067_200_000))),
            follow_up_weeks: Some(Bson::Int32(12)),
            created_by: Some(ObjectId::new()),
            ..Default::default()
        });

        let project = mapped.into_project().unwrap();
        assert_eq!(project.status, ProjectStatus::Preclinical);
        assert_eq!(project.transform_requirement, Some(TransformRequirement::ToBeDetermined));
        match &project.kind {
            ProjectKind::Clinical(details) => {
                assert_eq!(details.leader, Leader::WangLiyan);
                assert_eq!(details.follow_up_weeks, 12);
                assert_eq!(details.project_type(), ProjectType::Other);
            }
            other => panic!("expected clinical project, got {:?}", other),
        }
    }

    #[test]
    fn test_into_project_returns_violations() {
        let mapped = map_internal_preparation(LegacyPreparationDoc {
            name: Some("舒肝和胃丸".into()),
            status: Some("completed".into()),
            composition: Some("".into()),
            function: Some("健脾".into()),
            created_by: Some(ObjectId::new()),
            ..Default::default()
        });
        assert_eq!(mapped.status, "market-product");

        let violations = mapped.into_project().unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "composition");
    }

    #[test]
    fn test_record_without_creator_is_not_persistable() {
        let mapped = map_internal_preparation(LegacyPreparationDoc {
            name: Some("清热解毒颗粒".into()),
            composition: Some("金银花".into()),
            function: Some("清热".into()),
            ..Default::default()
        });
        assert_eq!(mapped.created_by, None);

        let violations = mapped.into_project().unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "createdBy");
    }

    #[test]
    fn test_oversized_follow_up_is_reported_as_such() {
        let mapped = map_other_project(LegacyOtherProjectDoc {
            name: Some("AI辅助诊断系统".into()),
            leader: Some("wang-liyan".into()),
            start_date: Some(Bson::String("2024-01-01".into())),
            follow_up_weeks: Some(Bson::Int64(5_000_000_000)),
            created_by: Some(ObjectId::new()),
            ..Default::default()
        });

        let violations = mapped.into_project().unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "followUpWeeks");
        assert!(violations[0].message.contains("at most"));
    }

    #[test]
    fn test_unknown_ai_report_status_does_not_block_mapping() {
        let legacy: LegacyOtherProjectDoc = bson::from_document(bson::doc! {
            "name": "AI辅助诊断系统",
            "aiReport": { "status": "pending" },
        })
        .unwrap();
        let mapped = map_other_project(legacy);
        assert_eq!(mapped.ai_report.status, AiReportStatus::Idle);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn text() -> impl Strategy<Value = Option<String>> {
            prop::option::of(".{0,12}")
        }

        prop_compose! {
            fn sparse_preparation()
                (name in text(), department in text(), source in text(), status in text(),
                 leader in text(), composition in text(), function in text(),
                 record_number in text(), with_creator in any::<bool>())
                -> LegacyPreparationDoc
            {
                LegacyPreparationDoc {
                    name,
                    department,
                    source,
                    status,
                    leader,
                    composition,
                    function,
                    record_number,
                    created_by: with_creator.then(ObjectId::new),
                    ..Default::default()
                }
            }
        }

        prop_compose! {
            fn sparse_other()
                (name in text(), importance in text(), status in text(), leader in text(),
                 start_date in text(), weeks in prop::option::of(any::<i64>()),
                 progress in text(), with_creator in any::<bool>())
                -> LegacyOtherProjectDoc
            {
                LegacyOtherProjectDoc {
                    name,
                    importance,
                    status,
                    leader,
                    start_date: start_date.map(Bson::String),
                    follow_up_weeks: weeks.map(Bson::Int64),
                    transform_progress: progress,
                    created_by: with_creator.then(ObjectId::new),
                    ..Default::default()
                }
            }
        }

        proptest! {
            #[test]
            fn prop_unknown_preparation_status_is_early_stage(status in ".*") {
                let mapped = map_internal_preparation(LegacyPreparationDoc {
                    status: Some(status.clone()),
                    ..Default::default()
                });
                let expected = if status.trim() == "completed" { "market-product" } else { "early-stage" };
                prop_assert_eq!(mapped.status, expected);
            }

            #[test]
            fn prop_unknown_other_status_is_early_stage(status in ".*") {
                let mapped = map_other_project(LegacyOtherProjectDoc {
                    status: Some(status.clone()),
                    ..Default::default()
                });
                let expected = match status.trim() {
                    "project-approval" => "preclinical",
                    "implementation" => "clinical-stage",
                    _ => "early-stage",
                };
                prop_assert_eq!(mapped.status, expected);
            }

            #[test]
            fn prop_preparation_mapping_is_total(legacy in sparse_preparation()) {
                let mapped = map_internal_preparation(legacy);
                prop_assert_eq!(mapped.project_type.as_str(), "internal-preparation");
                prop_assert_eq!(mapped.importance.as_str(), "very-important");
                prop_assert!(["early-stage", "market-product"].contains(&mapped.status.as_str()));
                prop_assert!(!mapped.department.is_empty());
                prop_assert!(!mapped.source.is_empty());

                // Either a typed record or a non-empty list of reasons
                match mapped.into_project() {
                    Ok(project) => {
                        prop_assert!(project.project_type().is_internal_preparation());
                    }
                    Err(violations) => {
                        prop_assert!(!violations.is_empty());
                    }
                }
            }

            #[test]
            fn prop_other_mapping_is_total(legacy in sparse_other()) {
                let mapped = map_other_project(legacy);
                prop_assert_eq!(mapped.project_type.as_str(), "other");
                prop_assert_eq!(mapped.transform_requirement.as_deref(), Some("to-be-determined"));
                prop_assert!(registry::is_valid(EnumField::Importance, &mapped.importance));
                if let Some(progress) = mapped.transform_progress.as_deref() {
                    prop_assert!(registry::is_valid(EnumField::TransformProgress, progress));
                }

                match mapped.into_project() {
                    Ok(project) => {
                        prop_assert_eq!(project.project_type(), ProjectType::Other);
                    }
                    Err(violations) => {
                        prop_assert!(!violations.is_empty());
                    }
                }
            }
        }
    }
}
