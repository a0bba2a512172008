//! Legacy project document schemas
//!
//! The two record shapes being retired. Both are read-only inputs to the
//! migration, so every field is optional and loosely typed: a legacy
//! document missing any field still decodes and still maps.

use std::fmt;

use bson::{oid::ObjectId, Bson, DateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::schemas::AiReport;
use crate::registry::{self, AiReportStatus, EnumField};

/// Default collection holding internal preparation records
pub const LEGACY_PREPARATION_COLLECTION: &str = "internalpreparationprojects";

/// Default collection holding the generic (type-2) project records
pub const LEGACY_OTHER_COLLECTION: &str = "otherprojects";

/// Which legacy collection a record came from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LegacySource {
    InternalPreparation,
    OtherProject,
}

impl LegacySource {
    /// Sources in migration order
    pub const ALL: [LegacySource; 2] = [LegacySource::InternalPreparation, LegacySource::OtherProject];

    pub fn as_str(&self) -> &'static str {
        match self {
            LegacySource::InternalPreparation => "internal-preparation",
            LegacySource::OtherProject => "other-project",
        }
    }
}

impl fmt::Display for LegacySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status vocabulary of the internal preparation records
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegacyPreparationStatus {
    Active,
    Completed,
    Paused,
}

impl LegacyPreparationStatus {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

/// Status vocabulary of the generic project records
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegacyOtherStatus {
    InitialAssessment,
    ProjectApproval,
    Implementation,
}

impl LegacyOtherStatus {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            "initial-assessment" => Some(Self::InitialAssessment),
            "project-approval" => Some(Self::ProjectApproval),
            "implementation" => Some(Self::Implementation),
            _ => None,
        }
    }
}

/// Internal preparation record as stored by the old application
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyPreparationDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub leader: Option<String>,
    pub indication: Option<String>,
    pub composition: Option<String>,
    pub function: Option<String>,
    pub specification: Option<String>,
    pub duration: Option<String>,
    /// Unique in this collection, not in the unified one
    pub record_number: Option<String>,
    pub patent: Option<String>,
    pub attachments: Option<Vec<ObjectId>>,
    pub create_time: Option<DateTime>,
    pub update_time: Option<DateTime>,
    pub created_by: Option<ObjectId>,
    pub ai_report: Option<LegacyAiReport>,
}

/// Generic (type-2) project record as stored by the old application
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyOtherProjectDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub source: Option<String>,
    pub importance: Option<String>,
    pub status: Option<String>,
    pub leader: Option<String>,
    /// Date or date string, depending on which client wrote it
    pub start_date: Option<Bson>,
    /// Integer or double, depending on which client wrote it
    pub follow_up_weeks: Option<Bson>,
    pub indication: Option<String>,
    /// Free text with no structured unified counterpart
    pub transform_method: Option<String>,
    pub transform_progress: Option<String>,
    #[serde(rename = "hospitalPI")]
    pub hospital_pi: Option<String>,
    pub patent: Option<String>,
    pub clinical_data: Option<String>,
    pub market_size: Option<String>,
    pub competitor_status: Option<String>,
    pub project_conclusion: Option<String>,
    pub attachments: Option<Vec<ObjectId>>,
    pub create_time: Option<DateTime>,
    pub update_time: Option<DateTime>,
    pub created_by: Option<ObjectId>,
    pub ai_report: Option<LegacyAiReport>,
}

impl LegacyOtherProjectDoc {
    /// Start date if it is a date or a parseable RFC 3339 / `YYYY-MM-DD` string
    pub fn start_date(&self) -> Option<DateTime> {
        match self.start_date.as_ref()? {
            Bson::DateTime(date) => Some(*date),
            Bson::String(s) => parse_date(s),
            _ => None,
        }
    }

    /// Follow-up duration in weeks if it is a whole number
    pub fn follow_up_weeks(&self) -> Option<i64> {
        match self.follow_up_weeks.as_ref()? {
            Bson::Int32(n) => Some(i64::from(*n)),
            Bson::Int64(n) => Some(*n),
            Bson::Double(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            Bson::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// AI report as stored on legacy records; `status` is free text there
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyAiReport {
    pub report_url: Option<String>,
    pub status: Option<String>,
    pub first_generated_at: Option<DateTime>,
    pub last_generated_at: Option<DateTime>,
}

impl LegacyAiReport {
    /// Unified sub-record; a status outside the vocabulary becomes `idle`
    pub fn into_report(self) -> AiReport {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => AiReportStatus::default(),
            Some(raw) => raw
                .parse::<AiReportStatus>()
                .ok()
                .or_else(|| {
                    registry::tag_for_label(EnumField::AiReportStatus, raw)
                        .and_then(|tag| tag.parse::<AiReportStatus>().ok())
                })
                .unwrap_or_else(|| {
                    warn!(status = raw, "Unknown legacy aiReport.status, using idle");
                    AiReportStatus::default()
                }),
        };

        AiReport {
            report_url: self.report_url,
            status,
            first_generated_at: self.first_generated_at,
            last_generated_at: self.last_generated_at,
        }
    }
}

fn parse_date(s: &str) -> Option<DateTime> {
    let s = s.trim();
    if let Ok(date) = DateTime::parse_rfc3339_str(s) {
        return Some(date);
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| DateTime::from_chrono(dt.and_utc()))
}

/// Render a legacy `_id` for logs and failure records
pub fn legacy_id_string(id: Option<&Bson>) -> Option<String> {
    match id? {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_empty_document_decodes() {
        let prep: LegacyPreparationDoc = bson::from_document(doc! {}).unwrap();
        assert!(prep.name.is_none());
        assert!(prep.attachments.is_none());

        let other: LegacyOtherProjectDoc = bson::from_document(doc! {}).unwrap();
        assert!(other.start_date().is_none());
        assert!(other.follow_up_weeks().is_none());
    }

    #[test]
    fn test_hospital_pi_field_name() {
        let other: LegacyOtherProjectDoc = bson::from_document(doc! {
            "hospitalPI": "刘主任",
            "projectConclusion": "建议推进",
        })
        .unwrap();
        assert_eq!(other.hospital_pi.as_deref(), Some("刘主任"));
        assert_eq!(other.project_conclusion.as_deref(), Some("建议推进"));
    }

    #[test]
    fn test_start_date_accepts_dates_and_strings() {
        let date = DateTime::from_millis(1_704_067_200_000);
        let mut other = LegacyOtherProjectDoc {
            start_date: Some(Bson::DateTime(date)),
            ..Default::default()
        };
        assert_eq!(other.start_date(), Some(date));

        other.start_date = Some(Bson::String("2024-01-01".into()));
        assert_eq!(other.start_date(), Some(date));

        other.start_date = Some(Bson::String("2024-01-01T00:00:00Z".into()));
        assert_eq!(other.start_date(), Some(date));

        other.start_date = Some(Bson::String("next spring".into()));
        assert_eq!(other.start_date(), None);
    }

    #[test]
    fn test_follow_up_weeks_numeric_forms() {
        let mut other = LegacyOtherProjectDoc {
            follow_up_weeks: Some(Bson::Double(12.0)),
            ..Default::default()
        };
        assert_eq!(other.follow_up_weeks(), Some(12));

        other.follow_up_weeks = Some(Bson::Double(2.5));
        assert_eq!(other.follow_up_weeks(), None);

        other.follow_up_weeks = Some(Bson::Int32(8));
        assert_eq!(other.follow_up_weeks(), Some(8));

        other.follow_up_weeks = Some(Bson::String(" 6 ".into()));
        assert_eq!(other.follow_up_weeks(), Some(6));
    }

    #[test]
    fn test_unknown_ai_report_status_falls_back_to_idle() {
        let prep: LegacyPreparationDoc = bson::from_document(doc! {
            "aiReport": { "status": "pending", "reportUrl": "https://reports.example/1.pdf" },
        })
        .unwrap();
        let report = prep.ai_report.unwrap().into_report();
        assert_eq!(report.status, AiReportStatus::Idle);
        assert_eq!(report.report_url.as_deref(), Some("https://reports.example/1.pdf"));

        let labelled = LegacyAiReport {
            status: Some("生成中".into()),
            ..Default::default()
        };
        assert_eq!(labelled.into_report().status, AiReportStatus::Generating);

        let known = LegacyAiReport {
            status: Some("completed".into()),
            ..Default::default()
        };
        assert_eq!(known.into_report().status, AiReportStatus::Completed);
    }

    #[test]
    fn test_legacy_status_parse() {
        assert_eq!(LegacyPreparationStatus::parse("paused"), Some(LegacyPreparationStatus::Paused));
        assert_eq!(LegacyPreparationStatus::parse("archived"), None);
        assert_eq!(
            LegacyOtherStatus::parse("implementation"),
            Some(LegacyOtherStatus::Implementation)
        );
    }

    #[test]
    fn test_legacy_id_string() {
        let oid = ObjectId::new();
        assert_eq!(legacy_id_string(Some(&Bson::ObjectId(oid))), Some(oid.to_hex()));
        assert_eq!(legacy_id_string(Some(&Bson::String("p-1".into()))), Some("p-1".into()));
        assert_eq!(legacy_id_string(None), None);
    }
}
