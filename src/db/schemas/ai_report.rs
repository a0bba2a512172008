//! AI report sub-record
//!
//! Written by the external report generator; stored verbatim here.

use bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::registry::AiReportStatus;

/// Embedded AI report state of a project
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiReport {
    /// Location of the generated report, opaque to this crate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,

    #[serde(default)]
    pub status: AiReportStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_generated_at: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generated_at: Option<DateTime>,
}
