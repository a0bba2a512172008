//! Enum Registry
//!
//! Closed vocabularies for every enumerated project field. Each vocabulary
//! is a plain Rust enum whose wire form is a kebab-case tag and whose
//! display form is a human-readable label.
//!
//! ```text
//! vocabulary!(Importance as EnumField::Importance, {
//!     VeryImportant => ("very-important", "非常重要"),
//!     ...
//! });
//! ```
//!
//! Adding a tag means adding one line to the matching invocation in
//! `vocabularies.rs`; lookups, parsing and serde follow automatically.

use std::borrow::Cow;
use std::fmt;

/// A tag that is not part of the field's vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} tag: '{tag}'")]
pub struct UnknownTag {
    pub field: EnumField,
    pub tag: String,
}

/// Generates a closed vocabulary enum from `(Variant => ("tag", "label"))` lines.
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident as $field:expr, {
            $( $(#[$vmeta:meta])* $variant:ident => ($tag:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every tag in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub(crate) const ENTRIES: &'static [(&'static str, &'static str)] =
                &[$(($tag, $label)),+];

            /// Wire tag
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            /// Display label
            pub const fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::registry::UnknownTag;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($name::$variant),)+
                    _ => Err($crate::registry::UnknownTag {
                        field: $field,
                        tag: s.to_string(),
                    }),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let tag = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
                tag.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// Defined above the module so its invocations are in textual scope.
mod vocabularies;

pub use vocabularies::{
    AiReportStatus, Department, Importance, Leader, ProjectSource, ProjectStatus, ProjectType,
    TransformProgress, TransformRequirement,
};

/// Enumerated fields of the unified project record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnumField {
    ProjectType,
    Department,
    Source,
    Importance,
    Status,
    TransformRequirement,
    TransformProgress,
    Leader,
    AiReportStatus,
}

impl EnumField {
    pub const ALL: &'static [EnumField] = &[
        EnumField::ProjectType,
        EnumField::Department,
        EnumField::Source,
        EnumField::Importance,
        EnumField::Status,
        EnumField::TransformRequirement,
        EnumField::TransformProgress,
        EnumField::Leader,
        EnumField::AiReportStatus,
    ];

    /// Field name as stored in the unified document
    pub const fn field_name(&self) -> &'static str {
        match self {
            EnumField::ProjectType => "projectType",
            EnumField::Department => "department",
            EnumField::Source => "source",
            EnumField::Importance => "importance",
            EnumField::Status => "status",
            EnumField::TransformRequirement => "transformRequirement",
            EnumField::TransformProgress => "transformProgress",
            EnumField::Leader => "leader",
            EnumField::AiReportStatus => "aiReport.status",
        }
    }

    fn entries(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            EnumField::ProjectType => ProjectType::ENTRIES,
            EnumField::Department => Department::ENTRIES,
            EnumField::Source => ProjectSource::ENTRIES,
            EnumField::Importance => Importance::ENTRIES,
            EnumField::Status => ProjectStatus::ENTRIES,
            EnumField::TransformRequirement => TransformRequirement::ENTRIES,
            EnumField::TransformProgress => TransformProgress::ENTRIES,
            EnumField::Leader => Leader::ENTRIES,
            EnumField::AiReportStatus => AiReportStatus::ENTRIES,
        }
    }
}

impl fmt::Display for EnumField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Display label for a tag, or the raw tag when it is not in the vocabulary
pub fn label_for<'a>(field: EnumField, tag: &'a str) -> Cow<'a, str> {
    field
        .entries()
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, label)| Cow::Borrowed(*label))
        .unwrap_or(Cow::Borrowed(tag))
}

/// Whether `tag` belongs to the field's vocabulary
pub fn is_valid(field: EnumField, tag: &str) -> bool {
    field.entries().iter().any(|(t, _)| *t == tag)
}

/// All tags of a field, in declaration order
pub fn tags(field: EnumField) -> impl Iterator<Item = &'static str> {
    field.entries().iter().map(|(tag, _)| *tag)
}

/// Reverse lookup from a display label to its tag
pub fn tag_for_label(field: EnumField, label: &str) -> Option<&'static str> {
    let label = label.trim();
    field
        .entries()
        .iter()
        .find(|(_, l)| *l == label)
        .map(|(tag, _)| *tag)
}
