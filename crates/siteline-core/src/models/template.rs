//! Inspection template snapshot.
//!
//! The template is captured once when an inspection is created and stored as
//! a frozen JSON document, so later template edits on the server never
//! reshape an inspection already in progress. The serde layout matches the
//! server document (camelCase) because the snapshot round-trips verbatim.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Declared type of a template field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Flag,
    Choice,
    Rating,
    Condition,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Flag => "flag",
            Self::Choice => "choice",
            Self::Rating => "rating",
            Self::Condition => "condition",
        }
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "flag" => Ok(Self::Flag),
            "choice" => Ok(Self::Choice),
            "rating" => Ok(Self::Rating),
            "condition" => Ok(Self::Condition),
            other => Err(Error::InvalidInput(format!("Unknown field type: {other}"))),
        }
    }
}

/// One field declared by a template section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateField {
    /// Stable key used in entry natural keys.
    pub key: String,
    /// Human-readable label.
    pub label: String,
    /// Declared value type.
    pub field_type: FieldType,
    /// Allowed values for `choice` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// One section of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSection {
    /// Stable reference used in entry natural keys.
    pub section_ref: String,
    /// Human-readable title.
    pub title: String,
    /// Fields in display order.
    pub fields: Vec<TemplateField>,
}

/// Frozen copy of the template an inspection was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSnapshot {
    /// Template name at capture time.
    pub name: String,
    /// Sections in display order.
    pub sections: Vec<TemplateSection>,
}

impl TemplateSnapshot {
    /// Look up the declared type for a (section, field) pair.
    #[must_use]
    pub fn field_type(&self, section_ref: &str, field_key: &str) -> Option<FieldType> {
        self.sections
            .iter()
            .find(|section| section.section_ref == section_ref)?
            .fields
            .iter()
            .find(|field| field.key == field_key)
            .map(|field| field.field_type)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_snapshot() -> TemplateSnapshot {
        TemplateSnapshot {
            name: "Move-in inspection".to_string(),
            sections: vec![TemplateSection {
                section_ref: "kitchen".to_string(),
                title: "Kitchen".to_string(),
                fields: vec![
                    TemplateField {
                        key: "sink".to_string(),
                        label: "Sink".to_string(),
                        field_type: FieldType::Condition,
                        options: Vec::new(),
                    },
                    TemplateField {
                        key: "smoke-alarm".to_string(),
                        label: "Smoke alarm".to_string(),
                        field_type: FieldType::Flag,
                        options: Vec::new(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_field_type_lookup() {
        let snapshot = sample_snapshot();
        assert_eq!(
            snapshot.field_type("kitchen", "sink"),
            Some(FieldType::Condition)
        );
        assert_eq!(snapshot.field_type("kitchen", "oven"), None);
        assert_eq!(snapshot.field_type("garage", "sink"), None);
    }

    #[test]
    fn test_snapshot_round_trips_server_shape() {
        let json = r#"{
            "name": "Move-in inspection",
            "sections": [{
                "sectionRef": "kitchen",
                "title": "Kitchen",
                "fields": [
                    {"key": "sink", "label": "Sink", "fieldType": "condition"},
                    {"key": "smoke-alarm", "label": "Smoke alarm", "fieldType": "flag"}
                ]
            }]
        }"#;

        let parsed: TemplateSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, sample_snapshot());
    }

    #[test]
    fn test_field_type_parse() {
        assert_eq!("rating".parse::<FieldType>().unwrap(), FieldType::Rating);
        assert!("date".parse::<FieldType>().is_err());
    }
}
