//! Inspection entry model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::util::strip_scheme;

use super::ids::RecordId;
use super::status::SyncStatus;
use super::template::{FieldType, TemplateField, TemplateSnapshot};

/// Opaque captured value for one field, stored as-is.
///
/// The payload is not interpreted at the storage layer; readers decode it
/// against the template's declared field type via [`FieldValue::decode`].
pub type ValuePayload = Value;

/// One field's captured value within an inspection.
///
/// At most one entry exists per (inspection, section, field); the store
/// enforces this with a unique constraint over the derived key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionEntry {
    /// Local UUID until the server assigns an id, then the server id.
    pub id: RecordId,
    /// Owning inspection.
    pub inspection_id: RecordId,
    /// Template section reference.
    pub section_ref: String,
    /// Template field key.
    pub field_key: String,
    /// Captured value payload.
    pub value: ValuePayload,
    /// Free-text note.
    pub note: Option<String>,
    /// Photo references: local paths and/or server URLs.
    pub photos: Vec<String>,
    /// Maintenance required flag.
    pub maintenance_flag: bool,
    /// Marked for office review.
    pub marked_for_review: bool,
    /// Sync state relative to the server copy.
    pub sync_status: SyncStatus,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
    /// Last update timestamp (Unix ms).
    pub updated_at: i64,
}

impl InspectionEntry {
    /// Create a new locally captured entry for a template field.
    pub fn new(
        inspection_id: RecordId,
        section_ref: impl Into<String>,
        field_key: impl Into<String>,
    ) -> Result<Self> {
        let now = chrono::Utc::now().timestamp_millis();
        let entry = Self {
            id: RecordId::local(),
            inspection_id,
            section_ref: section_ref.into().trim().to_string(),
            field_key: field_key.into().trim().to_string(),
            value: Value::Null,
            note: None,
            photos: Vec::new(),
            maintenance_flag: false,
            marked_for_review: false,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check the natural-key fields are present.
    pub fn validate(&self) -> Result<()> {
        if self.inspection_id.as_str().trim().is_empty() {
            return Err(Error::InvalidInput(
                "Entry inspection_id cannot be empty".to_string(),
            ));
        }
        if self.section_ref.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Entry section_ref cannot be empty".to_string(),
            ));
        }
        if self.field_key.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Entry field_key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Natural key within the owning inspection: `{section_ref}-{field_key}`.
    #[must_use]
    pub fn derived_key(&self) -> String {
        format!("{}-{}", self.section_ref, self.field_key)
    }

    /// Apply a partial change set, bump `updated_at`, and mark pending.
    pub fn apply_changes(&mut self, changes: EntryChanges) {
        if let Some(value) = changes.value {
            self.value = value;
        }
        if let Some(note) = changes.note {
            self.note = crate::util::normalize_text_option(Some(note));
        }
        if let Some(photos) = changes.photos {
            self.photos = photos;
        }
        if let Some(flag) = changes.maintenance_flag {
            self.maintenance_flag = flag;
        }
        if let Some(flag) = changes.marked_for_review {
            self.marked_for_review = flag;
        }
        self.updated_at = chrono::Utc::now().timestamp_millis();
        self.sync_status = SyncStatus::Pending;
    }

    /// Append a photo reference unless an equivalent path is already present.
    ///
    /// Equivalence ignores the scheme prefix, so `file:///p/a.jpg` and
    /// `/p/a.jpg` count as the same reference.
    pub fn add_photo(&mut self, path: impl Into<String>) {
        let path = path.into();
        let normalized = strip_scheme(&path).to_string();
        if self
            .photos
            .iter()
            .any(|existing| strip_scheme(existing) == normalized)
        {
            return;
        }
        self.photos.push(path);
    }

    /// Decode the stored payload against the template's declared field type.
    ///
    /// Returns `Ok(None)` when no value has been captured yet. Fails with
    /// [`Error::InvalidInput`] when the field is not declared by the template
    /// or the payload does not match the declared type.
    pub fn typed_value(&self, template: &TemplateSnapshot) -> Result<Option<FieldValue>> {
        let Some(field) = template
            .sections
            .iter()
            .find(|section| section.section_ref == self.section_ref)
            .and_then(|section| {
                section
                    .fields
                    .iter()
                    .find(|field| field.key == self.field_key)
            })
        else {
            return Err(Error::InvalidInput(format!(
                "Field {} is not declared by the template",
                self.derived_key()
            )));
        };

        if self.value.is_null() {
            return Ok(None);
        }
        FieldValue::decode(field, &self.value).map(Some)
    }
}

/// Partial change set for [`InspectionEntry`]; `None` leaves a field as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryChanges {
    pub value: Option<ValuePayload>,
    pub note: Option<String>,
    pub photos: Option<Vec<String>>,
    pub maintenance_flag: Option<bool>,
    pub marked_for_review: Option<bool>,
}

impl EntryChanges {
    /// True when every field is `None`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.note.is_none()
            && self.photos.is_none()
            && self.maintenance_flag.is_none()
            && self.marked_for_review.is_none()
    }
}

/// A captured value decoded against its declared [`FieldType`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
    Choice(String),
    Rating(i64),
    Condition(serde_json::Map<String, Value>),
}

impl FieldValue {
    /// Decode a raw payload for a declared template field.
    pub fn decode(field: &TemplateField, payload: &Value) -> Result<Self> {
        let mismatch = || {
            Error::InvalidInput(format!(
                "Value for field '{}' does not match declared type {}",
                field.key,
                field.field_type.as_str()
            ))
        };

        match field.field_type {
            FieldType::Text => payload
                .as_str()
                .map(|text| Self::Text(text.to_string()))
                .ok_or_else(mismatch),
            FieldType::Number => payload.as_f64().map(Self::Number).ok_or_else(mismatch),
            FieldType::Flag => payload.as_bool().map(Self::Flag).ok_or_else(mismatch),
            FieldType::Choice => {
                let choice = payload.as_str().ok_or_else(mismatch)?;
                if !field.options.is_empty() && !field.options.iter().any(|o| o == choice) {
                    return Err(Error::InvalidInput(format!(
                        "Value '{}' is not an allowed option for field '{}'",
                        choice, field.key
                    )));
                }
                Ok(Self::Choice(choice.to_string()))
            }
            FieldType::Rating => payload.as_i64().map(Self::Rating).ok_or_else(mismatch),
            FieldType::Condition => payload
                .as_object()
                .map(|map| Self::Condition(map.clone()))
                .ok_or_else(mismatch),
        }
    }
}
