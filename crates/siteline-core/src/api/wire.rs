//! Wire types for the inspection API.
//!
//! The server speaks camelCase JSON. Inbound payloads land in `Wire*`
//! structs and convert into domain types via `TryFrom`, picking up
//! `synced` status on the way in. Outbound request bodies borrow from the
//! domain types and filter photo lists down to server URLs; device-local
//! paths never leave the device.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{Inspection, InspectionEntry, RecordId, SyncStatus, TemplateSnapshot};
use crate::util::{compact_text, is_http_url, normalize_text_option};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInspection {
    pub id: String,
    pub owner_id: String,
    pub target_ref: String,
    pub template: TemplateSnapshot,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

impl TryFrom<WireInspection> for Inspection {
    type Error = Error;

    fn try_from(wire: WireInspection) -> Result<Self> {
        Ok(Self {
            id: RecordId::from(wire.id),
            owner_id: wire.owner_id,
            target_ref: wire.target_ref,
            template: wire.template,
            status: wire.status.parse()?,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            sync_status: SyncStatus::Synced,
            is_deleted: wire.is_deleted,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntry {
    pub id: String,
    pub inspection_id: String,
    pub section_ref: String,
    pub field_key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub maintenance_flag: bool,
    #[serde(default)]
    pub marked_for_review: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<WireEntry> for InspectionEntry {
    type Error = Error;

    fn try_from(wire: WireEntry) -> Result<Self> {
        let entry = InspectionEntry {
            id: RecordId::from(wire.id),
            inspection_id: RecordId::from(wire.inspection_id),
            section_ref: wire.section_ref,
            field_key: wire.field_key,
            value: wire.value,
            note: normalize_text_option(wire.note),
            photos: wire.photos,
            maintenance_flag: wire.maintenance_flag,
            marked_for_review: wire.marked_for_review,
            sync_status: SyncStatus::Synced,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        };
        entry.validate()?;
        Ok(entry)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest<'a> {
    pub inspection_id: &'a str,
    pub section_ref: &'a str,
    pub field_key: &'a str,
    pub value: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'a str>,
    pub photos: Vec<&'a str>,
    pub maintenance_flag: bool,
    pub marked_for_review: bool,
    pub updated_at: i64,
}

impl<'a> From<&'a InspectionEntry> for CreateEntryRequest<'a> {
    fn from(entry: &'a InspectionEntry) -> Self {
        Self {
            inspection_id: entry.inspection_id.as_str(),
            section_ref: &entry.section_ref,
            field_key: &entry.field_key,
            value: &entry.value,
            note: entry.note.as_deref(),
            photos: server_photos(&entry.photos),
            maintenance_flag: entry.maintenance_flag,
            marked_for_review: entry.marked_for_review,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryRequest<'a> {
    pub value: &'a Value,
    pub note: Option<&'a str>,
    pub photos: Vec<&'a str>,
    pub maintenance_flag: bool,
    pub marked_for_review: bool,
    pub updated_at: i64,
}

impl<'a> From<&'a InspectionEntry> for UpdateEntryRequest<'a> {
    fn from(entry: &'a InspectionEntry) -> Self {
        Self {
            value: &entry.value,
            note: entry.note.as_deref(),
            photos: server_photos(&entry.photos),
            maintenance_flag: entry.maintenance_flag,
            marked_for_review: entry.marked_for_review,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest<'a> {
    pub status: &'a str,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUploadResponse {
    pub url: Option<String>,
    pub photo_url: Option<String>,
}

impl WireUploadResponse {
    /// The durable URL, wherever the server put it.
    pub fn into_url(self) -> Result<String> {
        self.url
            .or(self.photo_url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::Api {
                status: 200,
                message: "upload response did not include a photo URL".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Pull a human-readable message out of an error response body.
pub fn parse_api_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<WireErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            let message = message.trim();
            if !message.is_empty() {
                return message.to_string();
            }
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed
    }
}

fn server_photos(photos: &[String]) -> Vec<&str> {
    photos
        .iter()
        .map(String::as_str)
        .filter(|path| is_http_url(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_wire_entry_converts_to_synced_domain_entry() {
        let wire: WireEntry = serde_json::from_value(json!({
            "id": "ent_55",
            "inspectionId": "ins_9",
            "sectionRef": "kitchen",
            "fieldKey": "sink",
            "value": {"condition": "worn"},
            "note": "  drips  ",
            "photos": ["https://cdn.example.com/a.jpg"],
            "maintenanceFlag": true,
            "createdAt": 1000,
            "updatedAt": 2000,
        }))
        .unwrap();

        let entry = InspectionEntry::try_from(wire).unwrap();
        assert_eq!(entry.id, RecordId::from("ent_55"));
        assert_eq!(entry.sync_status, SyncStatus::Synced);
        assert_eq!(entry.note.as_deref(), Some("drips"));
        assert!(entry.maintenance_flag);
        assert!(!entry.marked_for_review);
    }

    #[test]
    fn test_wire_entry_rejects_blank_natural_key() {
        let wire: WireEntry = serde_json::from_value(json!({
            "id": "ent_55",
            "inspectionId": "ins_9",
            "sectionRef": " ",
            "fieldKey": "sink",
            "createdAt": 1000,
            "updatedAt": 2000,
        }))
        .unwrap();

        assert!(matches!(
            InspectionEntry::try_from(wire),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_wire_inspection_parses_status() {
        let wire: WireInspection = serde_json::from_value(json!({
            "id": "ins_9",
            "ownerId": "acct_1",
            "targetRef": "unit-7",
            "template": {"name": "Routine", "sections": []},
            "status": "in_progress",
            "createdAt": 1000,
            "updatedAt": 2000,
        }))
        .unwrap();

        let inspection = Inspection::try_from(wire).unwrap();
        assert_eq!(inspection.status.as_str(), "in_progress");
        assert_eq!(inspection.sync_status, SyncStatus::Synced);
        assert!(!inspection.is_deleted);
    }

    #[test]
    fn test_wire_inspection_carries_soft_delete_flag() {
        let wire: WireInspection = serde_json::from_value(json!({
            "id": "ins_9",
            "ownerId": "acct_1",
            "targetRef": "unit-7",
            "template": {"name": "Routine", "sections": []},
            "status": "completed",
            "createdAt": 1000,
            "updatedAt": 2000,
            "isDeleted": true,
        }))
        .unwrap();

        let inspection = Inspection::try_from(wire).unwrap();
        assert!(inspection.is_deleted);
    }

    #[test]
    fn test_outbound_bodies_drop_local_photo_paths() {
        let mut entry =
            InspectionEntry::new(RecordId::from("ins_9"), "kitchen", "sink").unwrap();
        entry.photos = vec![
            "/data/images/ins-9/1-a.jpg".to_string(),
            "https://cdn.example.com/a.jpg".to_string(),
            "file:///data/images/ins-9/2-b.jpg".to_string(),
        ];

        let body = serde_json::to_value(CreateEntryRequest::from(&entry)).unwrap();
        assert_eq!(body["photos"], json!(["https://cdn.example.com/a.jpg"]));
        assert_eq!(body["inspectionId"], "ins_9");
        assert_eq!(body["maintenanceFlag"], false);

        let body = serde_json::to_value(UpdateEntryRequest::from(&entry)).unwrap();
        assert_eq!(body["photos"], json!(["https://cdn.example.com/a.jpg"]));
    }

    #[test]
    fn test_parse_api_error_prefers_structured_message() {
        assert_eq!(
            parse_api_error(r#"{"message": " inspection is completed "}"#),
            "inspection is completed"
        );
        assert_eq!(
            parse_api_error(r#"{"error": "bad request"}"#),
            "bad request"
        );
        assert_eq!(parse_api_error("  gateway timeout  "), "gateway timeout");
        assert_eq!(parse_api_error(""), "request failed");
    }

    #[test]
    fn test_upload_response_url_fallback() {
        let response = WireUploadResponse {
            url: None,
            photo_url: Some("https://cdn.example.com/a.jpg".to_string()),
        };
        assert_eq!(
            response.into_url().unwrap(),
            "https://cdn.example.com/a.jpg"
        );

        let response = WireUploadResponse {
            url: None,
            photo_url: None,
        };
        assert!(response.into_url().is_err());
    }
}
