//! Data models for Siteline

mod conflict;
mod entry;
mod ids;
mod image;
mod inspection;
mod queue;
mod status;
mod template;

pub use conflict::ResolvedConflict;
pub use entry::{EntryChanges, FieldValue, InspectionEntry, ValuePayload};
pub use ids::RecordId;
pub use image::{ImageStatus, LocalImage};
pub use inspection::{Inspection, InspectionStatus};
pub use queue::{NewOperation, OperationKind, QueuedOperation};
pub use status::SyncStatus;
pub use template::{FieldType, TemplateField, TemplateSection, TemplateSnapshot};
