//! Database layer for Siteline

mod conflict_repository;
mod connection;
mod entry_repository;
mod image_repository;
mod inspection_repository;
mod meta_repository;
mod migrations;
mod queue_repository;

pub use conflict_repository::{ConflictRepository, LibSqlConflictRepository};
pub use connection::Database;
pub use entry_repository::{EntryRepository, LibSqlEntryRepository};
pub use image_repository::{ImageRepository, LibSqlImageRepository};
pub use inspection_repository::{InspectionRepository, LibSqlInspectionRepository};
pub use meta_repository::{LibSqlMetaRepository, MetaRepository};
pub use queue_repository::{LibSqlQueueRepository, QueueRepository};
