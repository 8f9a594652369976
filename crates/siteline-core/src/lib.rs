//! siteline-core - Offline-first sync engine for Siteline
//!
//! This crate contains the local mirror store, image store, conflict
//! resolver, and sync service used by all Siteline field clients
//! (mobile, desktop, CLI).

pub mod api;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod images;
pub mod models;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod util;

pub use config::SyncSettings;
pub use connectivity::{ConnectionState, ConnectivityMonitor};
pub use error::{Error, Result};
pub use images::ImageStore;
pub use models::{Inspection, InspectionEntry, RecordId};
pub use store::LocalStore;
pub use sync::{BackgroundSync, SyncOutcome, SyncService, SyncState};
