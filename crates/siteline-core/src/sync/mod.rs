//! Bidirectional sync between the local store and the server.
//!
//! [`SyncService`] runs individual cycles; [`BackgroundSync`] schedules
//! them off a timer and connectivity transitions.

mod background;
mod service;

pub use background::BackgroundSync;
pub use service::{SyncOutcome, SyncService, SyncState};
