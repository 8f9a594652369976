//! REST client for the inspection server.

mod client;
mod wire;

pub use client::ApiClient;
pub use wire::{WireEntry, WireInspection};
