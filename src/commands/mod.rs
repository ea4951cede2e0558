//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `intake.rs` — `intake run/check/scan` on the scanning host.
//! - `listing.rs` — `serve` and `listing list/ack` on the tracking server.
//! - `sync.rs` — `sync list/pull/ack` on the download client.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.
//!
//! Each handler returns `Ok(false)` when the command belongs to another one.

pub mod intake;
pub mod listing;
pub mod sync;

pub use intake::handle_intake_commands;
pub use listing::{handle_listing_commands, handle_serve};
pub use sync::handle_sync_commands;
