//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `validate.rs` — binary STL, ASCII STL and OBJ structural checks.
//! - `clamav.rs` — scanner subprocess, report parsing, verdicts.
//! - `intake.rs` — inbox pipeline: scan, validate, relocate, alert.
//! - `listing.rs` — sync directory listing and archival.
//! - `server.rs` — HTTP listing protocol on top of `listing.rs`.
//! - `remote.rs` — client side of the listing protocol.
//! - `transport.rs` — file retrieval sessions and host-key trust policies.
//! - `sync.rs` — download client: pull then acknowledge.
//! - `settings.rs` — TOML config and per-role resolved configs.
//! - `storage.rs` — moves, name checks, digests, audit log.
//! - `logging.rs` — tracing subscriber setup.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod clamav;
pub mod intake;
pub mod listing;
pub mod logging;
pub mod output;
pub mod remote;
pub mod server;
pub mod settings;
pub mod storage;
pub mod sync;
pub mod transport;
pub mod validate;
