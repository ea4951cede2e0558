//! Shared data model layer (structs/constants/error taxonomy only).
//!
//! ## Purpose
//! - Keep wire DTOs and report structs in one place.
//! - Avoid cyclic imports between services and command handlers.
//! - Make JSON output and listing protocol changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — validation/scan/report structs and listing protocol bodies.
//! - `constants.rs` — keyword tables, wire paths and defaults.
//! - `errors.rs` — operator-facing error taxonomy with stable codes.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/network side effects.
//!
//! ## Compatibility note
//! `ListingResponse` and `RemoveRequest` are shared by server and client, which
//! run on different hosts. Keep changes additive and synchronized with
//! `docs/contracts/*`.

pub mod constants;
pub mod errors;
pub mod models;
