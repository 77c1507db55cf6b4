//! Data models for the org roster: employees, teams and their membership records.
//!
//! Field names serialize in camelCase to match the document shape the UI reads.

mod employee;
mod snapshot;
mod team;

pub use employee::*;
pub use snapshot::*;
pub use team::*;
