//! DB-compatible (e.g. de/serialisable) types.
//!
//! Each record comes in two flavours: `NewX` without an ID, for inserting, and
//! `X` with the database-assigned ID, for reading.

pub mod admin;
pub mod candidate;
pub mod category;
pub mod student;
