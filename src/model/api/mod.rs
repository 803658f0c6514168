//! API-friendly types: request bodies and response views.

pub mod admin;
pub mod ballot;
pub mod candidate;
pub mod login;
pub mod student;
