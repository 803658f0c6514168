pub mod api;
pub mod auth;
pub mod ballot;
pub mod db;
pub mod manage;
pub mod mongodb;
pub mod vote;

mod bootstrap;
pub use bootstrap::bootstrap;
