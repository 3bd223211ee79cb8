//! PostgreSQL-backed document storage for vowplan.
//!
//! Records are JSON documents addressed by `(collection, key)`.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
