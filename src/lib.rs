//! Race/language sync service.
//!
//! Pulls race records from a remote GraphQL source, writes each batch into
//! Postgres in one transaction (races, deduplicated languages, and the links
//! between them), and serves the result over a small HTTP API.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod ops;
pub mod remote;
pub mod sync;

pub use error::{Error, Result};
