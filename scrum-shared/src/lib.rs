//! # Scrum Shared Library
//!
//! Entity model, persistence and business rules for the scrum backend.
//! The HTTP adapter in `scrum-api` is a thin layer over this crate.
//!
//! ## Module Organization
//!
//! - `models`: Users, projects, tasks and their typed identifiers
//! - `repo`: Repository contracts with PostgreSQL and in-memory stores
//! - `db`: Connection pool and migrations for the PostgreSQL store
//! - `service`: Existence checks, reference checks and delete policies
//! - `views`: Cycle-free serialized shapes for the API boundary

pub mod db;
pub mod models;
pub mod repo;
pub mod service;
pub mod views;

/// Current version of the scrum shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
