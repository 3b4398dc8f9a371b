/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: User CRUD and owned tasks
/// - `projects`: Project CRUD, membership and filed tasks
/// - `tasks`: Task CRUD

pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;
