//! Core engine for a Canadian immigration application tracker: per-client
//! case files with a task checklist, document metadata, a CRS score and a
//! category catalog, backed by SQLite.
//!
//! Functionality is exposed as plain async commands (see [`commands`]) so
//! a host shim, whether HTTP, desktop IPC or the bundled CLI, only maps
//! arguments in and serialized results out.

pub mod auth;
pub mod catalog;
pub mod checklist;
pub mod commands;
pub mod db;
pub mod documents;
pub mod error;
pub mod files;
pub mod id;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod state;
pub mod time;

pub use error::{AppError, AppResult};
pub use logging::init_logging;
pub use state::AppState;
