//! Application error type
//!
//! Handler failures all funnel through `AppError`; the router maps them to
//! the generic error pages (404 for an unknown post path, 500 otherwise).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed file: {0}")]
    SeedFormat(#[from] serde_json::Error),

    #[error("seed data references unknown {kind} `{name}`")]
    SeedReference { kind: &'static str, name: String },

    /// Unrecognized `group_by` option; fatal for the request, no fallback
    #[error("group by `{0}` not understood")]
    UnknownGroupBy(String),

    #[error("no user with id {0}")]
    UnknownUser(i64),

    #[error("no post at path `{0}`")]
    UnknownPost(String),
}
