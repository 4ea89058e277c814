//! Data store module
//!
//! SQLite-backed persistence for posts, users, tags, votes, comments and
//! page views. Every query materializes its rows into plain owned records
//! (author and tag names included) before returning, so nothing downstream
//! ever holds a database handle.

pub mod models;
mod queries;
mod schema;
mod seed;

pub use seed::{SeedComment, SeedData, SeedPost, SeedUser, SeedVote};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::AppError;

/// Shared connection pool handle
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl Store {
    /// Open (creating if needed) the database file at `path`
    pub fn open(path: &str) -> Result<Self, AppError> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().build(manager)?;
        Ok(Self { pool })
    }

    /// Open an in-memory database.
    ///
    /// The pool is capped at one connection so every checkout sees the
    /// same data (each raw in-memory connection is its own database).
    pub fn open_in_memory() -> Result<Self, AppError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;
        Ok(Self { pool })
    }

    /// Check out one pooled connection; each request takes its own
    pub(crate) fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AppError> {
        Ok(self.pool.get()?)
    }

    /// Create tables when missing
    pub fn init_schema(&self) -> Result<(), AppError> {
        let conn = self.conn()?;
        schema::init(&conn)
    }

    /// Apply seed data directly
    pub fn seed(&self, data: &SeedData) -> Result<(), AppError> {
        let mut conn = self.conn()?;
        seed::apply(&mut conn, data)
    }

    /// Apply the JSON seed file when the database holds no posts.
    ///
    /// Returns whether the seed was applied.
    pub fn seed_from_file(&self, path: &str) -> Result<bool, AppError> {
        let mut conn = self.conn()?;
        if schema::has_posts(&conn)? {
            return Ok(false);
        }
        let raw = std::fs::read_to_string(path)?;
        let data: SeedData = serde_json::from_str(&raw)?;
        seed::apply(&mut conn, &data)?;
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{SeedData, Store};

    /// In-memory store loaded with a small fixture set spanning several
    /// folders, authors and tags, plus one unpublished draft.
    pub fn fixture_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store.seed(&fixture_seed()).unwrap();
        store
    }

    pub fn fixture_seed() -> SeedData {
        serde_json::from_str(FIXTURE_JSON).unwrap()
    }

    const FIXTURE_JSON: &str = r#"{
        "users": [
            {"username": "ada", "format_name": "Ada L."},
            {"username": "grace", "format_name": "Grace H."},
            {"username": "edsger"}
        ],
        "posts": [
            {
                "path": "ml/nlp/intro.kp",
                "title": "Intro to NLP",
                "tldr": "A short tour of tokenization and embeddings.",
                "keywords": ["ml", "nlp"],
                "authors": ["ada"],
                "tags": ["machine-learning"],
                "updated_at": "2024-03-01T10:00:00Z",
                "created_at": "2024-01-01T10:00:00Z"
            },
            {
                "path": "ml/forecasting.kp",
                "title": "Forecasting at Scale",
                "tldr": "Seasonal models and backtesting practice.",
                "keywords": ["ml", "timeseries"],
                "authors": ["ada", "grace"],
                "tags": ["machine-learning", "statistics"],
                "updated_at": "2024-02-15T10:00:00Z",
                "created_at": "2024-01-15T10:00:00Z"
            },
            {
                "path": "ml/ab-testing.kp",
                "title": "A/B Testing Pitfalls",
                "tldr": "Peeking, power and why your lift is probably noise.",
                "keywords": ["stats", "experiments"],
                "authors": ["grace"],
                "tags": ["statistics"],
                "updated_at": "2024-02-25T10:00:00Z",
                "created_at": "2024-02-10T10:00:00Z"
            },
            {
                "path": "eng/onboarding.kp",
                "title": "Engineering Onboarding",
                "tldr": "Everything a new engineer needs in week one.",
                "keywords": ["process"],
                "authors": ["grace"],
                "tags": ["process"],
                "updated_at": "2024-02-20T10:00:00Z",
                "created_at": "2024-02-01T10:00:00Z"
            },
            {
                "path": "notes.kp",
                "title": "Scratch Notes",
                "keywords": [],
                "authors": ["edsger"],
                "tags": [],
                "updated_at": "2024-01-20T10:00:00Z",
                "created_at": "2024-01-20T10:00:00Z"
            },
            {
                "path": "ml/drafts/wip.kp",
                "title": "Unfinished Draft",
                "keywords": ["ml"],
                "authors": ["ada"],
                "tags": ["machine-learning"],
                "is_published": false
            }
        ],
        "votes": [
            {"username": "grace", "post_path": "ml/nlp/intro.kp"},
            {"username": "grace", "post_path": "ml/drafts/wip.kp"},
            {"username": "ada", "post_path": "eng/onboarding.kp"}
        ],
        "comments": [
            {"username": "grace", "post_path": "ml/nlp/intro.kp", "text": "Nice overview."},
            {"username": "ada", "post_path": "ml/nlp/intro.kp", "text": "Thanks!"}
        ]
    }"#;
}
