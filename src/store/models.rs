//! Store record types
//!
//! Plain owned rows handed to the render layer. Relationship data (author
//! and tag names) is loaded eagerly when a record is built, so records
//! stay valid after the request's database connection goes back to the
//! pool.

use std::collections::HashMap;

/// A knowledge post row with its author and tag names attached
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: i64,
    /// Repository path, unique; the parent directory doubles as the folder
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub tldr: String,
    /// Comma-bracketed keyword membership string, e.g. `,nlp,search,`
    pub keywords: String,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
}

impl PostRecord {
    /// Parent-directory portion of the post path ("" for top-level posts)
    pub fn folder(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(folder, _)| folder)
    }

    /// The page whose views count toward this post
    pub fn page(&self) -> String {
        format!("/post/{}", self.path)
    }
}

/// Per-post view/like/comment counters
#[derive(Debug, Clone, Copy, Default)]
pub struct PostStats {
    pub all_views: i64,
    pub distinct_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
}

/// Stats keyed by post path
pub type StatsMap = HashMap<String, PostStats>;

/// A registered user
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub format_name: String,
}

/// A tag row
#[derive(Debug, Clone)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
}

/// Sort column for the shared post query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    UpdatedAt,
    CreatedAt,
    Title,
}

impl PostOrder {
    /// Map a request-supplied column name, falling back to `UpdatedAt`
    pub fn parse(name: &str) -> Self {
        match name {
            "created_at" => Self::CreatedAt,
            "title" => Self::Title,
            _ => Self::UpdatedAt,
        }
    }

    pub(crate) const fn column(self) -> &'static str {
        match self {
            Self::UpdatedAt => "updated_at",
            Self::CreatedAt => "created_at",
            Self::Title => "title",
        }
    }
}

/// Parameters for the shared published-post query
#[derive(Debug, Clone)]
pub struct PostQuery {
    /// Keyword tokens, AND-combined as padded-substring matches
    pub filters: Vec<String>,
    pub order: PostOrder,
    pub descending: bool,
    /// Pagination window as (start, results); `None` returns the full set
    pub window: Option<(usize, usize)>,
}
