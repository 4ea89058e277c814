//! Seed data loading
//!
//! Deserializes a JSON fixture (users, posts, votes, comments) and inserts
//! it in one transaction. Keyword lists are stored in the comma-bracketed
//! form the filter queries match against (`["ml", "nlp"]` → `,ml,nlp,`).

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub posts: Vec<SeedPost>,
    #[serde(default)]
    pub votes: Vec<SeedVote>,
    #[serde(default)]
    pub comments: Vec<SeedComment>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub username: String,
    /// Display name; defaults to the username
    #[serde(default)]
    pub format_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPost {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub tldr: String,
    /// Keyword tokens; stored comma-bracketed
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Author usernames, in display order
    #[serde(default)]
    pub authors: Vec<String>,
    /// Tag names
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

const fn default_published() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SeedVote {
    pub username: String,
    pub post_path: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedComment {
    pub username: String,
    pub post_path: String,
    pub text: String,
}

/// Bracket a keyword list for padded-substring matching
fn bracket_keywords(keywords: &[String]) -> String {
    if keywords.is_empty() {
        String::new()
    } else {
        format!(",{},", keywords.join(","))
    }
}

/// Insert the full seed set in one transaction
pub(crate) fn apply(conn: &mut Connection, data: &SeedData) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    for user in &data.users {
        let format_name = user.format_name.as_deref().unwrap_or(&user.username);
        tx.execute(
            "INSERT OR IGNORE INTO users (username, format_name) VALUES (?1, ?2)",
            params![user.username, format_name],
        )?;
    }

    for post in &data.posts {
        tx.execute(
            "INSERT INTO posts (path, title, subtitle, tldr, keywords, is_published, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                post.path,
                post.title,
                post.subtitle,
                post.tldr,
                bracket_keywords(&post.keywords),
                post.is_published,
                post.created_at.as_deref().unwrap_or(&now),
                post.updated_at.as_deref().unwrap_or(&now),
            ],
        )?;
        let post_id = tx.last_insert_rowid();

        for username in &post.authors {
            let user_id = user_id_for(&tx, username)?;
            tx.execute(
                "INSERT OR IGNORE INTO post_authors (post_id, user_id) VALUES (?1, ?2)",
                params![post_id, user_id],
            )?;
        }

        for tag in &post.tags {
            tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![tag])?;
            let tag_id: i64 = tx.query_row(
                "SELECT id FROM tags WHERE name = ?1",
                params![tag],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
                params![post_id, tag_id],
            )?;
        }
    }

    for vote in &data.votes {
        let user_id = user_id_for(&tx, &vote.username)?;
        let post_id = post_id_for(&tx, &vote.post_path)?;
        tx.execute(
            "INSERT OR IGNORE INTO votes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, post_id, now],
        )?;
    }

    for comment in &data.comments {
        let user_id = user_id_for(&tx, &comment.username)?;
        let post_id = post_id_for(&tx, &comment.post_path)?;
        tx.execute(
            "INSERT INTO comments (post_id, user_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![post_id, user_id, comment.text, now],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn user_id_for(conn: &Connection, username: &str) -> Result<i64, AppError> {
    conn.query_row(
        "SELECT id FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| AppError::SeedReference {
        kind: "user",
        name: username.to_string(),
    })
}

fn post_id_for(conn: &Connection, path: &str) -> Result<i64, AppError> {
    conn.query_row(
        "SELECT id FROM posts WHERE path = ?1",
        params![path],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| AppError::SeedReference {
        kind: "post",
        name: path.to_string(),
    })
}
