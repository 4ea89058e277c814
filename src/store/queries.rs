//! Read queries and page-view insertion
//!
//! Each method checks out one pooled connection, materializes everything
//! it needs and returns owned records; no handle escapes the store.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::models::{PostQuery, PostRecord, PostStats, StatsMap, TagRecord, UserRecord};
use super::Store;
use crate::error::AppError;

const POST_COLUMNS: &str =
    "id, path, title, subtitle, tldr, keywords, is_published, created_at, updated_at";

impl Store {
    /// The shared post query behind the feed and table views: published
    /// posts matching the keyword filters, ordered and windowed, plus the
    /// per-post statistics map keyed by path.
    pub fn get_posts(&self, query: &PostQuery) -> Result<(Vec<PostRecord>, StatsMap), AppError> {
        let conn = self.conn()?;
        let (mut sql, args) = published_sql(&query.filters);
        sql.push_str(&format!(
            " ORDER BY {} {}",
            query.order.column(),
            if query.descending { "DESC" } else { "ASC" }
        ));
        if let Some((start, results)) = query.window {
            sql.push_str(&format!(" LIMIT {results} OFFSET {start}"));
        }
        let posts = load_posts(&conn, &sql, &args)?;
        let stats = stats_for(&conn, &posts)?;
        Ok((posts, stats))
    }

    /// All published posts matching the keyword filters, in path order
    pub fn published_posts(&self, filters: &[String]) -> Result<Vec<PostRecord>, AppError> {
        let conn = self.conn()?;
        let (mut sql, args) = published_sql(filters);
        sql.push_str(" ORDER BY path");
        Ok(load_posts(&conn, &sql, &args)?)
    }

    pub fn post_by_path(&self, path: &str) -> Result<Option<PostRecord>, AppError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE path = ?");
        let mut posts = load_posts(&conn, &sql, &[path.to_string()])?;
        Ok(if posts.is_empty() {
            None
        } else {
            Some(posts.remove(0))
        })
    }

    /// Statistics for an already-loaded post set, keyed by post path
    pub fn post_stats(&self, posts: &[PostRecord]) -> Result<StatsMap, AppError> {
        let conn = self.conn()?;
        Ok(stats_for(&conn, posts)?)
    }

    pub fn user_by_id(&self, id: i64) -> Result<Option<UserRecord>, AppError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, username, format_name FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        format_name: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn all_users(&self) -> Result<Vec<UserRecord>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, username, format_name FROM users ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                username: row.get(1)?,
                format_name: row.get(2)?,
            })
        })?;
        let mut users = Vec::new();
        for user in rows {
            users.push(user?);
        }
        Ok(users)
    }

    pub fn all_tags(&self) -> Result<Vec<TagRecord>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(TagRecord {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut tags = Vec::new();
        for tag in rows {
            tags.push(tag?);
        }
        Ok(tags)
    }

    /// One author's published posts, in path order
    pub fn published_posts_by_author(&self, user_id: i64) -> Result<Vec<PostRecord>, AppError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE is_published = 1
               AND id IN (SELECT post_id FROM post_authors WHERE user_id = ?)
             ORDER BY path"
        );
        Ok(load_posts(&conn, &sql, &[user_id.to_string()])?)
    }

    /// One tag's published posts, in path order
    pub fn published_posts_by_tag(&self, tag_id: i64) -> Result<Vec<PostRecord>, AppError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE is_published = 1
               AND id IN (SELECT post_id FROM post_tags WHERE tag_id = ?)
             ORDER BY path"
        );
        Ok(load_posts(&conn, &sql, &[tag_id.to_string()])?)
    }

    /// The posts a user has liked, newest vote first.
    ///
    /// Unpublished posts are not filtered out here: a favorite stays on
    /// the list even when its post is later unpublished.
    pub fn liked_posts(&self, user_id: i64) -> Result<Vec<PostRecord>, AppError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE id IN (SELECT post_id FROM votes WHERE user_id = ?)
             ORDER BY (SELECT v.rowid FROM votes v
                       WHERE v.post_id = posts.id AND v.user_id = ?) DESC"
        );
        Ok(load_posts(
            &conn,
            &sql,
            &[user_id.to_string(), user_id.to_string()],
        )?)
    }

    /// Append one page-view row; called once per dispatched route
    pub fn record_pageview(
        &self,
        page: &str,
        endpoint: &str,
        user_id: Option<i64>,
    ) -> Result<(), AppError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pageviews (page, endpoint, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![page, endpoint, user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Base published-post SELECT with one `keywords LIKE` clause per filter
/// token, AND-combined. Tokens are padded with commas on both sides so
/// `ml` matches `,ml,nlp,` but not `,html,`.
fn published_sql(filters: &[String]) -> (String, Vec<String>) {
    let mut sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE is_published = 1");
    let mut args = Vec::with_capacity(filters.len());
    for token in filters {
        sql.push_str(" AND keywords LIKE ?");
        args.push(format!("%,{token},%"));
    }
    (sql, args)
}

/// Run a post SELECT and attach author and tag names to every row
fn load_posts(conn: &Connection, sql: &str, args: &[String]) -> rusqlite::Result<Vec<PostRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), row_to_post)?;

    let mut posts = Vec::new();
    for row in rows {
        let mut post = row?;
        post.authors = names_for(
            conn,
            "SELECT u.format_name FROM users u
             JOIN post_authors pa ON pa.user_id = u.id
             WHERE pa.post_id = ?1 ORDER BY pa.rowid",
            post.id,
        )?;
        post.tags = names_for(
            conn,
            "SELECT t.name FROM tags t
             JOIN post_tags pt ON pt.tag_id = t.id
             WHERE pt.post_id = ?1 ORDER BY t.name",
            post.id,
        )?;
        posts.push(post);
    }
    Ok(posts)
}

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        title: row.get(2)?,
        subtitle: row.get(3)?,
        tldr: row.get(4)?,
        keywords: row.get(5)?,
        is_published: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        authors: Vec::new(),
        tags: Vec::new(),
    })
}

fn names_for(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
    let mut names = Vec::new();
    for name in rows {
        names.push(name?);
    }
    Ok(names)
}

/// View/like/comment counters for each post, keyed by path
fn stats_for(conn: &Connection, posts: &[PostRecord]) -> rusqlite::Result<StatsMap> {
    let mut views_stmt = conn.prepare(
        "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM pageviews WHERE page = ?1",
    )?;
    let mut likes_stmt = conn.prepare("SELECT COUNT(*) FROM votes WHERE post_id = ?1")?;
    let mut comments_stmt = conn.prepare("SELECT COUNT(*) FROM comments WHERE post_id = ?1")?;

    let mut stats = HashMap::new();
    for post in posts {
        let (all_views, distinct_views) = views_stmt
            .query_row(params![post.page()], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let total_likes = likes_stmt.query_row(params![post.id], |row| row.get(0))?;
        let total_comments = comments_stmt.query_row(params![post.id], |row| row.get(0))?;
        stats.insert(
            post.path.clone(),
            PostStats {
                all_views,
                distinct_views,
                total_likes,
                total_comments,
            },
        );
    }
    Ok(stats)
}
