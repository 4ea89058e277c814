//! Request parameter extraction
//!
//! Derives filter/sort/group options from the query string, supplying
//! defaults. Malformed values fall back rather than erroring; the one
//! exception is an unrecognized `group_by`, which is fatal for the
//! request.

use crate::error::AppError;
use crate::http::QueryParams;
use crate::store::models::{PostOrder, PostQuery};

/// Default page size for the feed and table views
const DEFAULT_RESULTS: usize = 10;

/// Parameters shared by the feed, table and favorites views
#[derive(Debug, Clone)]
pub struct FeedParams {
    pub start: usize,
    pub results: usize,
    pub sort_by: PostOrder,
    /// Descending unless `sort_asc` is present with a non-empty value
    pub sort_desc: bool,
    pub filters: String,
    /// Requesting user; 0 means anonymous
    pub user_id: i64,
}

impl FeedParams {
    pub fn from_query(query: &QueryParams) -> Self {
        Self {
            start: query
                .get("start")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0),
            results: query
                .get("results")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(DEFAULT_RESULTS),
            sort_by: PostOrder::parse(query.get_or("sort_by", "updated_at")),
            sort_desc: !query.flag("sort_asc"),
            filters: query.get_or("filters", "").to_string(),
            user_id: query
                .get("user_id")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(0),
        }
    }

    /// The store query this parameter set describes
    pub fn to_post_query(&self) -> PostQuery {
        PostQuery {
            filters: split_filters(&self.filters),
            order: self.sort_by,
            descending: self.sort_desc,
            window: Some((self.start, self.results)),
        }
    }
}

/// Grouping strategy for the cluster view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Author,
    Tags,
    Folder,
}

impl GroupBy {
    /// Parse a request value; anything unrecognized is a fatal error
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "author" => Ok(Self::Author),
            "tags" => Ok(Self::Tags),
            "folder" => Ok(Self::Folder),
            other => Err(AppError::UnknownGroupBy(other.to_string())),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Tags => "tags",
            Self::Folder => "folder",
        }
    }
}

/// Group ordering for the cluster view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterSort {
    /// Ascending by group key, regardless of `sort_asc`
    Alpha,
    /// By group size; descending unless `sort_asc` is present
    Size,
}

impl ClusterSort {
    /// `"alpha"` sorts by group key; any other value sorts by group size
    pub fn parse(value: &str) -> Self {
        if value == "alpha" {
            Self::Alpha
        } else {
            Self::Size
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Size => "size",
        }
    }
}

/// Parameters for the cluster view (its defaults differ from the feed)
#[derive(Debug, Clone)]
pub struct ClusterParams {
    pub filters: String,
    pub sort_by: ClusterSort,
    pub group_by: GroupBy,
    /// Echoed back to the page for display only; never used to filter
    pub tag: Option<String>,
    pub sort_desc: bool,
}

impl ClusterParams {
    pub fn from_query(query: &QueryParams) -> Result<Self, AppError> {
        Ok(Self {
            filters: query.get_or("filters", "").to_string(),
            sort_by: ClusterSort::parse(query.get_or("sort_by", "alpha")),
            group_by: GroupBy::parse(query.get_or("group_by", "folder"))?,
            tag: query.get("tag").map(ToString::to_string),
            sort_desc: !query.flag("sort_asc"),
        })
    }

    pub fn filter_tokens(&self) -> Vec<String> {
        split_filters(&self.filters)
    }
}

/// Split the space-separated keyword filter list
fn split_filters(filters: &str) -> Vec<String> {
    filters.split_whitespace().map(ToString::to_string).collect()
}
