//! Cluster view handler
//!
//! Groups published posts into named buckets (by author, tag or folder)
//! and orders the buckets alphabetically or by size. Each grouping
//! strategy is one function returning the same grouped shape.

use std::collections::BTreeMap;

use super::params::{ClusterParams, ClusterSort, GroupBy};
use super::views::HandlerResult;
use crate::config::AppState;
use crate::error::AppError;
use crate::http::{self, QueryParams};
use crate::render;
use crate::store::models::PostRecord;
use crate::store::Store;

/// Named buckets of posts, in render order
pub type PostGroups = Vec<(String, Vec<PostRecord>)>;

/// Render the cluster view
pub fn render_cluster(state: &AppState, query: &QueryParams) -> HandlerResult {
    let params = ClusterParams::from_query(query)?;

    let groups = match params.group_by {
        GroupBy::Author => group_by_author(&state.store)?,
        GroupBy::Tags => group_by_tags(&state.store)?,
        GroupBy::Folder => group_by_folder(&state.store, &params.filter_tokens())?,
    };
    let grouped = sort_groups(groups, params.sort_by, params.sort_desc);

    Ok(http::build_html_response(render::cluster_page(
        &grouped,
        &params.filters,
        params.sort_by.as_str(),
        params.group_by.as_str(),
        params.tag.as_deref(),
    )))
}

/// Group published posts by author display name; authors with no
/// qualifying post are omitted.
///
/// Keyword filters do not narrow this branch: every author's published
/// posts are listed even when `filters` is set. Folder is the only
/// grouping the filters apply to (see the tests, which pin this down).
fn group_by_author(store: &Store) -> Result<PostGroups, AppError> {
    let mut groups = BTreeMap::new();
    for author in store.all_users()? {
        let posts = store.published_posts_by_author(author.id)?;
        if !posts.is_empty() {
            groups.insert(author.format_name, posts);
        }
    }
    Ok(groups.into_iter().collect())
}

/// Group published posts by tag name; empty tags are omitted. Filters are
/// not applied here either.
fn group_by_tags(store: &Store) -> Result<PostGroups, AppError> {
    let mut groups = BTreeMap::new();
    for tag in store.all_tags()? {
        let posts = store.published_posts_by_tag(tag.id)?;
        if !posts.is_empty() {
            groups.insert(tag.name, posts);
        }
    }
    Ok(groups.into_iter().collect())
}

/// Bucket the filtered published posts by the parent-directory portion of
/// their paths; every post lands in exactly one bucket
fn group_by_folder(store: &Store, filters: &[String]) -> Result<PostGroups, AppError> {
    let posts = store.published_posts(filters)?;
    let mut groups: BTreeMap<String, Vec<PostRecord>> = BTreeMap::new();
    for post in posts {
        groups.entry(post.folder().to_string()).or_default().push(post);
    }
    Ok(groups.into_iter().collect())
}

/// Order groups alphabetically by key, or by bucket size (descending
/// unless `sort_asc` was given)
fn sort_groups(mut groups: PostGroups, sort: ClusterSort, sort_desc: bool) -> PostGroups {
    match sort {
        ClusterSort::Alpha => groups.sort_by(|a, b| a.0.cmp(&b.0)),
        ClusterSort::Size => {
            if sort_desc {
                groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
            } else {
                groups.sort_by(|a, b| a.1.len().cmp(&b.1.len()));
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::fixture_store;

    fn group_keys(groups: &PostGroups) -> Vec<&str> {
        groups.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_folder_groups_partition_published_posts() {
        let store = fixture_store();
        let groups = group_by_folder(&store, &[]).unwrap();

        let mut seen = std::collections::HashSet::new();
        let mut total = 0;
        for (key, posts) in &groups {
            for post in posts {
                assert_eq!(post.folder(), key);
                assert!(post.is_published);
                assert!(seen.insert(post.path.clone()), "post in two groups");
                total += 1;
            }
        }
        // Every published post appears exactly once
        assert_eq!(total, store.published_posts(&[]).unwrap().len());
        assert_eq!(group_keys(&groups), vec!["", "eng", "ml", "ml/nlp"]);
    }

    #[test]
    fn test_folder_groups_respect_keyword_filters() {
        let store = fixture_store();
        let groups = group_by_folder(&store, &["ml".to_string()]).unwrap();
        assert_eq!(group_keys(&groups), vec!["ml", "ml/nlp"]);

        let groups = group_by_folder(
            &store,
            &["ml".to_string(), "timeseries".to_string()],
        )
        .unwrap();
        assert_eq!(group_keys(&groups), vec!["ml"]);
        assert_eq!(groups[0].1.len(), 1);
        assert_eq!(groups[0].1[0].path, "ml/forecasting.kp");
    }

    #[test]
    fn test_author_groups_skip_authors_without_published_posts() {
        let store = fixture_store();
        let groups = group_by_author(&store).unwrap();
        // "edsger" only authored the top-level notes post, still published
        assert_eq!(group_keys(&groups), vec!["Ada L.", "Grace H.", "edsger"]);
        // Unpublished drafts never show up under their author
        let ada = &groups[0].1;
        assert!(!ada.iter().any(|p| p.path == "ml/drafts/wip.kp"));
    }

    #[test]
    fn test_author_groups_ignore_keyword_filters() {
        // The author branch does not apply `filters`; it groups the full
        // published set regardless. Pinned here so a future fix is a
        // deliberate behavior change, not an accident.
        let store = fixture_store();
        let unfiltered = group_by_author(&store).unwrap();
        // Filters only influence the folder branch, so the author view of
        // a filtered request is identical to the unfiltered one.
        assert_eq!(unfiltered.len(), 3);
        let refetched = group_by_author(&store).unwrap();
        assert_eq!(group_keys(&unfiltered), group_keys(&refetched));
    }

    #[test]
    fn test_tag_groups_ignore_keyword_filters() {
        // Same pinned inconsistency as the author branch: tag grouping
        // sees every published post even when `filters` is set.
        let store = fixture_store();
        let groups = group_by_tags(&store).unwrap();
        assert_eq!(
            group_keys(&groups),
            vec!["machine-learning", "process", "statistics"]
        );
        // "process"-tagged onboarding post is present even though a
        // `filters=ml` request would exclude it from the folder branch.
        assert!(groups
            .iter()
            .any(|(k, posts)| k == "process"
                && posts.iter().any(|p| p.path == "eng/onboarding.kp")));
    }

    #[test]
    fn test_sort_alpha_is_ascending_by_key() {
        let store = fixture_store();
        let groups = sort_groups(
            group_by_folder(&store, &[]).unwrap(),
            ClusterSort::Alpha,
            true, // sort_desc is ignored for alpha
        );
        let keys = group_keys(&groups);
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_sort_size_descending_by_default() {
        let store = fixture_store();
        let groups = sort_groups(
            group_by_folder(&store, &[]).unwrap(),
            ClusterSort::Size,
            true,
        );
        let sizes: Vec<usize> = groups.iter().map(|(_, p)| p.len()).collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(sizes, sorted);
    }

    #[test]
    fn test_sort_size_ascending_with_sort_asc() {
        let store = fixture_store();
        let groups = sort_groups(
            group_by_folder(&store, &[]).unwrap(),
            ClusterSort::Size,
            false,
        );
        let sizes: Vec<usize> = groups.iter().map(|(_, p)| p.len()).collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sizes, sorted);
    }
}
