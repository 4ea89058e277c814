//! Feed, table, favorites and post-detail handlers
//!
//! Each handler extracts its parameters, pulls fully-materialized records
//! from the store and renders a page. Nothing here suspends; the database
//! work is plain blocking reads on the request's pooled connection.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use super::params::FeedParams;
use crate::config::AppState;
use crate::error::AppError;
use crate::http::{self, QueryParams};
use crate::render;

pub type HandlerResult = Result<Response<Full<Bytes>>, AppError>;

/// Render the feed view
pub fn render_feed(state: &AppState, query: &QueryParams) -> HandlerResult {
    let params = FeedParams::from_query(query);
    let (mut posts, stats) = state.store.get_posts(&params.to_post_query())?;

    // Annotate each post with its rendered short summary
    for post in &mut posts {
        post.tldr = render::post_tldr(post);
    }

    Ok(http::build_html_response(render::feed_page(
        "Knowledge Feed",
        &posts,
        &stats,
    )))
}

/// Render the table view: same retrieval as the feed, tabular template,
/// no short-summary annotation
pub fn render_table(state: &AppState, query: &QueryParams) -> HandlerResult {
    let params = FeedParams::from_query(query);
    let (posts, stats) = state.store.get_posts(&params.to_post_query())?;

    Ok(http::build_html_response(render::table_page(
        "Knowledge Table",
        &posts,
        &stats,
    )))
}

/// Render the favorites view for the requesting user.
///
/// A missing user is fatal for the request; there is no guarded fallback.
pub fn render_favorites(state: &AppState, query: &QueryParams) -> HandlerResult {
    let params = FeedParams::from_query(query);
    let user = state
        .store
        .user_by_id(params.user_id)?
        .ok_or(AppError::UnknownUser(params.user_id))?;

    let posts = state.store.liked_posts(user.id)?;
    let stats = state.store.post_stats(&posts)?;

    Ok(http::build_html_response(render::feed_page(
        "Favorites",
        &posts,
        &stats,
    )))
}

/// Render a single post; requests here feed the post's view counters
pub fn render_post(state: &AppState, path: &str) -> HandlerResult {
    let post = state
        .store
        .post_by_path(path)?
        .ok_or_else(|| AppError::UnknownPost(path.to_string()))?;
    let stats = state.store.post_stats(std::slice::from_ref(&post))?;
    let post_stats = stats.get(&post.path).copied().unwrap_or_default();

    Ok(http::build_html_response(render::post_page(
        &post, post_stats,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::test_support::fixture_store;

    fn test_state() -> AppState {
        let config = Config::load_from("no-such-config-file").unwrap();
        AppState::new(config, fixture_store())
    }

    fn body_text(result: HandlerResult) -> String {
        use http_body_util::BodyExt;
        let resp = result.unwrap();
        assert_eq!(resp.status(), 200);
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let collected = rt.block_on(resp.into_body().collect()).unwrap();
        String::from_utf8(collected.to_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_feed_lists_published_posts_with_summaries() {
        let state = test_state();
        let html = body_text(render_feed(&state, &QueryParams::parse(None)));
        assert!(html.contains("Knowledge Feed"));
        assert!(html.contains("Intro to NLP"));
        assert!(html.contains("A short tour of tokenization and embeddings."));
        // Unpublished drafts stay hidden
        assert!(!html.contains("Unfinished Draft"));
    }

    #[test]
    fn test_table_renders_rows() {
        let state = test_state();
        let html = body_text(render_table(&state, &QueryParams::parse(None)));
        assert!(html.contains("Knowledge Table"));
        assert!(html.contains("<td>ml/nlp</td>"));
    }

    #[test]
    fn test_favorites_requires_known_user() {
        let state = test_state();
        let query = QueryParams::parse(Some("user_id=9999"));
        let err = render_favorites(&state, &query).unwrap_err();
        assert!(matches!(err, AppError::UnknownUser(9999)));
    }

    #[test]
    fn test_favorites_lists_liked_posts() {
        let state = test_state();
        let grace = state
            .store
            .all_users()
            .unwrap()
            .into_iter()
            .find(|u| u.username == "grace")
            .unwrap();
        let raw = format!("user_id={}", grace.id);
        let query = QueryParams::parse(Some(raw.as_str()));
        let html = body_text(render_favorites(&state, &query));
        assert!(html.contains("Favorites"));
        assert!(html.contains("Intro to NLP"));
        // Liked drafts are kept on the list
        assert!(html.contains("Unfinished Draft"));
        // Posts nobody liked stay off it
        assert!(!html.contains("Scratch Notes"));
    }

    #[test]
    fn test_post_detail_unknown_path() {
        let state = test_state();
        let err = render_post(&state, "missing.kp").unwrap_err();
        assert!(matches!(err, AppError::UnknownPost(_)));
    }

    #[test]
    fn test_post_detail_renders() {
        let state = test_state();
        let html = body_text(render_post(&state, "ml/nlp/intro.kp"));
        assert!(html.contains("Intro to NLP"));
        assert!(html.contains("Ada L."));
    }
}
