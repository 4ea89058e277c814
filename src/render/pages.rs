//! Page builders
//!
//! One function per page: feed, table, cluster and post detail. Builders
//! take plain records plus the stats map and return the full document.

use std::fmt::Write;

use super::{escape_html, layout, post_href};
use crate::store::models::{PostRecord, PostStats, StatsMap};

/// Feed-style page (also used by the favorites view)
pub fn feed_page(top_header: &str, posts: &[PostRecord], stats: &StatsMap) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape_html(top_header));
    if posts.is_empty() {
        body.push_str("<p>No posts to show.</p>\n");
    }
    for post in posts {
        let _ = write!(body, "{}", feed_entry(post, stats.get(&post.path)));
    }
    layout(top_header, &body)
}

fn feed_entry(post: &PostRecord, stats: Option<&PostStats>) -> String {
    let mut entry = String::from("<article class=\"post\">\n");
    let _ = writeln!(
        entry,
        "<h2><a href=\"{}\">{}</a></h2>",
        post_href(&post.path),
        escape_html(&post.title),
    );
    if !post.subtitle.is_empty() {
        let _ = writeln!(entry, "<p class=\"subtitle\">{}</p>", escape_html(&post.subtitle));
    }
    let _ = writeln!(
        entry,
        "<p class=\"meta\">by {} · updated {}</p>",
        escape_html(&post.authors.join(", ")),
        escape_html(&post.updated_at),
    );
    if !post.tldr.is_empty() {
        let _ = writeln!(entry, "<p class=\"tldr\">{}</p>", escape_html(&post.tldr));
    }
    if !post.tags.is_empty() {
        entry.push_str("<p class=\"tags\">");
        for tag in &post.tags {
            entry.push_str(&entry_tag(tag));
        }
        entry.push_str("</p>\n");
    }
    let _ = writeln!(entry, "{}", stats_line(stats));
    entry.push_str("</article>\n");
    entry
}

fn stats_line(stats: Option<&PostStats>) -> String {
    let s = stats.copied().unwrap_or_default();
    format!(
        "<p class=\"stats\">{} views ({} unique) · {} likes · {} comments</p>",
        s.all_views, s.distinct_views, s.total_likes, s.total_comments,
    )
}

/// Tabular page over the same data as the feed
pub fn table_page(top_header: &str, posts: &[PostRecord], stats: &StatsMap) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape_html(top_header));
    body.push_str(
        "<table>\n<tr><th>Title</th><th>Folder</th><th>Authors</th><th>Updated</th>\
         <th>Views</th><th>Likes</th><th>Comments</th></tr>\n",
    );
    for post in posts {
        let s = stats.get(&post.path).copied().unwrap_or_default();
        let _ = writeln!(
            body,
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td></tr>",
            post_href(&post.path),
            escape_html(&post.title),
            escape_html(post.folder()),
            escape_html(&post.authors.join(", ")),
            escape_html(&post.updated_at),
            s.all_views,
            s.total_likes,
            s.total_comments,
        );
    }
    body.push_str("</table>\n");
    layout(top_header, &body)
}

/// Cluster page: one section per group, with the request options echoed
/// back above the groups
pub fn cluster_page(
    grouped: &[(String, Vec<PostRecord>)],
    filters: &str,
    sort_by: &str,
    group_by: &str,
    tag: Option<&str>,
) -> String {
    let mut body = String::from("<h1>Knowledge Cluster</h1>\n");
    let _ = writeln!(
        body,
        "<p class=\"meta\">grouped by {} · sorted by {}{}{}</p>",
        escape_html(group_by),
        escape_html(sort_by),
        if filters.is_empty() {
            String::new()
        } else {
            format!(" · filters: {}", escape_html(filters))
        },
        tag.map_or_else(String::new, |t| format!(" · tag: {}", escape_html(t))),
    );
    body.push_str(
        "<p class=\"meta\">group by: <a href=\"/cluster?group_by=folder\">folder</a> \
         <a href=\"/cluster?group_by=author\">author</a> \
         <a href=\"/cluster?group_by=tags\">tags</a></p>\n",
    );

    for (key, posts) in grouped {
        let heading = if key.is_empty() { "/" } else { key.as_str() };
        let _ = writeln!(
            body,
            "<section class=\"group\">\n<h2>{} ({})</h2>\n<ul>",
            escape_html(heading),
            posts.len(),
        );
        for post in posts {
            let _ = writeln!(
                body,
                "<li><a href=\"{}\">{}</a></li>",
                post_href(&post.path),
                escape_html(&post.title),
            );
        }
        body.push_str("</ul>\n</section>\n");
    }
    layout("Knowledge Cluster", &body)
}

/// Single-post page; requests for it feed the per-post view counters
pub fn post_page(post: &PostRecord, stats: PostStats) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape_html(&post.title));
    if !post.subtitle.is_empty() {
        let _ = writeln!(body, "<p class=\"subtitle\">{}</p>", escape_html(&post.subtitle));
    }
    let _ = writeln!(
        body,
        "<p class=\"meta\">by {} · in <code>{}</code> · created {} · updated {}</p>",
        escape_html(&post.authors.join(", ")),
        escape_html(if post.folder().is_empty() { "/" } else { post.folder() }),
        escape_html(&post.created_at),
        escape_html(&post.updated_at),
    );
    if !post.tags.is_empty() {
        body.push_str("<p class=\"tags\">");
        for tag in &post.tags {
            body.push_str(&entry_tag(tag));
        }
        body.push_str("</p>\n");
    }
    if !post.tldr.is_empty() {
        let _ = writeln!(body, "<p class=\"tldr\">{}</p>", escape_html(&post.tldr));
    }
    let _ = writeln!(body, "{}", stats_line(Some(&stats)));
    layout(&post.title, &body)
}

fn entry_tag(tag: &str) -> String {
    format!(
        "<span class=\"tag\"><a href=\"/cluster?group_by=tags&amp;tag={}\">{}</a></span>",
        urlencoding::encode(tag),
        escape_html(tag),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_post() -> PostRecord {
        PostRecord {
            id: 1,
            path: "ml/nlp/intro.kp".to_string(),
            title: "Intro <script>".to_string(),
            subtitle: String::new(),
            tldr: "A short tour.".to_string(),
            keywords: ",ml,nlp,".to_string(),
            is_published: true,
            created_at: "2024-01-01".to_string(),
            updated_at: "2024-03-01".to_string(),
            authors: vec!["Ada L.".to_string()],
            tags: vec!["machine-learning".to_string()],
        }
    }

    #[test]
    fn test_feed_page_escapes_and_links() {
        let stats = HashMap::new();
        let html = feed_page("Knowledge Feed", &[sample_post()], &stats);
        assert!(html.contains("<h1>Knowledge Feed</h1>"));
        assert!(html.contains("Intro &lt;script&gt;"));
        assert!(html.contains("href=\"/post/ml/nlp/intro.kp\""));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_feed_page_empty_state() {
        let html = feed_page("Favorites", &[], &HashMap::new());
        assert!(html.contains("No posts to show."));
    }

    #[test]
    fn test_table_page_has_folder_column() {
        let html = table_page("Knowledge Table", &[sample_post()], &HashMap::new());
        assert!(html.contains("<th>Folder</th>"));
        assert!(html.contains("<td>ml/nlp</td>"));
    }

    #[test]
    fn test_cluster_page_echoes_options_and_groups() {
        let grouped = vec![("ml/nlp".to_string(), vec![sample_post()])];
        let html = cluster_page(&grouped, "ml", "alpha", "folder", Some("nlp"));
        assert!(html.contains("grouped by folder"));
        assert!(html.contains("filters: ml"));
        assert!(html.contains("tag: nlp"));
        assert!(html.contains("<h2>ml/nlp (1)</h2>"));
    }

    #[test]
    fn test_cluster_page_root_group_heading() {
        let grouped = vec![(String::new(), vec![sample_post()])];
        let html = cluster_page(&grouped, "", "alpha", "folder", None);
        assert!(html.contains("<h2>/ (1)</h2>"));
    }

    #[test]
    fn test_post_page_shows_stats() {
        let stats = PostStats {
            all_views: 5,
            distinct_views: 2,
            total_likes: 1,
            total_comments: 3,
        };
        let html = post_page(&sample_post(), stats);
        assert!(html.contains("5 views (2 unique)"));
        assert!(html.contains("1 likes"));
        assert!(html.contains("3 comments"));
    }
}
