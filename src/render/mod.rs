//! HTML rendering module
//!
//! Assembles the page markup directly; there is no template engine.
//! Every interpolated value goes through `escape_html` at the point it is
//! written into the page.

mod pages;

pub use pages::{cluster_page, feed_page, post_page, table_page};

use crate::store::models::PostRecord;

/// Character budget for the short summary shown under feed entries
const SUMMARY_CHARS: usize = 240;

/// Escape special characters for HTML text and attribute positions
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render the short summary for a feed entry: the post tldr trimmed and
/// truncated on a character boundary
pub fn post_tldr(post: &PostRecord) -> String {
    let text = post.tldr.trim();
    if text.chars().count() <= SUMMARY_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SUMMARY_CHARS).collect();
    format!("{}…", cut.trim_end())
}

/// Post-detail link with each path segment percent-encoded
pub(crate) fn post_href(path: &str) -> String {
    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("/post/{}", encoded.join("/"))
}

/// Shared page shell
pub(crate) fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body {{ font-family: sans-serif; margin: 2em auto; max-width: 60em; padding: 0 1em; color: #222; }}
  nav {{ border-bottom: 1px solid #ddd; padding-bottom: 0.5em; margin-bottom: 1.5em; }}
  nav a {{ margin-right: 1em; }}
  article.post {{ margin-bottom: 1.5em; }}
  article.post h2 {{ margin-bottom: 0.2em; }}
  p.meta, p.stats {{ color: #666; font-size: 0.85em; margin: 0.2em 0; }}
  table {{ border-collapse: collapse; width: 100%; }}
  th, td {{ border: 1px solid #ddd; padding: 0.4em 0.6em; text-align: left; }}
  section.group h2 {{ border-bottom: 1px solid #eee; padding-bottom: 0.2em; }}
  span.tag {{ background: #eef; border-radius: 3px; padding: 0.1em 0.4em; margin-right: 0.3em; font-size: 0.85em; }}
</style>
</head>
<body>
<nav><a href="/feed">Feed</a><a href="/table">Table</a><a href="/cluster">Cluster</a><a href="/favorites">Favorites</a></nav>
{body}
</body>
</html>
"#,
        title = escape_html(title),
    )
}
