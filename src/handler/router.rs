//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, route
//! dispatch, page-view recording and access logging around every route.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::{Method, Request, Response};

use super::{cluster, views};
use crate::config::AppState;
use crate::error::AppError;
use crate::http::{self, QueryParams};
use crate::logger::{self, AccessLogEntry};

/// Registered routes and their endpoint names, in dispatch order
pub const ROUTES: &[(&str, &str)] = &[
    ("/", "index"),
    ("/feed", "feed"),
    ("/table", "table"),
    ("/cluster", "cluster"),
    ("/favorites", "favorites"),
    ("/post/<path>", "post"),
    ("/site-map", "site_map"),
    ("/healthz", "healthz"),
    ("/readyz", "readyz"),
];

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let is_head = method == Method::HEAD;

    // 1. Check HTTP method
    if let Some(resp) = check_http_method(&method, state.config.http.enable_cors) {
        return Ok(resp);
    }

    // 2. Check declared body size
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return Ok(resp);
    }
    drop(req);

    // 3. Parse query parameters and dispatch
    let path = uri.path();
    let query = QueryParams::parse(uri.query());
    let (endpoint, result) = dispatch(path, &query, &state);
    let mut response = finish(result, endpoint);

    // 4. Record the page view (content routes only); a failed write is
    //    logged but never fails the request
    let user_id = query
        .get("user_id")
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|id| *id > 0);
    if tracked(endpoint) {
        // Stored decoded so post pages match the post path they count toward
        let page = match urlencoding::decode(path) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => path.to_string(),
        };
        if let Err(e) = state.store.record_pageview(&page, endpoint, user_id) {
            logger::log_error(&format!("Failed to record page view for {path}: {e}"));
        }
    }

    // 5. Access log
    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            path.to_string(),
        );
        entry.query = uri.query().map(ToString::to_string);
        entry.endpoint = endpoint.to_string();
        entry.user_id = user_id;
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .map_or(0, |n| usize::try_from(n).unwrap_or(0));
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    // 6. Server header, then drop the body for HEAD requests
    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, name);
    }
    if is_head {
        response = strip_body(response);
    }

    Ok(response)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match method {
        &Method::GET | &Method::HEAD => None,
        &Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(
    req: &Request<hyper::body::Incoming>,
    max_body_size: u64,
) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Dispatch to the route handler, returning the endpoint name recorded
/// with the page view
fn dispatch(
    path: &str,
    query: &QueryParams,
    state: &AppState,
) -> (&'static str, Result<Response<Full<Bytes>>, AppError>) {
    match path {
        "/" => ("index", Ok(http::build_redirect_response("/feed"))),
        "/feed" => ("feed", views::render_feed(state, query)),
        "/table" => ("table", views::render_table(state, query)),
        "/cluster" => ("cluster", cluster::render_cluster(state, query)),
        "/favorites" => ("favorites", views::render_favorites(state, query)),
        "/site-map" => ("site_map", Ok(site_map())),
        "/healthz" => ("healthz", Ok(http::build_health_response("ok"))),
        "/readyz" => ("readyz", Ok(http::build_health_response("ok"))),
        _ => match path.strip_prefix("/post/") {
            Some(rest) => {
                let decoded = match urlencoding::decode(rest) {
                    Ok(d) => d.into_owned(),
                    Err(_) => rest.to_string(),
                };
                ("post", views::render_post(state, &decoded))
            }
            None => ("not_found", Ok(http::build_404_response())),
        },
    }
}

/// Convert a handler result into a response, mapping errors to the
/// framework-default error pages
fn finish(
    result: Result<Response<Full<Bytes>>, AppError>,
    endpoint: &str,
) -> Response<Full<Bytes>> {
    match result {
        Ok(resp) => resp,
        Err(AppError::UnknownPost(path)) => {
            logger::log_warning(&format!("No post at path `{path}`"));
            http::build_404_response()
        }
        Err(e) => {
            logger::log_error(&format!("Handler `{endpoint}` failed: {e}"));
            http::build_500_response()
        }
    }
}

/// Whether a page view is recorded for this endpoint
fn tracked(endpoint: &str) -> bool {
    !matches!(endpoint, "healthz" | "readyz" | "not_found")
}

/// Plain listing of every registered route
fn site_map() -> Response<Full<Bytes>> {
    let links: Vec<String> = ROUTES
        .iter()
        .map(|(path, endpoint)| format!("{path} -&gt; {endpoint}"))
        .collect();
    http::build_html_response(links.join("<br />"))
}

/// Drop the body for HEAD requests, keeping status and headers
fn strip_body(response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Full::new(Bytes::new()))
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

    #[test]
    fn test_index_redirects_to_feed() {
        let state = test_state();
        let (endpoint, result) = dispatch("/", &QueryParams::parse(None), &state);
        let resp = result.unwrap();
        assert_eq!(endpoint, "index");
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers().get("Location").unwrap(), "/feed");
    }

    #[test]
    fn test_unknown_path_is_404_and_untracked() {
        let state = test_state();
        let (endpoint, result) = dispatch("/nope", &QueryParams::parse(None), &state);
        assert_eq!(endpoint, "not_found");
        assert_eq!(result.unwrap().status(), 404);
        assert!(!tracked("not_found"));
    }

    #[test]
    fn test_health_endpoints_are_untracked() {
        let state = test_state();
        let (endpoint, result) = dispatch("/healthz", &QueryParams::parse(None), &state);
        assert_eq!(endpoint, "healthz");
        assert_eq!(result.unwrap().status(), 200);
        assert!(!tracked("healthz"));
        assert!(!tracked("readyz"));
        assert!(tracked("cluster"));
        assert!(tracked("site_map"));
    }

    #[test]
    fn test_cluster_unknown_group_by_maps_to_500() {
        let state = test_state();
        let query = QueryParams::parse(Some("group_by=color"));
        let (endpoint, result) = dispatch("/cluster", &query, &state);
        assert_eq!(endpoint, "cluster");
        assert!(result.is_err());
        let resp = finish(result, endpoint);
        assert_eq!(resp.status(), 500);
    }

    #[test]
    fn test_missing_favorites_user_maps_to_500() {
        let state = test_state();
        let query = QueryParams::parse(Some("user_id=424242"));
        let (endpoint, result) = dispatch("/favorites", &query, &state);
        let resp = finish(result, endpoint);
        assert_eq!(resp.status(), 500);
    }

    #[test]
    fn test_unknown_post_maps_to_404() {
        let state = test_state();
        let (endpoint, result) = dispatch("/post/missing.kp", &QueryParams::parse(None), &state);
        assert_eq!(endpoint, "post");
        let resp = finish(result, endpoint);
        assert_eq!(resp.status(), 404);
    }

    #[test]
    fn test_post_dispatch_decodes_path() {
        let state = test_state();
        let (endpoint, result) =
            dispatch("/post/ml/nlp/intro.kp", &QueryParams::parse(None), &state);
        assert_eq!(endpoint, "post");
        assert_eq!(result.unwrap().status(), 200);
    }

    #[test]
    fn test_site_map_lists_every_route() {
        let resp = site_map();
        assert_eq!(resp.status(), 200);
        // The listing is rebuilt from ROUTES, so spot-check the table
        for (path, endpoint) in ROUTES {
            assert!(!path.is_empty());
            assert!(!endpoint.is_empty());
        }
    }

    #[test]
    fn test_strip_body_keeps_status_and_headers() {
        let resp = http::build_html_response("<p>hi</p>".to_string());
        let stripped = strip_body(resp);
        assert_eq!(stripped.status(), 200);
        assert_eq!(stripped.headers().get("Content-Length").unwrap(), "9");
    }
}
