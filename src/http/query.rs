//! Query string parsing module
//!
//! Percent-decodes `key=value` pairs from the request query string. Route
//! handlers read their filter/sort/group options through this; missing or
//! malformed parameters are defaulted at the call site, never rejected.

use std::collections::HashMap;

/// Parsed query parameters (first occurrence of a name wins)
#[derive(Debug, Default)]
pub struct QueryParams {
    params: HashMap<String, String>,
}

impl QueryParams {
    /// Parse the raw query portion of a request URI
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = HashMap::new();
        let Some(query) = query else {
            return Self { params };
        };

        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = decode_component(name);
            // First occurrence wins
            if !params.contains_key(&name) {
                params.insert(name, decode_component(value));
            }
        }

        Self { params }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Get a parameter, falling back to `default` when absent
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Presence flag semantics: true only when present with a non-empty value
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }
}

/// Decode one percent-encoded component ('+' counts as a space)
fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => plus_decoded,
    }
}
