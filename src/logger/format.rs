//! Access log format module
//!
//! Every served route produces one entry, which doubles as the page-view
//! audit line (it carries the endpoint name and the requesting user id).
//! Supported formats:
//! - `combined` (Apache/Nginx-style, user id in the remote-user slot)
//! - `json` (JSON structured logging)
//! - Custom patterns with variables

use chrono::Local;

/// Access log entry containing all request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    /// HTTP method (GET, HEAD, ...)
    pub method: String,
    /// Request URI path
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Router endpoint name that served the request
    pub endpoint: String,
    /// Requesting user id, when one was supplied
    pub user_id: Option<i64>,
    /// Response status code
    pub status: u16,
    /// Response body size in bytes
    pub body_bytes: usize,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            endpoint: String::new(),
            user_id: None,
            status: 200,
            body_bytes: 0,
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_uri(&self) -> String {
        self.query
            .as_ref()
            .map_or_else(|| self.path.clone(), |q| format!("{}?{}", self.path, q))
    }

    /// Combined-style format
    /// `$remote_addr - $user_id [$time_local] "$request" $status $body_bytes_sent "$endpoint"`
    fn format_combined(&self) -> String {
        format!(
            "{} - {} [{}] \"{} {}\" {} {} \"{}\"",
            self.remote_addr,
            self.user_id
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.request_uri(),
            self.status,
            self.body_bytes,
            self.endpoint,
        )
    }

    /// JSON structured log format
    fn format_json(&self) -> String {
        // Manual JSON building to keep the hot path allocation-light
        let query_json = self
            .query
            .as_ref()
            .map_or_else(|| "null".to_string(), |q| format!("\"{}\"", escape_json(q)));
        let user_json = self
            .user_id
            .map_or_else(|| "null".to_string(), |id| id.to_string());

        format!(
            r#"{{"remote_addr":"{}","time":"{}","method":"{}","path":"{}","query":{},"endpoint":"{}","user_id":{},"status":{},"body_bytes":{},"request_time_us":{}}}"#,
            escape_json(&self.remote_addr),
            self.time.to_rfc3339(),
            escape_json(&self.method),
            escape_json(&self.path),
            query_json,
            escape_json(&self.endpoint),
            user_json,
            self.status,
            self.body_bytes,
            self.request_time_us,
        )
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables:
    /// - `$remote_addr` - Client IP address
    /// - `$time_local` - Local time in Common Log Format
    /// - `$time_iso8601` - ISO 8601 timestamp
    /// - `$request` - Request line ("METHOD /path?query")
    /// - `$request_method` - HTTP method
    /// - `$request_uri` - Request URI with query string
    /// - `$endpoint` - Endpoint name that served the request
    /// - `$user_id` - Requesting user id ("-" when anonymous)
    /// - `$status` - Response status code
    /// - `$body_bytes_sent` - Response body size
    /// - `$request_time` - Request processing time in seconds (3 decimal places)
    fn format_custom(&self, pattern: &str) -> String {
        let mut result = pattern.to_string();

        let request_uri = self.request_uri();
        let request_line = format!("{} {}", self.method, request_uri);

        result = result.replace("$remote_addr", &self.remote_addr);
        result = result.replace(
            "$time_local",
            &self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string(),
        );
        result = result.replace("$time_iso8601", &self.time.to_rfc3339());
        // Order matters: longer variables first to avoid partial replacement
        // ($request_time and $request_method before $request)
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;
        result = result.replace("$request_time", &format!("{request_time:.3}"));
        result = result.replace("$request_method", &self.method);
        result = result.replace("$request_uri", &request_uri);
        result = result.replace("$request", &request_line);
        result = result.replace("$endpoint", &self.endpoint);
        result = result.replace(
            "$user_id",
            &self
                .user_id
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
        );
        result = result.replace("$status", &self.status.to_string());
        result = result.replace("$body_bytes_sent", &self.body_bytes.to_string());

        result
    }
}

/// Escape special characters for JSON string
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "GET".to_string(),
            "/cluster".to_string(),
        );
        entry.query = Some("group_by=folder".to_string());
        entry.endpoint = "cluster".to_string();
        entry.user_id = Some(7);
        entry.status = 200;
        entry.body_bytes = 1234;
        entry.request_time_us = 1500;
        entry
    }

    #[test]
    fn test_format_combined() {
        let entry = create_test_entry();
        let log = entry.format("combined");
        assert!(log.contains("192.168.1.1 - 7 ["));
        assert!(log.contains("\"GET /cluster?group_by=folder\""));
        assert!(log.contains("200 1234"));
        assert!(log.contains("\"cluster\""));
    }

    #[test]
    fn test_format_combined_anonymous() {
        let mut entry = create_test_entry();
        entry.user_id = None;
        let log = entry.format("combined");
        assert!(log.starts_with("192.168.1.1 - - ["));
    }

    #[test]
    fn test_format_json() {
        let entry = create_test_entry();
        let log = entry.format("json");
        assert!(log.contains(r#""remote_addr":"192.168.1.1""#));
        assert!(log.contains(r#""endpoint":"cluster""#));
        assert!(log.contains(r#""user_id":7"#));
        assert!(log.contains(r#""status":200"#));
        assert!(log.contains(r#""body_bytes":1234"#));
    }

    #[test]
    fn test_format_custom() {
        let entry = create_test_entry();
        let log = entry.format("$remote_addr $endpoint $status $request_time");
        assert!(log.contains("192.168.1.1"));
        assert!(log.contains("cluster"));
        assert!(log.contains("200"));
        // 1500us = 0.0015s, formatted to 3 decimal places
        assert!(
            log.contains("0.00"),
            "Expected log to contain '0.00', got: {log}"
        );
    }

    #[test]
    fn test_format_custom_request_line() {
        let entry = create_test_entry();
        let log = entry.format("$request");
        assert_eq!(log, "GET /cluster?group_by=folder");
    }
}
