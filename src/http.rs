use crate::error::UpstreamError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Token prefixes that must never end up in an error string or a log line.
const SECRET_MARKERS: [&str; 4] = ["Bearer ", "sk-", "eyJ", "\"accessJwt\":\""];

pub fn build_http_client() -> Client {
    build_http_client_with_timeout(120)
}

pub fn build_http_client_with_timeout(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '/' | '=')
}

fn scrub_after_marker(scrubbed: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = scrubbed[content_start..]
            .char_indices()
            .find(|&(_, c)| !is_secret_char(c))
            .map_or(scrubbed.len(), |(i, _)| content_start + i);

        // Skip bare markers without a token value.
        if end == content_start {
            search_from = content_start;
            continue;
        }

        scrubbed.replace_range(content_start..end, "[REDACTED]");
        search_from = content_start + "[REDACTED]".len();
    }
}

pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !SECRET_MARKERS.iter().any(|marker| input.contains(marker)) {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in SECRET_MARKERS {
        scrub_after_marker(&mut scrubbed, marker);
    }
    Cow::Owned(scrubbed)
}

/// Scrub secrets from an error body and cap its length.
pub fn sanitize_error_body(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input.trim());

    if scrubbed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return scrubbed.into_owned();
    }

    let scrubbed = scrubbed.as_ref();
    let mut end = MAX_ERROR_BODY_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Decode the `{error, message}` pair of a failed response.
///
/// XRPC servers answer `{"error": "Code", "message": "..."}`; OpenAI-style
/// servers nest it as `{"error": {"code"|"type": "...", "message": "..."}}`.
/// Anything else falls back to the HTTP reason phrase and the raw body.
pub fn decode_upstream_error(service: &str, status: u16, body: &str) -> UpstreamError {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("HttpError")
        .to_string();

    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let (code, nested_message) = match parsed.error {
        Some(Value::String(code)) => (Some(code), None),
        Some(Value::Object(map)) => {
            let code = map
                .get("code")
                .and_then(Value::as_str)
                .or_else(|| map.get("type").and_then(Value::as_str))
                .map(str::to_string);
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            (code, message)
        }
        _ => (None, None),
    };

    let message = parsed
        .message
        .or(nested_message)
        .unwrap_or_else(|| sanitize_error_body(body));

    UpstreamError {
        service: service.to_string(),
        status,
        code: code.unwrap_or(reason),
        message,
    }
}

/// Build an [`UpstreamError`] from a failed HTTP response.
pub async fn upstream_error(service: &str, response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    decode_upstream_error(service, status, &body)
}
