//! Shared HTTP client and status mapping.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::CadenceError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, retry_after: Option<&str>, body: &str) -> CadenceError {
    match status {
        401 | 403 => CadenceError::Authentication(body.to_string()),
        429 => CadenceError::ReasonerRateLimited {
            retry_after_ms: retry_after
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(|secs| (secs * 1000.0) as u64)
                .or_else(|| extract_retry_after(body)),
        },
        _ => CadenceError::api(status, body),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_map_to_authentication() {
        assert!(matches!(
            status_to_error(401, None, "bad key"),
            CadenceError::Authentication(_)
        ));
        assert!(matches!(
            status_to_error(403, None, "forbidden"),
            CadenceError::Authentication(_)
        ));
    }

    #[test]
    fn too_many_requests_reads_header_then_body() {
        match status_to_error(429, Some("2"), "{}") {
            CadenceError::ReasonerRateLimited { retry_after_ms } => {
                assert_eq!(retry_after_ms, Some(2000))
            }
            other => panic!("unexpected {other:?}"),
        }
        match status_to_error(429, None, r#"{"error":{"retry_after":0.5}}"#) {
            CadenceError::ReasonerRateLimited { retry_after_ms } => {
                assert_eq!(retry_after_ms, Some(500))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_statuses_are_api_errors() {
        match status_to_error(500, None, "boom") {
            CadenceError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
