//! Tests for the error taxonomy.

use cadence::error::*;

#[test]
fn error_api_creation() {
    let err = CadenceError::api(404, "Not found");
    assert!(matches!(&err, CadenceError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "API error (status 404): Not found");
}

#[test]
fn category_and_retryability_are_stable_for_major_variants() {
    struct Case {
        error: CadenceError,
        expected_category: ErrorCategory,
        expected_retryable: bool,
    }

    let network_error = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk");
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: CadenceError::Authentication("bad-key".to_string()),
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
        },
        Case {
            error: CadenceError::ReasonerRateLimited {
                retry_after_ms: Some(1000),
            },
            expected_category: ErrorCategory::RateLimit,
            expected_retryable: true,
        },
        Case {
            error: CadenceError::RateLimited {
                subject: "client-1".to_string(),
            },
            expected_category: ErrorCategory::RateLimit,
            expected_retryable: true,
        },
        Case {
            error: CadenceError::Timeout(5000),
            expected_category: ErrorCategory::Timeout,
            expected_retryable: true,
        },
        Case {
            error: CadenceError::Network(network_error),
            expected_category: ErrorCategory::Network,
            expected_retryable: true,
        },
        Case {
            error: CadenceError::Io(io_error),
            expected_category: ErrorCategory::Storage,
            expected_retryable: false,
        },
        Case {
            error: CadenceError::Backend("unreachable".to_string()),
            expected_category: ErrorCategory::Storage,
            expected_retryable: false,
        },
        Case {
            error: CadenceError::Serialization(serde_error),
            expected_category: ErrorCategory::Serialization,
            expected_retryable: false,
        },
        Case {
            error: CadenceError::LoopExceeded { max_loops: 3 },
            expected_category: ErrorCategory::Loop,
            expected_retryable: false,
        },
        Case {
            error: CadenceError::Configuration("duplicate".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
        },
        Case {
            error: CadenceError::InvalidResponse("no choices".to_string()),
            expected_category: ErrorCategory::Unknown,
            expected_retryable: false,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.expected_category, "{}", case.error);
        assert_eq!(case.error.is_retryable(), case.expected_retryable, "{}", case.error);
    }
}

#[test]
fn rate_limited_names_subject() {
    let err = CadenceError::RateLimited {
        subject: "10.0.0.1".into(),
    };
    assert_eq!(err.to_string(), "Rate limit exceeded for '10.0.0.1'");
}
