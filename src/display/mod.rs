//! Rewrites machine timestamps in final answers into local display time.

use std::sync::OnceLock;

use chrono::DateTime;
use chrono_tz::Tz;
use regex::{Captures, Regex};

use crate::error::{CadenceError, Result};

/// e.g. `Mon 21 Jul 2025, 4:00 PM PDT`
pub const DISPLAY_FORMAT: &str = "%a %-d %b %Y, %-I:%M %p %Z";

static TIMESTAMP: OnceLock<Regex> = OnceLock::new();

fn timestamp_pattern() -> &'static Regex {
    TIMESTAMP.get_or_init(|| {
        Regex::new(r"\b\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})")
            .expect("timestamp pattern is valid")
    })
}

/// Pure text transform applied to terminal answers.
///
/// Every RFC 3339 timestamp with `Z` or an explicit offset is rendered in the
/// configured zone. Other text, including timestamp-like strings that fail to
/// parse, is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTime {
    tz: Tz,
}

impl DisplayTime {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Parse an IANA zone name such as `America/Los_Angeles`.
    pub fn from_name(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|e| CadenceError::Configuration(format!("invalid display timezone '{name}': {e}")))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn rewrite(&self, text: &str) -> String {
        timestamp_pattern()
            .replace_all(text, |caps: &Captures<'_>| {
                let raw = &caps[0];
                match DateTime::parse_from_rfc3339(raw) {
                    Ok(ts) => ts.with_timezone(&self.tz).format(DISPLAY_FORMAT).to_string(),
                    Err(_) => raw.to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for DisplayTime {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}
