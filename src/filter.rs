//! Client-side filtering helpers shared by the providers

use crate::error::{ProviderError, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 500;

/// Case-insensitive containment
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Case-insensitive equality, with the same Unicode folding as [`contains_ci`]
pub fn eq_ci(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Optional equality filter: `None` always matches
pub fn matches_opt(filter: Option<&str>, value: &str) -> bool {
    filter.map_or(true, |f| eq_ci(f, value))
}

/// Path-style scope expression
///
/// Segments are separated by `/`. A `*` inside a segment matches any run of
/// characters except `/`; a segment of just `*` matches exactly one segment;
/// a trailing `**` matches any remainder, including nothing.
#[derive(Clone)]
pub struct ScopePattern {
    source: String,
    regex: Regex,
}

impl ScopePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim().trim_matches('/');
        if pattern.is_empty() {
            return Err(ProviderError::Validation(
                "scope pattern must not be empty".to_string(),
            ));
        }

        let segments: Vec<&str> = pattern.split('/').collect();
        let last = segments.len() - 1;
        let mut expr = String::from("^");

        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(ProviderError::Validation(format!(
                    "scope pattern '{}' has an empty segment",
                    pattern
                )));
            }
            if *segment == "**" {
                if i != last {
                    return Err(ProviderError::Validation(format!(
                        "'**' is only allowed as the last segment of '{}'",
                        pattern
                    )));
                }
                if i == 0 {
                    expr.push_str(".*");
                } else {
                    expr.push_str("(/.*)?");
                }
                continue;
            }

            if i > 0 {
                expr.push('/');
            }
            if *segment == "*" {
                expr.push_str("[^/]+");
            } else {
                expr.push_str(&regex::escape(segment).replace(r"\*", "[^/]*"));
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .map_err(|e| ProviderError::Internal(format!("scope regex: {}", e)))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path.trim_matches('/'))
    }
}

impl fmt::Debug for ScopePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopePattern").field(&self.source).finish()
    }
}

impl fmt::Display for ScopePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Time window with optional bounds (both inclusive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// The trailing window `[now - window, now]`
    pub fn last(window: Duration, now: DateTime<Utc>) -> Self {
        Self::between(now - window, now)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }

    /// Reject ranges whose start lies after their end
    pub fn validate(&self) -> Result<()> {
        match (self.start, self.end) {
            (Some(s), Some(e)) if s > e => Err(ProviderError::Validation(format!(
                "time range start {} is after end {}",
                s, e
            ))),
            _ => Ok(()),
        }
    }
}

/// Limit/offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Effective limit, capped at `MAX_PAGE_LIMIT`; zero yields an empty page
    pub fn effective_limit(&self) -> usize {
        self.limit.min(MAX_PAGE_LIMIT)
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.effective_limit())
            .collect()
    }
}
