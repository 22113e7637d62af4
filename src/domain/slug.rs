//! URL-safe document identifiers.
//!
//! The CMS stores slugs as `{ "current": "..." }` objects; projections that
//! select `slug.current` directly yield plain strings. Both shapes decode into
//! [`Slug`].

use std::fmt;

use serde::{Deserialize, Deserializer};

/// A unique, URL-safe identifier for a content document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slug(String);

impl Slug {
    /// Accept a slug taken from a request path.
    ///
    /// Returns `None` for values that can never match a stored slug: empty
    /// strings, whitespace, path separators or control characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() != raw.len() {
            return None;
        }
        if trimmed
            .chars()
            .any(|ch| ch == '/' || ch.is_whitespace() || ch.is_control())
        {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSlug {
    Object { current: String },
    Plain(String),
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawSlug::deserialize(deserializer)?;
        let value = match raw {
            RawSlug::Object { current } | RawSlug::Plain(current) => current,
        };
        Ok(Self(value))
    }
}
