//! Tag normalization.

use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("tag '{tag}' exceeds maximum length of {max} characters")]
    TooLong { tag: String, max: usize },
    #[error(
        "tag '{0}' contains invalid characters (only lowercase letters, numbers, hyphens, and underscores allowed)"
    )]
    InvalidCharacters(String),
    #[error("maximum of {max} tags allowed, got {count}")]
    TooMany { max: usize, count: usize },
}

#[allow(clippy::expect_used)] // static pattern
fn tag_pattern() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid tag regex"))
}

/// Trim, lowercase and de-duplicate `tags`, then validate what is left.
///
/// Empty entries are dropped and the first occurrence of a duplicate wins.
/// The count limit applies after de-duplication.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<String>, TagError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(tags.len());

    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if tag.is_empty() || !seen.insert(tag.clone()) {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(TagError::TooLong {
                tag,
                max: MAX_TAG_LENGTH,
            });
        }
        if !tag_pattern().is_match(&tag) {
            return Err(TagError::InvalidCharacters(tag));
        }
        normalized.push(tag);
    }

    if normalized.len() > MAX_TAGS {
        return Err(TagError::TooMany {
            max: MAX_TAGS,
            count: normalized.len(),
        });
    }

    Ok(normalized)
}
