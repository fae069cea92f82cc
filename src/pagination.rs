//! Continuation tokens over name-ordered listings
//!
//! Listings are ordered by full resource name. A page token records the last
//! name returned (keyset pagination) together with a fingerprint of the filter
//! the page was produced under. Pages fetched with the same filter and no
//! intervening writes are disjoint and contiguous, and a token replayed under a
//! different filter is rejected with `InvalidArgument`.
//!
//! Tokens are URL-safe base64 of a small JSON document and are opaque to callers.

use crate::error::{RegistryError, Result};
use crate::filter::{Filter, Filterable};
use crate::types::sha256_hex;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

/// Page size used when the caller asks for 0
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller can get
pub const MAX_PAGE_SIZE: usize = 1000;

/// Normalize a requested page size
pub fn clamp_page_size(requested: i32) -> Result<usize> {
    match requested {
        n if n < 0 => Err(RegistryError::invalid(format!(
            "invalid page_size {}: must not be negative",
            n
        ))),
        0 => Ok(DEFAULT_PAGE_SIZE),
        n => Ok((n as usize).min(MAX_PAGE_SIZE)),
    }
}

/// Listing options passed to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    pub size: usize,
    pub filter: String,
    pub token: String,
}

impl PageOptions {
    /// Build options from raw request fields
    pub fn new(page_size: i32, filter: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            size: clamp_page_size(page_size)?,
            filter: filter.into(),
            token: token.into(),
        })
    }

    /// First page of `size` with no filter
    pub fn first(size: usize) -> Self {
        Self {
            size: size.clamp(1, MAX_PAGE_SIZE),
            filter: String::new(),
            token: String::new(),
        }
    }

    /// Same options positioned at `token`
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..self.clone()
        }
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Empty exactly when no further results remain
    pub next_page_token: String,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page_token: self.next_page_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Cursor {
    after: String,
    filter: String,
}

fn filter_fingerprint(filter: &str) -> String {
    sha256_hex(filter.trim().as_bytes())[..16].to_string()
}

/// Encode the position after `last_name` under `filter`
pub fn encode_cursor(last_name: &str, filter: &str) -> String {
    let cursor = Cursor {
        after: last_name.to_string(),
        filter: filter_fingerprint(filter),
    };
    // Serializing two strings cannot fail
    let json = serde_json::to_vec(&cursor).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a token; an empty token means "start from the beginning"
pub fn decode_cursor(token: &str, filter: &str) -> Result<Option<String>> {
    if token.is_empty() {
        return Ok(None);
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| RegistryError::invalid(format!("invalid page_token: {}", e)))?;
    let cursor: Cursor = serde_json::from_slice(&bytes)
        .map_err(|e| RegistryError::invalid(format!("invalid page_token: {}", e)))?;
    if cursor.filter != filter_fingerprint(filter) {
        return Err(RegistryError::invalid(
            "invalid page_token: it was issued for a different filter",
        ));
    }
    Ok(Some(cursor.after))
}

/// Cut one page out of records sorted ascending by resource name
pub fn paginate<T, I>(records: I, options: &PageOptions) -> Result<Page<T>>
where
    T: Filterable,
    I: IntoIterator<Item = T>,
{
    let filter = Filter::for_type::<T>(&options.filter)?;
    let after = decode_cursor(&options.token, &options.filter)?;
    let size = options.size.max(1);

    let matches: Vec<T> = records
        .into_iter()
        .filter(|r| match &after {
            Some(after) => r.resource_name().as_str() > after.as_str(),
            None => true,
        })
        .filter(|r| filter.matches(r))
        .take(size + 1)
        .collect();
    Ok(page_of(matches, size, &options.filter))
}

/// Page from matches that already lie past the cursor, in name order
///
/// Holding more than `size` matches means another page follows.
pub fn page_of<T: Filterable>(mut matches: Vec<T>, size: usize, filter: &str) -> Page<T> {
    let more = matches.len() > size;
    matches.truncate(size);
    let next_page_token = match (more, matches.last()) {
        (true, Some(last)) => encode_cursor(&last.resource_name(), filter),
        _ => String::new(),
    };
    Page {
        items: matches,
        next_page_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::ProjectName;
    use crate::types::Project;

    fn projects(n: usize) -> Vec<Project> {
        let mut all: Vec<Project> = (0..n)
            .map(|i| Project::new(ProjectName::new(format!("p{:03}", i))))
            .collect();
        all.sort_by_key(|p| p.name.to_string());
        all
    }

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(0).unwrap(), 50);
        assert_eq!(clamp_page_size(7).unwrap(), 7);
        assert_eq!(clamp_page_size(5000).unwrap(), 1000);
        assert!(clamp_page_size(-1).is_err());
    }

    #[test]
    fn test_cursor_round_trip() {
        let token = encode_cursor("projects/p001", "");
        assert_eq!(decode_cursor(&token, "").unwrap().as_deref(), Some("projects/p001"));
        assert_eq!(decode_cursor("", "whatever").unwrap(), None);
    }

    #[test]
    fn test_cursor_rejects_other_filter() {
        let token = encode_cursor("projects/p001", r#"name == "x""#);
        let err = decode_cursor(&token, "").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
    }

    #[test]
    fn test_cursor_rejects_garbage() {
        assert!(decode_cursor("!!not-base64!!", "").is_err());
        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(decode_cursor(&not_json, "").is_err());
    }

    #[test]
    fn test_pages_are_contiguous_and_complete() {
        let all = projects(23);
        let mut options = PageOptions::first(5);
        let mut seen = Vec::new();
        let mut pages = 0;
        loop {
            let page = paginate(all.clone(), &options).unwrap();
            assert!(page.items.len() <= 5);
            seen.extend(page.items.into_iter().map(|p| p.name.to_string()));
            pages += 1;
            if page.next_page_token.is_empty() {
                break;
            }
            options = options.with_token(page.next_page_token);
        }
        assert_eq!(pages, 5);
        let expected: Vec<String> = all.iter().map(|p| p.name.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_page() {
        let all = projects(10);
        let page = paginate(all.clone(), &PageOptions::first(10)).unwrap();
        assert_eq!(page.items.len(), 10);
        assert!(page.next_page_token.is_empty());
    }

    #[test]
    fn test_filter_applies_before_paging() {
        let all = projects(30);
        let options = PageOptions {
            size: 3,
            filter: r#"name.startsWith("projects/p01")"#.to_string(),
            token: String::new(),
        };
        let first = paginate(all.clone(), &options).unwrap();
        assert_eq!(first.items.len(), 3);
        let second = paginate(all.clone(), &options.with_token(first.next_page_token)).unwrap();
        assert_eq!(second.items.len(), 3);
        assert_eq!(second.items[0].name.to_string(), "projects/p013");
    }
}
