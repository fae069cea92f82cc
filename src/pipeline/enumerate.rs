//! Enumerate specs matching a name pattern
//!
//! Pages through storage until the listing is exhausted, so callers see one
//! continuous stream of matches however many pages it took.

use crate::error::{RegistryError, Result};
use crate::names::{SpecName, VersionName, WILDCARD};
use crate::pagination::{PageOptions, MAX_PAGE_SIZE};
use crate::storage::StorageBackend;
use crate::types::Spec;
use std::future::Future;
use tracing::debug;

/// Resolve a spec name, spec pattern, or version pattern to a spec pattern
pub fn spec_pattern(raw: &str) -> Result<SpecName> {
    if let Ok(pattern) = SpecName::parse_pattern(raw) {
        return Ok(pattern);
    }
    if let Ok(version) = VersionName::parse_pattern(raw) {
        return Ok(version.spec(WILDCARD));
    }
    Err(RegistryError::invalid(format!(
        "{:?} does not name a spec or a collection of specs",
        raw
    )))
}

/// Call `callback` once per spec matching `pattern` and `filter`
///
/// Returns the number of matches. The first callback error stops the walk.
pub async fn for_each_spec<F, Fut>(
    storage: &dyn StorageBackend,
    pattern: &str,
    filter: &str,
    mut callback: F,
) -> Result<usize>
where
    F: FnMut(Spec) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let pattern = spec_pattern(pattern)?;
    let parent = pattern.version();
    let mut options = PageOptions::new(MAX_PAGE_SIZE as i32, filter, "")?;

    let mut matched = 0;
    let mut pages = 0;
    loop {
        let page = storage.list_specs(&parent, &options).await?;
        pages += 1;
        for spec in page.items {
            if pattern.matches(&spec.name) {
                matched += 1;
                callback(spec).await?;
            }
        }
        if page.next_page_token.is_empty() {
            break;
        }
        options = options.with_token(page.next_page_token);
    }

    debug!("Enumerated {} specs for {} over {} pages", matched, pattern, pages);
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::ProjectName;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_spec_pattern_forms() {
        let exact = spec_pattern("projects/p/apis/a/versions/v/specs/s").unwrap();
        assert!(!exact.is_pattern());
        let collection = spec_pattern("projects/p/apis/-/versions/-").unwrap();
        assert_eq!(collection.spec_id, "-");
        assert!(spec_pattern("projects/p").is_err());
    }

    #[tokio::test]
    async fn test_walks_every_page() {
        let storage = MemoryStorage::new();
        for i in 0..2500 {
            let name = ProjectName::new("p")
                .api("a")
                .version("v")
                .spec(format!("s{:04}", i));
            storage.save_spec(&Spec::new(name, "discovery")).await.unwrap();
        }

        let mut seen = Vec::new();
        let count = for_each_spec(&storage, "projects/p/apis/a/versions/v/specs/-", "", |spec| {
            seen.push(spec.name.spec_id);
            async { Ok(()) }
        })
        .await
        .unwrap();
        assert_eq!(count, 2500);
        assert_eq!(seen.len(), 2500);
        assert_eq!(seen.first().unwrap(), "s0000");
        assert_eq!(seen.last().unwrap(), "s2499");
    }

    #[tokio::test]
    async fn test_exact_name_and_filter() {
        let storage = MemoryStorage::new();
        let version = ProjectName::new("p").api("a").version("v");
        for (id, style) in [("one", "openapi/v3"), ("two", "discovery"), ("three", "openapi/v2")] {
            storage
                .save_spec(&Spec::new(version.spec(id), style))
                .await
                .unwrap();
        }

        let mut hits = 0;
        for_each_spec(&storage, "projects/p/apis/a/versions/v/specs/two", "", |_| {
            hits += 1;
            async { Ok(()) }
        })
        .await
        .unwrap();
        assert_eq!(hits, 1);

        let count = for_each_spec(
            &storage,
            "projects/p/apis/a/versions/v",
            r#"style.startsWith("openapi")"#,
            |_| async { Ok(()) },
        )
        .await
        .unwrap();
        assert_eq!(count, 2);
    }
}
