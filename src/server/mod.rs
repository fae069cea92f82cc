//! Registry actions
//!
//! [`RegistryServer`] implements the request handlers behind every transport.
//! Handlers take raw names as sent by callers, parse them (malformed input is
//! `InvalidArgument`), check referential preconditions against storage and
//! publish a notification once a mutation has been fully persisted.

mod artifacts;
mod containers;
mod specs;

pub use containers::ContainerBody;
pub use specs::SpecBody;

use crate::error::Result;
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::pagination::{Page, PageOptions};
use crate::storage::StorageBackend;
use crate::types::View;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Paging, filtering and view fields shared by every list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub page_size: i32,
    pub page_token: String,
    pub filter: String,
    pub view: View,
}

impl ListRequest {
    pub fn with_page_size(page_size: i32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    fn options(&self) -> Result<PageOptions> {
        PageOptions::new(self.page_size, self.filter.clone(), self.page_token.clone())
    }
}

/// Registry request handlers over a storage backend
#[derive(Clone)]
pub struct RegistryServer {
    storage: Arc<dyn StorageBackend>,
    notifier: Arc<dyn Notifier>,
}

impl RegistryServer {
    /// Create new server
    pub fn new(storage: Arc<dyn StorageBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self { storage, notifier }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    fn notify(&self, kind: NotificationKind, resource: impl fmt::Display) {
        self.notifier.notify(Notification::new(kind, resource));
    }
}

/// Fetch every page of a listing
async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(PageOptions) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut options = PageOptions::first(crate::pagination::MAX_PAGE_SIZE);
    let mut all = Vec::new();
    loop {
        let page = fetch(options.clone()).await?;
        all.extend(page.items);
        if page.next_page_token.is_empty() {
            return Ok(all);
        }
        options = options.with_token(page.next_page_token);
    }
}
