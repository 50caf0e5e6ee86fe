use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of one listed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Objects in ascending key order.
    pub objects: Vec<ObjectMeta>,
    /// Token to pass back for the next page, `None` on the last page.
    pub next: Option<String>,
}

/// Read-only object store operations used by checks.
///
/// Implementations must be safe to share across concurrent checks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Size in bytes. Errors with `NotFound` for missing keys.
    async fn size(&self, bucket: &str, key: &str) -> Result<u64>;

    /// Errors with `NotFound` for missing keys.
    async fn last_modified(&self, bucket: &str, key: &str) -> Result<DateTime<Utc>>;

    /// List up to `page_size` objects under `prefix`, resuming after `continuation`.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage>;
}

/// Cursor over a paginated listing.
///
/// Each call to [`Lister::next_page`] issues one request, so callers can stop
/// as soon as they have seen enough objects.
pub struct Lister<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    prefix: &'a str,
    page_size: usize,
    continuation: Option<String>,
    exhausted: bool,
}

impl<'a> Lister<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, prefix: &'a str, page_size: usize) -> Self {
        Self {
            store,
            bucket,
            prefix,
            page_size: page_size.max(1),
            continuation: None,
            exhausted: false,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<ObjectMeta>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .list_page(
                self.bucket,
                self.prefix,
                self.continuation.as_deref(),
                self.page_size,
            )
            .await?;

        match page.next {
            Some(token) => self.continuation = Some(token),
            None => self.exhausted = true,
        }

        Ok(Some(page.objects))
    }
}

/// Collect every object under `prefix`.
pub async fn list_all(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    page_size: usize,
) -> Result<Vec<ObjectMeta>> {
    let mut lister = Lister::new(store, bucket, prefix, page_size);
    let mut objects = Vec::new();
    while let Some(page) = lister.next_page().await? {
        objects.extend(page);
    }
    Ok(objects)
}
