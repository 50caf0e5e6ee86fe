use crate::store::{ListPage, ObjectMeta, ObjectStore};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredObject {
    size: u64,
    last_modified: DateTime<Utc>,
}

/// Injected backend failure, matched against `bucket` and a key or prefix.
#[derive(Debug, Clone)]
struct Fault {
    bucket: String,
    key_prefix: String,
    message: String,
}

/// In-process store holding object metadata only.
///
/// Besides serving tests it can simulate backend faults and latency, which
/// is how transient listing errors and deadline expiry are exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    faults: RwLock<Vec<Fault>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.add_bucket(bucket);
        self
    }

    pub fn with_object(self, bucket: &str, key: &str, size: u64, last_modified: DateTime<Utc>) -> Self {
        self.put(bucket, key, size, last_modified);
        self
    }

    /// Every call first sleeps for `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every operation on `bucket` whose key or prefix starts with `key_prefix`.
    pub fn with_fault(self, bucket: &str, key_prefix: &str, message: &str) -> Self {
        if let Ok(mut faults) = self.faults.write() {
            faults.push(Fault {
                bucket: bucket.to_string(),
                key_prefix: key_prefix.to_string(),
                message: message.to_string(),
            });
        }
        self
    }

    pub fn add_bucket(&self, bucket: &str) {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.to_string()).or_default();
        }
    }

    /// Insert or replace an object, creating its bucket if needed.
    pub fn put(&self, bucket: &str, key: &str, size: u64, last_modified: DateTime<Utc>) {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.to_string()).or_default().insert(
                key.to_string(),
                StoredObject {
                    size,
                    last_modified,
                },
            );
        }
    }

    async fn enter(&self, bucket: &str, key: &str) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let faults = self
            .faults
            .read()
            .map_err(|_| Error::Backend("fault table poisoned".to_string()))?;
        match faults
            .iter()
            .find(|f| f.bucket == bucket && key.starts_with(&f.key_prefix))
        {
            Some(fault) => Err(Error::Backend(fault.message.clone())),
            None => Ok(()),
        }
    }

    fn object(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| Error::Backend("bucket table poisoned".to_string()))?;
        Ok(buckets.get(bucket).and_then(|objects| objects.get(key)).cloned())
    }

    fn require(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        self.object(bucket, key)?.ok_or_else(|| Error::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.enter(bucket, "").await?;
        let buckets = self
            .buckets
            .read()
            .map_err(|_| Error::Backend("bucket table poisoned".to_string()))?;
        Ok(buckets.contains_key(bucket))
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.enter(bucket, key).await?;
        Ok(self.object(bucket, key)?.is_some())
    }

    async fn size(&self, bucket: &str, key: &str) -> Result<u64> {
        self.enter(bucket, key).await?;
        Ok(self.require(bucket, key)?.size)
    }

    async fn last_modified(&self, bucket: &str, key: &str) -> Result<DateTime<Utc>> {
        self.enter(bucket, key).await?;
        Ok(self.require(bucket, key)?.last_modified)
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage> {
        self.enter(bucket, prefix).await?;

        let buckets = self
            .buckets
            .read()
            .map_err(|_| Error::Backend("bucket table poisoned".to_string()))?;
        let Some(objects) = buckets.get(bucket) else {
            return Err(Error::Backend(format!("bucket '{}' does not exist", bucket)));
        };

        let mut matching = objects
            .range::<str, _>((
                continuation.map_or(std::ops::Bound::Included(prefix), std::ops::Bound::Excluded),
                std::ops::Bound::Unbounded,
            ))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectMeta {
                key: key.clone(),
                size: obj.size,
                last_modified: obj.last_modified,
            });

        let page_size = page_size.max(1);
        let page: Vec<ObjectMeta> = matching.by_ref().take(page_size).collect();
        let next = match (matching.next(), page.last()) {
            (Some(_), Some(last)) => Some(last.key.clone()),
            _ => None,
        };

        Ok(ListPage { objects: page, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list_all;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_object("lake", "a/1.csv", 10, ts())
            .with_object("lake", "a/2.csv", 20, ts())
            .with_object("lake", "a/3.csv", 30, ts())
            .with_object("lake", "b/1.csv", 40, ts())
    }

    #[tokio::test]
    async fn test_list_pages_follow_continuation() {
        let store = store();
        let first = store.list_page("lake", "a/", None, 2).await.unwrap();
        assert_eq!(first.objects.len(), 2);
        assert_eq!(first.next.as_deref(), Some("a/2.csv"));

        let second = store
            .list_page("lake", "a/", first.next.as_deref(), 2)
            .await
            .unwrap();
        assert_eq!(second.objects.len(), 1);
        assert_eq!(second.objects[0].key, "a/3.csv");
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn test_list_all_stays_within_prefix() {
        let store = store();
        let objects = list_all(&store, "lake", "a/", 1).await.unwrap();
        let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/1.csv", "a/2.csv", "a/3.csv"]);
    }

    #[tokio::test]
    async fn test_metadata_lookups() {
        let store = store();
        assert!(store.bucket_exists("lake").await.unwrap());
        assert!(!store.bucket_exists("swamp").await.unwrap());
        assert!(store.exists("lake", "b/1.csv").await.unwrap());
        assert_eq!(store.size("lake", "a/2.csv").await.unwrap(), 20);
        assert!(matches!(
            store.size("lake", "missing").await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_injected_fault() {
        let store = store().with_fault("lake", "b/", "503 Slow Down");
        assert!(store.exists("lake", "a/1.csv").await.is_ok());
        let err = store.list_page("lake", "b/", None, 10).await.unwrap_err();
        assert!(err.to_string().contains("503 Slow Down"));
    }
}
