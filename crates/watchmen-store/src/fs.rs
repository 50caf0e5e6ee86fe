use crate::store::{ListPage, ObjectMeta, ObjectStore};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Local filesystem store: each directory under `root` is a bucket and keys
/// are `/`-separated paths relative to it.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        validate_relative(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        validate_relative(key)?;
        Ok(self.bucket_dir(bucket)?.join(key))
    }

    async fn metadata(&self, bucket: &str, key: &str) -> Result<std::fs::Metadata> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(meta),
            Ok(_) => Err(Error::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// Reject keys that would escape the bucket directory.
fn validate_relative(key: &str) -> Result<()> {
    let escapes = Path::new(key)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if key.is_empty() || escapes {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn to_key(bucket_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(bucket_dir).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// Directories sort as their name plus `/`, which makes a depth-first walk
/// yield keys in ascending byte order (`a.csv` before `a/x.csv`).
fn walk_order(entry: &DirEntry) -> String {
    let mut name = entry.file_name().to_string_lossy().into_owned();
    if entry.file_type().is_dir() {
        name.push('/');
    }
    name
}

/// Whether a directory whose keys all start with `dir` can hold a key that
/// starts with `prefix` and sorts after `after`.
fn may_hold(dir: &str, prefix: &str, after: Option<&str>) -> bool {
    let overlaps = dir.starts_with(prefix) || prefix.starts_with(dir);
    let ahead = after.is_none_or(|after| after.starts_with(dir) || dir > after);
    overlaps && ahead
}

/// Objects under `prefix` in ascending key order, starting after `after` and
/// stopping once `limit` have been found.
///
/// Only the directory the prefix can live under is walked, and subtrees that
/// sort entirely before `after` are skipped, so each page costs roughly the
/// page itself rather than the whole listing.
fn scan(
    bucket_dir: &Path,
    prefix: &str,
    after: Option<&str>,
    limit: usize,
) -> Result<Vec<ObjectMeta>> {
    let start = match prefix.rfind('/') {
        Some(idx) => bucket_dir.join(&prefix[..idx]),
        None => bucket_dir.to_path_buf(),
    };
    if !start.is_dir() {
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(&start)
        .follow_links(false)
        .sort_by(|a, b| walk_order(a).cmp(&walk_order(b)))
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            to_key(bucket_dir, entry.path())
                .is_some_and(|dir| may_hold(&format!("{}/", dir), prefix, after))
        });

    let mut objects = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(key) = to_key(bucket_dir, entry.path()) else {
            continue;
        };
        if !key.starts_with(prefix) || after.is_some_and(|after| key.as_str() <= after) {
            continue;
        }
        let meta = entry.metadata()?;
        let modified = meta.modified()?;
        objects.push(ObjectMeta {
            key,
            size: meta.len(),
            last_modified: DateTime::<Utc>::from(modified),
        });
        if objects.len() >= limit {
            break;
        }
    }

    Ok(objects)
}

#[async_trait]
impl ObjectStore for FsStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let dir = self.bucket_dir(bucket)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.metadata(bucket, key).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn size(&self, bucket: &str, key: &str) -> Result<u64> {
        Ok(self.metadata(bucket, key).await?.len())
    }

    async fn last_modified(&self, bucket: &str, key: &str) -> Result<DateTime<Utc>> {
        let modified = self.metadata(bucket, key).await?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage> {
        let bucket_dir = self.bucket_dir(bucket)?;
        if !prefix.is_empty() {
            validate_relative(prefix.trim_end_matches('/'))?;
        }
        let page_size = page_size.max(1);
        let scan_prefix = prefix.to_string();
        let after = continuation.map(str::to_string);
        // One extra object tells whether another page follows.
        let mut page = tokio::task::spawn_blocking(move || {
            scan(&bucket_dir, &scan_prefix, after.as_deref(), page_size + 1)
        })
        .await??;

        let next = if page.len() > page_size {
            page.truncate(page_size);
            page.last().map(|object| object.key.clone())
        } else {
            None
        };

        Ok(ListPage { objects: page, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_relative_rejects_escapes() {
        assert!(validate_relative("a/b.csv").is_ok());
        assert!(validate_relative("../etc/passwd").is_err());
        assert!(validate_relative("/abs").is_err());
        assert!(validate_relative("").is_err());
    }

    #[test]
    fn test_may_hold_prunes_directories() {
        assert!(may_hold("a/", "a/b", None));
        assert!(may_hold("a/b/", "a/", None));
        assert!(!may_hold("c/", "a/", None));

        assert!(may_hold("a/2025/", "a/", Some("a/2025/03.csv")));
        assert!(may_hold("a/2026/", "a/", Some("a/2025/03.csv")));
        assert!(!may_hold("a/2024/", "a/", Some("a/2025/03.csv")));
    }

    #[test]
    fn test_to_key_uses_forward_slashes() {
        let bucket = Path::new("/data/lake");
        let key = to_key(bucket, Path::new("/data/lake/a/b/c.csv"));
        assert_eq!(key.as_deref(), Some("a/b/c.csv"));
    }
}
