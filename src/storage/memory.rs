//! In-process storage provider
//!
//! Keeps buckets and objects in memory with S3-style error texts. Used by the
//! `memory` backend for local runs and by the test-suite, which can inject a
//! failure for any [`ProviderOp`] and count the remote calls made.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};

use super::{BucketSummary, CredentialResolver, ObjectSummary, ProviderOp, StorageProvider};
use crate::error::{Error, Result};

struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

struct MemoryBucket {
    created: DateTime<Utc>,
    objects: BTreeMap<String, StoredObject>,
}

/// Thread-safe in-memory bucket store
#[derive(Default)]
pub struct MemoryProvider {
    buckets: RwLock<BTreeMap<String, MemoryBucket>>,
    failures: Mutex<HashMap<ProviderOp, String>>,
    calls: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call of `op` fail with `message`
    pub fn fail_on(&self, op: ProviderOp, message: impl Into<String>) {
        self.failures.lock().unwrap().insert(op, message.into());
    }

    /// Clear an injected failure
    pub fn clear_failure(&self, op: ProviderOp) {
        self.failures.lock().unwrap().remove(&op);
    }

    /// Number of provider calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether `bucket/key` currently exists
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .read()
            .unwrap()
            .get(bucket)
            .map(|b| b.objects.contains_key(key))
            .unwrap_or(false)
    }

    /// Object content without counting a call
    pub fn peek(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .read()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|o| o.data.clone())
    }

    /// Count the call and apply any injected failure
    fn enter(&self, op: ProviderOp) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap().get(&op) {
            Some(message) => Err(Error::Provider(message.clone())),
            None => Ok(()),
        }
    }
}

fn no_such_bucket(bucket: &str) -> Error {
    Error::Provider(format!(
        "NoSuchBucket: The specified bucket does not exist ({})",
        bucket
    ))
}

fn no_such_key(bucket: &str, key: &str) -> Error {
    Error::Provider(format!(
        "NoSuchKey: The specified key does not exist ({}/{})",
        bucket, key
    ))
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        self.enter(ProviderOp::ListBuckets)?;
        let buckets = self.buckets.read().unwrap();
        Ok(buckets
            .iter()
            .map(|(name, bucket)| BucketSummary {
                name: name.clone(),
                creation_date: timestamp(&bucket.created),
            })
            .collect())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        self.enter(ProviderOp::ListObjects)?;
        let buckets = self.buckets.read().unwrap();
        let entry = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        Ok(entry
            .objects
            .iter()
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: timestamp(&object.last_modified),
            })
            .collect())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.enter(ProviderOp::CreateBucket)?;
        let mut buckets = self.buckets.write().unwrap();
        if buckets.contains_key(bucket) {
            return Err(Error::Provider(format!(
                "BucketAlreadyOwnedByYou: Your previous request to create the named bucket succeeded ({})",
                bucket
            )));
        }
        buckets.insert(
            bucket.to_string(),
            MemoryBucket {
                created: Utc::now(),
                objects: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.enter(ProviderOp::DeleteBucket)?;
        let mut buckets = self.buckets.write().unwrap();
        match buckets.get(bucket) {
            None => Err(no_such_bucket(bucket)),
            Some(entry) if !entry.objects.is_empty() => Err(Error::Provider(format!(
                "BucketNotEmpty: The bucket you tried to delete is not empty ({})",
                bucket
            ))),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        self.enter(ProviderOp::PutObject)?;
        let mut buckets = self.buckets.write().unwrap();
        let entry = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        entry.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.enter(ProviderOp::GetObject)?;
        let buckets = self.buckets.read().unwrap();
        let entry = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        entry
            .objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| no_such_key(bucket, key))
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        self.enter(ProviderOp::CopyObject)?;
        let mut buckets = self.buckets.write().unwrap();
        let data = buckets
            .get(src_bucket)
            .ok_or_else(|| no_such_bucket(src_bucket))?
            .objects
            .get(src_key)
            .map(|o| o.data.clone())
            .ok_or_else(|| no_such_key(src_bucket, src_key))?;
        let target = buckets
            .get_mut(dst_bucket)
            .ok_or_else(|| no_such_bucket(dst_bucket))?;
        target.objects.insert(
            dst_key.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.enter(ProviderOp::DeleteObject)?;
        let mut buckets = self.buckets.write().unwrap();
        let entry = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        // S3 reports success for missing keys
        entry.objects.remove(key);
        Ok(())
    }
}

/// Resolver that hands out a fixed provider, or none at all
pub struct StaticResolver {
    provider: Option<Arc<dyn StorageProvider>>,
    backend: &'static str,
}

impl StaticResolver {
    /// Always resolve to `provider`
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self {
            provider: Some(provider),
            backend: "memory",
        }
    }

    /// Never resolve; models an environment without credentials
    pub fn unavailable() -> Self {
        Self {
            provider: None,
            backend: "memory",
        }
    }
}

#[async_trait]
impl CredentialResolver for StaticResolver {
    async fn resolve(&self) -> Result<Arc<dyn StorageProvider>> {
        self.provider.clone().ok_or(Error::CredentialsUnavailable)
    }

    fn backend(&self) -> &'static str {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bucket_lifecycle() {
        let provider = MemoryProvider::new();
        provider.create_bucket("photos").await.unwrap();
        assert!(provider.create_bucket("photos").await.is_err());

        provider
            .put_object("photos", "2024/cat.jpg", Bytes::from_static(b"meow"))
            .await
            .unwrap();
        let err = provider.delete_bucket("photos").await.unwrap_err();
        assert!(err.to_string().starts_with("BucketNotEmpty"));

        provider.delete_object("photos", "2024/cat.jpg").await.unwrap();
        provider.delete_bucket("photos").await.unwrap();
        assert!(provider.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_objects_reports_sizes() {
        let provider = MemoryProvider::new();
        provider.create_bucket("logs").await.unwrap();
        provider
            .put_object("logs", "b.txt", Bytes::from_static(b"12345"))
            .await
            .unwrap();
        provider
            .put_object("logs", "a.txt", Bytes::new())
            .await
            .unwrap();

        let objects = provider.list_objects("logs").await.unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "a.txt");
        assert_eq!(objects[0].size, 0);
        assert_eq!(objects[1].size, 5);
    }

    #[tokio::test]
    async fn test_missing_bucket_and_key() {
        let provider = MemoryProvider::new();
        let err = provider.list_objects("nope").await.unwrap_err();
        assert!(err.to_string().starts_with("NoSuchBucket"));

        provider.create_bucket("here").await.unwrap();
        let err = provider.get_object("here", "missing").await.unwrap_err();
        assert!(err.to_string().starts_with("NoSuchKey"));
    }

    #[tokio::test]
    async fn test_copy_across_buckets() {
        let provider = MemoryProvider::new();
        provider.create_bucket("src").await.unwrap();
        provider.create_bucket("dst").await.unwrap();
        provider
            .put_object("src", "k", Bytes::from_static(b"payload"))
            .await
            .unwrap();

        provider.copy_object("src", "k", "dst", "k2").await.unwrap();
        assert_eq!(provider.peek("dst", "k2").unwrap(), Bytes::from_static(b"payload"));
        assert!(provider.contains("src", "k"));
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_count() {
        let provider = MemoryProvider::new();
        provider.fail_on(ProviderOp::ListBuckets, "AccessDenied: Access Denied");

        let err = provider.list_buckets().await.unwrap_err();
        assert_eq!(err.to_string(), "AccessDenied: Access Denied");
        assert_eq!(provider.calls(), 1);

        provider.clear_failure(ProviderOp::ListBuckets);
        assert!(provider.list_buckets().await.is_ok());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_resolver() {
        let resolver = StaticResolver::unavailable();
        assert!(matches!(
            resolver.resolve().await,
            Err(Error::CredentialsUnavailable)
        ));
    }
}
