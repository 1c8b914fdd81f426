//! Storage Provider Module
//!
//! The console owns no data. Every bucket and object lives in the remote
//! provider and is reached through the [`StorageProvider`] trait. A provider
//! is obtained per request from a [`CredentialResolver`], which reports
//! [`Error::CredentialsUnavailable`](crate::Error::CredentialsUnavailable)
//! when the environment does not yield usable credentials.

mod memory;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::config::{Backend, ProviderConfig};
use crate::error::Result;

pub use memory::{MemoryProvider, StaticResolver};
pub use remote::{AmbientCredentials, S3Provider};

/// A bucket as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSummary {
    pub name: String,
    pub creation_date: String,
}

/// An object as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: String,
}

/// Remote calls the console makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    ListBuckets,
    ListObjects,
    CreateBucket,
    DeleteBucket,
    PutObject,
    GetObject,
    CopyObject,
    DeleteObject,
}

impl std::fmt::Display for ProviderOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderOp::ListBuckets => "ListBuckets",
            ProviderOp::ListObjects => "ListObjects",
            ProviderOp::CreateBucket => "CreateBucket",
            ProviderOp::DeleteBucket => "DeleteBucket",
            ProviderOp::PutObject => "PutObject",
            ProviderOp::GetObject => "GetObject",
            ProviderOp::CopyObject => "CopyObject",
            ProviderOp::DeleteObject => "DeleteObject",
        };
        f.write_str(name)
    }
}

/// Bucket and object operations of an S3-compatible provider.
///
/// Each method is a single pass-through; failures come back as
/// `Error::Provider` with the provider's text.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>>;

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

/// Produces a provider client from ambient configuration
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolve a client, or `Error::CredentialsUnavailable`
    async fn resolve(&self) -> Result<Arc<dyn StorageProvider>>;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// Build the resolver for the configured backend
pub fn resolver_for(config: &ProviderConfig) -> Arc<dyn CredentialResolver> {
    match config.backend {
        Backend::S3 => Arc::new(AmbientCredentials::new(config.clone())),
        Backend::Memory => Arc::new(StaticResolver::new(Arc::new(MemoryProvider::new()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_resolves() {
        let config = ProviderConfig {
            backend: Backend::Memory,
            ..ProviderConfig::default()
        };
        let resolver = resolver_for(&config);
        assert_eq!(resolver.backend(), "memory");

        let client = resolver.resolve().await.unwrap();
        assert!(client.list_buckets().await.unwrap().is_empty());
    }

    #[test]
    fn test_s3_backend_name() {
        let resolver = resolver_for(&ProviderConfig::default());
        assert_eq!(resolver.backend(), "s3");
    }
}
