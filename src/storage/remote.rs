//! S3 provider backed by `rust-s3`
//!
//! Credentials are discovered from the environment on every resolve: the
//! `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` variables, then the shared
//! credentials file (optionally a named profile). Nothing is cached between
//! requests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};

use super::{BucketSummary, CredentialResolver, ObjectSummary, StorageProvider};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};

/// Resolves an [`S3Provider`] from ambient credentials
pub struct AmbientCredentials {
    config: ProviderConfig,
}

impl AmbientCredentials {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn region(&self) -> Region {
        match &self.config.endpoint {
            Some(endpoint) => Region::Custom {
                region: self.config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => match self.config.region.parse() {
                Ok(region) => region,
                Err(e) => {
                    tracing::warn!(
                        "Region '{}' not recognised ({}), using us-east-1",
                        self.config.region,
                        e
                    );
                    Region::UsEast1
                }
            },
        }
    }
}

#[async_trait]
impl CredentialResolver for AmbientCredentials {
    async fn resolve(&self) -> Result<Arc<dyn StorageProvider>> {
        let profile = self.config.profile.clone();

        // Profile lookup reads the shared credentials file
        let discovered = tokio::task::spawn_blocking(move || match profile {
            Some(name) => Credentials::from_profile(Some(&name)),
            None => Credentials::default(),
        })
        .await;

        let credentials = match discovered {
            Ok(Ok(credentials)) if credentials.access_key.is_some() => credentials,
            Ok(Ok(_)) => {
                tracing::debug!("Credential discovery returned an anonymous identity");
                return Err(Error::CredentialsUnavailable);
            }
            Ok(Err(e)) => {
                tracing::debug!("Credential discovery failed: {}", e);
                return Err(Error::CredentialsUnavailable);
            }
            Err(e) => {
                tracing::warn!("Credential discovery task failed: {}", e);
                return Err(Error::CredentialsUnavailable);
            }
        };

        Ok(Arc::new(S3Provider::new(
            self.region(),
            credentials,
            self.config.path_style,
        )))
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}

/// Storage provider talking to an S3-compatible endpoint
pub struct S3Provider {
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3Provider {
    pub fn new(region: Region, credentials: Credentials, path_style: bool) -> Self {
        Self {
            region,
            credentials,
            path_style,
        }
    }

    /// Handle for a single bucket
    fn bucket(&self, name: &str) -> Result<Box<Bucket>> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())?;
        if self.path_style {
            Ok(bucket.with_path_style())
        } else {
            Ok(bucket)
        }
    }
}

/// How an object copy is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyPlan {
    /// One `CopyObject` call, data stays on the provider
    ServerSide,
    /// `GetObject` then `PutObject` through the console
    ReadWrite,
}

impl CopyPlan {
    fn for_buckets(src_bucket: &str, dst_bucket: &str) -> Self {
        if src_bucket == dst_bucket {
            CopyPlan::ServerSide
        } else {
            CopyPlan::ReadWrite
        }
    }
}

/// Turn a non-2xx status into a provider error
fn ensure_success(operation: &str, status: u16) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(Error::Provider(format!("{} returned HTTP {}", operation, status)))
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        let response = Bucket::list_buckets(self.region.clone(), self.credentials.clone()).await?;

        Ok(response
            .buckets
            .bucket
            .into_iter()
            .map(|info| BucketSummary {
                name: info.name,
                creation_date: info.creation_date.to_string(),
            })
            .collect())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        let results = self.bucket(bucket)?.list(String::new(), None).await?;

        Ok(results
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| ObjectSummary {
                key: object.key,
                size: object.size,
                last_modified: object.last_modified,
            })
            .collect())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let config = BucketConfiguration::default();
        let response = if self.path_style {
            Bucket::create_with_path_style(bucket, self.region.clone(), self.credentials.clone(), config)
                .await?
        } else {
            Bucket::create(bucket, self.region.clone(), self.credentials.clone(), config).await?
        };

        if response.success() {
            Ok(())
        } else {
            Err(Error::Provider(format!(
                "CreateBucket returned HTTP {}: {}",
                response.response_code, response.response_text
            )))
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let status = self.bucket(bucket)?.delete().await?;
        ensure_success("DeleteBucket", status)
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let response = self.bucket(bucket)?.put_object(key, &data).await?;
        ensure_success("PutObject", response.status_code())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let response = self.bucket(bucket)?.get_object(key).await?;
        ensure_success("GetObject", response.status_code())?;
        Ok(Bytes::from(response.bytes().to_vec()))
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        match CopyPlan::for_buckets(src_bucket, dst_bucket) {
            CopyPlan::ServerSide => {
                let status = self
                    .bucket(src_bucket)?
                    .copy_object_internal(src_key, dst_key)
                    .await?;
                ensure_success("CopyObject", status)
            }
            CopyPlan::ReadWrite => {
                // rust-s3 only copies within a bucket. The body is held in
                // memory and Content-Type/user metadata are not carried over.
                let data = self.get_object(src_bucket, src_key).await?;
                self.put_object(dst_bucket, dst_key, data).await
            }
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let response = self.bucket(bucket)?.delete_object(key).await?;
        ensure_success("DeleteObject", response.status_code())
    }
}
