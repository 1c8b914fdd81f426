//! Console Operations
//!
//! One method per console operation. Each resolves a client, performs the
//! storage call(s) and turns the result into an [`Outcome`]: an optional
//! notice plus where the browser goes next. Nothing here returns an error;
//! every failure becomes notice text and a navigation to a safe page.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::storage::{BucketSummary, CredentialResolver, ObjectSummary, StorageProvider};

/// Where a redirect sends the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Bucket list
    Home,
    /// Object listing of a bucket
    Bucket(String),
}

impl Navigation {
    /// URL path for the redirect
    pub fn path(&self) -> String {
        match self {
            Navigation::Home => "/".to_string(),
            Navigation::Bucket(bucket) => format!("/bucket/{}", crate::views::encode_segment(bucket)),
        }
    }
}

/// A page rendered in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Home {
        buckets: Vec<BucketSummary>,
    },
    Objects {
        bucket: String,
        objects: Vec<ObjectSummary>,
        /// Copy/move destinations
        buckets: Vec<BucketSummary>,
    },
}

/// Object bytes sent as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Redirect(Navigation),
    Render(Page),
    Attachment(Attachment),
}

/// Result of one console operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub notice: Option<String>,
    pub reply: Reply,
}

impl Outcome {
    fn redirect(to: Navigation, notice: impl Into<String>) -> Self {
        Self {
            notice: Some(notice.into()),
            reply: Reply::Redirect(to),
        }
    }

    fn quiet_redirect(to: Navigation) -> Self {
        Self {
            notice: None,
            reply: Reply::Redirect(to),
        }
    }

    fn render(page: Page, notice: Option<String>) -> Self {
        Self {
            notice,
            reply: Reply::Render(page),
        }
    }
}

/// A file taken from an upload form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

/// Copy/move destination as submitted
#[derive(Debug, Clone, Default)]
pub struct Destination {
    pub bucket: Option<String>,
    /// Blank means "same key as the source"
    pub key: Option<String>,
}

impl Destination {
    /// Resolve against the source key
    fn resolve(&self, source_key: &str) -> Result<(String, String)> {
        let bucket = required(self.bucket.as_deref(), "dest_bucket")?;
        let key = match self.key.as_deref() {
            Some(k) if !k.trim().is_empty() => k.to_string(),
            _ => source_key.to_string(),
        };
        Ok((bucket, key))
    }
}

/// Trimmed value of a required form field
fn required(value: Option<&str>, field: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::InvalidRequest(format!("{} is required", field))),
    }
}

/// Key of the zero-byte marker object for a folder
pub fn folder_key(name: &str) -> String {
    if name.ends_with('/') {
        name.to_string()
    } else {
        format!("{}/", name)
    }
}

/// Download name for a key: its last path segment
pub fn download_name(key: &str) -> String {
    key.split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .unwrap_or("download")
        .to_string()
}

/// The console's operation handlers
pub struct Console {
    resolver: Arc<dyn CredentialResolver>,
}

impl Console {
    pub fn new(resolver: Arc<dyn CredentialResolver>) -> Self {
        Self { resolver }
    }

    /// Backend name of the resolver
    pub fn backend(&self) -> &'static str {
        self.resolver.backend()
    }

    /// Whether a client can currently be resolved
    pub async fn credentials_available(&self) -> bool {
        self.resolver.resolve().await.is_ok()
    }

    /// Resolve a client, or the outcome every handler returns without one
    async fn client(&self) -> std::result::Result<Arc<dyn StorageProvider>, Outcome> {
        self.resolver.resolve().await.map_err(|e| {
            tracing::warn!("No storage client: {}", e);
            Outcome::redirect(Navigation::Home, e.to_string())
        })
    }

    /// GET / - list all buckets
    pub async fn home(&self) -> Outcome {
        let client = match self.resolver.resolve().await {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("No storage client: {}", e);
                return Outcome::render(Page::Home { buckets: Vec::new() }, Some(e.to_string()));
            }
        };

        match client.list_buckets().await {
            Ok(buckets) => Outcome::render(Page::Home { buckets }, None),
            Err(e) => {
                tracing::warn!("Listing buckets failed: {}", e);
                Outcome::render(
                    Page::Home { buckets: Vec::new() },
                    Some(format!("Storage error: {}", e)),
                )
            }
        }
    }

    /// GET /bucket/{bucket} - list the objects of a bucket
    pub async fn list_objects(&self, bucket: &str) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };

        let listing = async {
            let objects = client.list_objects(bucket).await?;
            let buckets = client.list_buckets().await?;
            Ok::<_, Error>((objects, buckets))
        };

        match listing.await {
            Ok((objects, buckets)) => Outcome::render(
                Page::Objects {
                    bucket: bucket.to_string(),
                    objects,
                    buckets,
                },
                None,
            ),
            Err(e) => {
                tracing::warn!(bucket = %bucket, "Listing objects failed: {}", e);
                Outcome::redirect(Navigation::Home, format!("Error accessing bucket: {}", e))
            }
        }
    }

    /// POST /create_bucket
    pub async fn create_bucket(&self, bucket_name: Option<&str>) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };

        let result = async {
            let name = required(bucket_name, "bucket_name")?;
            client.create_bucket(&name).await?;
            Ok::<_, Error>(name)
        };

        match result.await {
            Ok(name) => {
                tracing::info!("Created bucket {}", name);
                Outcome::redirect(Navigation::Home, format!("Bucket '{}' created successfully", name))
            }
            Err(e) => {
                tracing::warn!("Create bucket failed: {}", e);
                Outcome::redirect(Navigation::Home, format!("Failed to create bucket: {}", e))
            }
        }
    }

    /// GET /delete_bucket/{bucket}
    pub async fn delete_bucket(&self, bucket: &str) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };

        match client.delete_bucket(bucket).await {
            Ok(()) => {
                tracing::info!("Deleted bucket {}", bucket);
                Outcome::redirect(Navigation::Home, format!("Bucket '{}' deleted successfully", bucket))
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, "Delete bucket failed: {}", e);
                Outcome::redirect(Navigation::Home, format!("Failed to delete bucket: {}", e))
            }
        }
    }

    /// POST /upload/{bucket} - store the file under its own name
    pub async fn upload(&self, bucket: &str, file: Result<Option<UploadedFile>>) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };
        let back = Navigation::Bucket(bucket.to_string());

        let file = match file {
            Ok(Some(file)) => file,
            Ok(None) => return Outcome::quiet_redirect(back),
            Err(e) => return Outcome::redirect(back, format!("Upload failed: {}", e)),
        };

        match client.put_object(bucket, &file.filename, file.data.clone()).await {
            Ok(()) => {
                tracing::info!(bucket = %bucket, size = file.data.len(), "Uploaded {}", file.filename);
                Outcome::redirect(back, format!("File '{}' uploaded successfully", file.filename))
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, key = %file.filename, "Upload failed: {}", e);
                Outcome::redirect(back, format!("Upload failed: {}", e))
            }
        }
    }

    /// GET /delete_file/{bucket}/{key}
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };
        let back = Navigation::Bucket(bucket.to_string());

        match client.delete_object(bucket, key).await {
            Ok(()) => {
                tracing::info!(bucket = %bucket, "Deleted {}", key);
                Outcome::redirect(back, format!("File '{}' deleted successfully", key))
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, key = %key, "Delete failed: {}", e);
                Outcome::redirect(back, format!("Delete failed: {}", e))
            }
        }
    }

    /// GET /download_file/{bucket}/{key}
    pub async fn download(&self, bucket: &str, key: &str) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };

        match client.get_object(bucket, key).await {
            Ok(data) => Outcome {
                notice: None,
                reply: Reply::Attachment(Attachment {
                    filename: download_name(key),
                    data,
                }),
            },
            Err(e) => {
                tracing::warn!(bucket = %bucket, key = %key, "Download failed: {}", e);
                Outcome::redirect(
                    Navigation::Bucket(bucket.to_string()),
                    format!("Download failed: {}", e),
                )
            }
        }
    }

    /// POST /copy_file/{bucket}/{key}
    pub async fn copy(&self, bucket: &str, key: &str, dest: &Destination) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };
        let back = Navigation::Bucket(bucket.to_string());

        let result = async {
            let (dest_bucket, dest_key) = dest.resolve(key)?;
            client.copy_object(bucket, key, &dest_bucket, &dest_key).await?;
            Ok::<_, Error>((dest_bucket, dest_key))
        };

        match result.await {
            Ok((dest_bucket, dest_key)) => {
                tracing::info!("Copied {}/{} to {}/{}", bucket, key, dest_bucket, dest_key);
                Outcome::redirect(
                    back,
                    format!("File '{}' copied to {}/{}", key, dest_bucket, dest_key),
                )
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, key = %key, "Copy failed: {}", e);
                Outcome::redirect(back, format!("Copy failed: {}", e))
            }
        }
    }

    /// POST /move_file/{bucket}/{key}
    ///
    /// Copy, then delete the source. Not atomic: when the delete fails the
    /// copy stays where it landed and only the failure is reported.
    pub async fn move_object(&self, bucket: &str, key: &str, dest: &Destination) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };
        let back = Navigation::Bucket(bucket.to_string());

        let result = async {
            let (dest_bucket, dest_key) = dest.resolve(key)?;
            client.copy_object(bucket, key, &dest_bucket, &dest_key).await?;
            if let Err(e) = client.delete_object(bucket, key).await {
                tracing::warn!(
                    "Move of {}/{} copied to {}/{} but source delete failed",
                    bucket, key, dest_bucket, dest_key
                );
                return Err(e);
            }
            Ok::<_, Error>((dest_bucket, dest_key))
        };

        match result.await {
            Ok((dest_bucket, dest_key)) => {
                tracing::info!("Moved {}/{} to {}/{}", bucket, key, dest_bucket, dest_key);
                Outcome::redirect(
                    back,
                    format!("File '{}' moved to {}/{}", key, dest_bucket, dest_key),
                )
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, key = %key, "Move failed: {}", e);
                Outcome::redirect(back, format!("Move failed: {}", e))
            }
        }
    }

    /// POST /create_folder/{bucket}
    pub async fn create_folder(&self, bucket: &str, folder_name: Option<&str>) -> Outcome {
        let client = match self.client().await {
            Ok(c) => c,
            Err(outcome) => return outcome,
        };
        let back = Navigation::Bucket(bucket.to_string());

        let result = async {
            let name = match folder_name {
                Some(name) if !name.trim().is_empty() => folder_key(name),
                _ => return Err(Error::InvalidRequest("folder_name is required".into())),
            };
            client.put_object(bucket, &name, Bytes::new()).await?;
            Ok::<_, Error>(name)
        };

        match result.await {
            Ok(name) => {
                tracing::info!(bucket = %bucket, "Created folder {}", name);
                Outcome::redirect(
                    back,
                    format!("Folder '{}' created in bucket '{}'", name, bucket),
                )
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, "Create folder failed: {}", e);
                Outcome::redirect(back, format!("Failed to create folder: {}", e))
            }
        }
    }
}
