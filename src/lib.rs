//! S3 Console - Web Console for S3-Compatible Object Storage
//!
//! A small server-rendered web application for browsing and managing
//! buckets and objects on an S3-compatible provider.
//!
//! # Architecture
//!
//! Every browser request maps to one console operation. The operation asks
//! the credential resolver for a storage client, performs at most a few
//! provider calls, and returns an outcome: a page to render, a redirect, or
//! a file download, optionally with a status notice. Notices travel to the
//! next rendered page through a session-keyed mailbox.
//!
//! # Features
//!
//! - Bucket listing, creation and deletion
//! - Object listing, upload, download, deletion, copy and move
//! - Folder placeholders (zero-byte keys ending in `/`)
//! - Remote S3 backend via ambient credentials, or an in-memory backend

pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod notice;
pub mod storage;
pub mod views;

pub use config::ConsoleConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{AppState, ConsoleServer};
    pub use crate::config::{Backend, ConsoleConfig};
    pub use crate::console::{Console, Outcome};
    pub use crate::error::{Error, Result};
    pub use crate::notice::{NoticeBox, SessionId};
    pub use crate::storage::{CredentialResolver, MemoryProvider, StorageProvider};
}
