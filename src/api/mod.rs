//! HTTP API Module
//!
//! Serves the browser console: HTML pages, form handlers and downloads.

mod http;
mod session;

pub use http::{
    content_disposition, create_router, AppState, ConsoleServer, CreateBucketForm, FolderForm,
    HealthResponse, TransferForm,
};
pub use session::{Session, SESSION_COOKIE};
