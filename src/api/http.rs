//! HTTP Console Server
//!
//! Routes browser requests to the console operations and turns each
//! [`Outcome`] into a page, a redirect carrying a notice, or a download.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use super::session::Session;
use crate::config::ConsoleConfig;
use crate::console::{Attachment, Console, Destination, Outcome, Page, Reply, UploadedFile};
use crate::error::{Error, Result};
use crate::notice::NoticeBox;
use crate::storage::CredentialResolver;
use crate::views;

/// Shared application state
pub struct AppState {
    /// Operation handlers
    pub console: Console,
    /// Pending notices per session
    pub notices: NoticeBox,
}

impl AppState {
    /// Create state around a credential resolver
    pub fn new(resolver: Arc<dyn CredentialResolver>) -> Self {
        Self::with_notices(resolver, NoticeBox::new())
    }

    /// Create state with a preconfigured notice mailbox
    pub fn with_notices(resolver: Arc<dyn CredentialResolver>, notices: NoticeBox) -> Self {
        Self {
            console: Console::new(resolver),
            notices,
        }
    }

    /// Turn an operation outcome into the HTTP response
    async fn respond(&self, session: Session, outcome: Outcome) -> Response {
        let response = match outcome.reply {
            Reply::Redirect(to) => {
                if let Some(notice) = outcome.notice {
                    self.notices.post(session.id, notice).await;
                }
                Redirect::to(&to.path()).into_response()
            }
            Reply::Render(page) => {
                let mut notices = self.notices.take(session.id).await;
                notices.extend(outcome.notice);
                let html = match page {
                    Page::Home { buckets } => views::home(&buckets, &notices),
                    Page::Objects {
                        bucket,
                        objects,
                        buckets,
                    } => views::objects(&bucket, &objects, &buckets, &notices),
                };
                Html(html).into_response()
            }
            Reply::Attachment(attachment) => attachment_response(attachment),
        };

        session.attach(response)
    }
}

/// HTTP console server
pub struct ConsoleServer {
    config: ConsoleConfig,
    state: Arc<AppState>,
}

impl ConsoleServer {
    /// Create a new console server
    pub fn new(config: ConsoleConfig, resolver: Arc<dyn CredentialResolver>) -> Self {
        let state = Arc::new(AppState::new(resolver));
        Self { config, state }
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Build the router for this server's state and limits
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state), self.config.max_upload_bytes())
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn start(self) -> Result<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.config.server.bind_address).await?;
        tracing::info!(
            "Console listening on http://{} (backend: {})",
            self.config.server.bind_address,
            self.state.console.backend()
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        tracing::info!("Console shut down");
        Ok(())
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        // Listings
        .route("/", get(handle_home))
        .route("/bucket/:bucket", get(handle_list_objects))
        // Buckets
        .route("/create_bucket", post(handle_create_bucket))
        .route("/delete_bucket/:bucket", get(handle_delete_bucket))
        // Objects
        .route("/upload/:bucket", post(handle_upload))
        .route("/delete_file/:bucket/*key", get(handle_delete_file))
        .route("/download_file/:bucket/*key", get(handle_download_file))
        .route("/copy_file/:bucket/*key", post(handle_copy_file))
        .route("/move_file/:bucket/*key", post(handle_move_file))
        .route("/create_folder/:bucket", post(handle_create_folder))
        // Status
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}

// ============ Request/Response Types ============

/// Create bucket form
#[derive(Debug, Deserialize)]
pub struct CreateBucketForm {
    pub bucket_name: Option<String>,
}

/// Copy/move form
#[derive(Debug, Deserialize)]
pub struct TransferForm {
    pub dest_bucket: Option<String>,
    pub dest_key: Option<String>,
}

/// Create folder form
#[derive(Debug, Deserialize)]
pub struct FolderForm {
    pub folder_name: Option<String>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub backend: String,
    pub credentials: bool,
}

// ============ Handlers ============

async fn handle_home(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let outcome = state.console.home().await;
    state.respond(session, outcome).await
}

async fn handle_list_objects(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(bucket): Path<String>,
) -> Response {
    let outcome = state.console.list_objects(&bucket).await;
    state.respond(session, outcome).await
}

async fn handle_create_bucket(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Option<Form<CreateBucketForm>>,
) -> Response {
    let name = form.and_then(|Form(f)| f.bucket_name);
    let outcome = state.console.create_bucket(name.as_deref()).await;
    state.respond(session, outcome).await
}

async fn handle_delete_bucket(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(bucket): Path<String>,
) -> Response {
    let outcome = state.console.delete_bucket(&bucket).await;
    state.respond(session, outcome).await
}

async fn handle_upload(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(bucket): Path<String>,
    multipart: Option<Multipart>,
) -> Response {
    let file = read_upload(multipart).await;
    let outcome = state.console.upload(&bucket, file).await;
    state.respond(session, outcome).await
}

async fn handle_delete_file(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path((bucket, key)): Path<(String, String)>,
) -> Response {
    let outcome = state.console.delete_object(&bucket, &key).await;
    state.respond(session, outcome).await
}

async fn handle_download_file(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path((bucket, key)): Path<(String, String)>,
) -> Response {
    let outcome = state.console.download(&bucket, &key).await;
    state.respond(session, outcome).await
}

async fn handle_copy_file(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path((bucket, key)): Path<(String, String)>,
    form: Option<Form<TransferForm>>,
) -> Response {
    let dest = destination(form);
    let outcome = state.console.copy(&bucket, &key, &dest).await;
    state.respond(session, outcome).await
}

async fn handle_move_file(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path((bucket, key)): Path<(String, String)>,
    form: Option<Form<TransferForm>>,
) -> Response {
    let dest = destination(form);
    let outcome = state.console.move_object(&bucket, &key, &dest).await;
    state.respond(session, outcome).await
}

async fn handle_create_folder(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(bucket): Path<String>,
    form: Option<Form<FolderForm>>,
) -> Response {
    let name = form.and_then(|Form(f)| f.folder_name);
    let outcome = state.console.create_folder(&bucket, name.as_deref()).await;
    state.respond(session, outcome).await
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        backend: state.console.backend().to_string(),
        credentials: state.console.credentials_available().await,
    })
}

// ============ Helpers ============

fn destination(form: Option<Form<TransferForm>>) -> Destination {
    match form {
        Some(Form(f)) => Destination {
            bucket: f.dest_bucket,
            key: f.dest_key,
        },
        None => Destination::default(),
    }
}

/// Pull the `file` field out of an upload form.
///
/// `Ok(None)` when the form carries no file or the browser sent the field
/// without choosing one.
async fn read_upload(multipart: Option<Multipart>) -> Result<Option<UploadedFile>> {
    let mut multipart = match multipart {
        Some(m) => m,
        None => return Ok(None),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Ok(None),
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        return Ok(Some(UploadedFile { filename, data }));
    }

    Ok(None)
}

/// `Content-Disposition` for a download name, with an ASCII fallback
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == filename {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(filename)
        )
    }
}

fn attachment_response(attachment: Attachment) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&attachment.filename)),
        ],
        Body::from(attachment.data),
    )
        .into_response()
}
