//! Notice Mailbox
//!
//! Status messages produced by a handler are posted under the browser's
//! session id and handed to exactly one later page render. Taking the
//! notices removes them, so a notice is never shown twice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

/// Identifies one browser session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Fresh random session id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a session id from its cookie value
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notices older than this are dropped unread
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(600);

/// Most sessions that may hold notices at once
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct Pending {
    posted: Instant,
    /// Post order, breaks ties between equal instants
    seq: u64,
    notices: Vec<String>,
}

/// Single-use mailbox of pending notices, keyed by session.
///
/// Clients that never send the session cookie back leave their notices
/// behind, so entries expire after a TTL and the number of sessions is
/// capped, oldest evicted first.
pub struct NoticeBox {
    pending: Mutex<HashMap<SessionId, Pending>>,
    next_seq: AtomicU64,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for NoticeBox {
    fn default() -> Self {
        Self::with_limits(DEFAULT_NOTICE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl NoticeBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailbox with a custom TTL and session cap
    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Queue a notice for the session's next render
    pub async fn post(&self, session: SessionId, notice: impl Into<String>) {
        let mut pending = self.pending.lock().await;
        let now = Instant::now();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        pending.retain(|_, p| now.duration_since(p.posted) <= self.ttl);

        if !pending.contains_key(&session) && pending.len() >= self.max_sessions {
            let oldest = pending
                .iter()
                .min_by_key(|(_, p)| (p.posted, p.seq))
                .map(|(id, _)| *id);
            if let Some(id) = oldest {
                tracing::debug!("Notice mailbox full, dropping notices of session {}", id);
                pending.remove(&id);
            }
        }

        let entry = pending.entry(session).or_insert_with(|| Pending {
            posted: now,
            seq,
            notices: Vec::new(),
        });
        entry.posted = now;
        entry.seq = seq;
        entry.notices.push(notice.into());
    }

    /// Remove and return everything pending for the session
    pub async fn take(&self, session: SessionId) -> Vec<String> {
        match self.pending.lock().await.remove(&session) {
            Some(p) if p.posted.elapsed() <= self.ttl => p.notices,
            _ => Vec::new(),
        }
    }

    /// Number of sessions with notices waiting
    pub async fn sessions_waiting(&self) -> usize {
        self.pending.lock().await.len()
    }
}
