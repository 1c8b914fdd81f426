//! Session cookie
//!
//! The only thing the console keeps per browser is a random session id
//! that keys the notice mailbox. A request without a valid cookie gets a
//! fresh id, and the response carries the `Set-Cookie` for it.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::Response,
};

use crate::notice::SessionId;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "s3console_session";

/// Session of the current request
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub id: SessionId,
    /// The browser did not send a usable cookie
    pub fresh: bool,
}

impl Session {
    /// Add `Set-Cookie` when the session was created by this request
    pub fn attach(&self, mut response: Response) -> Response {
        if self.fresh {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, self.id
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

/// Find the session id among the request's cookies
fn session_from_headers(parts: &Parts) -> Option<SessionId> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match session_from_headers(parts) {
            Some(id) => Session { id, fresh: false },
            None => Session {
                id: SessionId::generate(),
                fresh: true,
            },
        })
    }
}
