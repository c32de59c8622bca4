use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use super::session::{SessionData, Sessions};
use crate::constants::SESSION_COOKIE;
use crate::Uid;

/// The caller's session, loaded from the `session` cookie.
///
/// Requests without a cookie, or with a token no session was issued for, get
/// an empty guest session and no token; nothing is persisted for them.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: Option<String>,
    pub data: SessionData,
}

impl CurrentSession {
    /// The caller's uid, `0` for guests.
    #[must_use]
    pub const fn uid(&self) -> Uid {
        self.data.uid
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    Sessions: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Sessions::from_ref(state);

        let Some(token) = session_token(parts) else {
            return Ok(Self {
                token: None,
                data: SessionData::default(),
            });
        };

        match sessions.load(&token).await {
            Ok(Some(data)) => Ok(Self {
                token: Some(token),
                data,
            }),
            Ok(None) => Ok(Self {
                token: None,
                data: SessionData::default(),
            }),
            Err(e) => {
                tracing::error!("Failed to load session: {e:#}");
                Err((StatusCode::INTERNAL_SERVER_ERROR, "Session error").into_response())
            }
        }
    }
}

/// Session token from the `Cookie` header, if any.
pub fn session_token(parts: &Parts) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE}=");
    parts
        .headers
        .get("cookie")
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|cookie| cookie.trim().strip_prefix(prefix.as_str()).map(String::from))
        })
        .filter(|token| !token.is_empty())
}

