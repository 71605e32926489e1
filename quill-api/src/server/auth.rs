use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use quill_common::model::{
    Id,
    auth::{IssueSessionTokenError, SESSION_LIFETIME, SessionCodec, SessionUser},
    user::{User, UserMarker},
};
use std::{convert::Infallible, sync::Arc};
use tracing::debug;

pub const SESSION_COOKIE_NAME: &str = "quill_session";

/// Who is making the request, as established by [`resolve_session`].
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub enum Session {
    #[default]
    Anonymous,
    User(SessionUser),
}

/// A request whose session belongs to a user. Anonymous requests are redirected home.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser(SessionUser);

impl Session {
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Session::Anonymous => None,
            Session::User(user) => Some(user),
        }
    }

    fn from_parts(parts: &Parts) -> Self {
        parts.extensions.get::<Session>().cloned().unwrap_or_default()
    }
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.0.id
    }

    #[must_use]
    pub fn user(&self) -> &SessionUser {
        &self.0
    }
}

/// Runs before routing. Any cookie that fails verification counts as no cookie.
pub async fn resolve_session(
    State(session_codec): State<Arc<SessionCodec>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|cookie| session_codec.verify(cookie.value()).ok())
        .map_or(Session::Anonymous, Session::User);

    debug!(?session, "Resolved request session");
    request.extensions_mut().insert(session);

    next.run(request).await
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match Session::from_parts(parts) {
            Session::User(user) => Ok(Self(user)),
            Session::Anonymous => {
                debug!(uri = %parts.uri, "Redirecting anonymous request home");
                Err(Redirect::to("/"))
            }
        }
    }
}

pub fn start_session(
    jar: CookieJar,
    session_codec: &SessionCodec,
    user: User,
) -> Result<CookieJar, IssueSessionTokenError> {
    let token = session_codec.issue(&SessionUser {
        id: user.id,
        username: user.username,
    })?;

    let cookie = Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(SESSION_LIFETIME);

    Ok(jar.add(cookie))
}

/// Only the cookie goes away; a copy of the token stays valid until it expires.
#[must_use]
pub fn end_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/"))
}
