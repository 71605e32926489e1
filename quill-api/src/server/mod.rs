use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{FormRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
};
use quill_common::model::auth::{IssueSessionTokenError, PasswordHashError, SessionCodec};
use quill_db::client::{DbClient, DbError};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod form;
mod routes;
mod views;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub session_codec: Arc<SessionCodec>,
}

/// The complete application: every route behind the session middleware.
pub fn app(state: ServerState) -> Router {
    routes::routes()
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_session,
        ))
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming form rejected: {0}")]
    FormRejection(#[from] FormRejection),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error(transparent)]
    SessionToken(#[from] IssueSessionTokenError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => StatusCode::NOT_FOUND,
            ServerError::FormRejection(rejection) => rejection.status(),
            ServerError::Database(_)
            | ServerError::PasswordHash(_)
            | ServerError::SessionToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        (status, views::error_page(status)).into_response()
    }
}
