use crate::server::{
    Result, ServerRouter,
    auth::{Session, end_session, start_session},
    form::Form,
    routes::posts::HomePath,
    views,
};
use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::{
    extract::cookie::CookieJar,
    routing::{RouterExt, TypedPath},
};
use quill_common::model::{
    auth::{HashedPassword, SessionCodec},
    user::{CreateUser, RegistrationError, User, Username, check_password},
};
use quill_db::client::{DbClient, DbError};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// The only thing a failed login ever reports, so usernames cannot be probed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Invalid username/password")]
pub struct InvalidCredentialsError;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(login_page)
        .typed_post(login)
        .typed_get(logout)
        .typed_post(register)
}

#[derive(TypedPath)]
#[typed_path("/login")]
pub(crate) struct LoginPath;

#[derive(TypedPath)]
#[typed_path("/logout")]
pub(crate) struct LogoutPath;

#[derive(TypedPath)]
#[typed_path("/register")]
pub(crate) struct RegisterPath;

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
#[serde(default)]
struct CredentialsForm {
    username: String,
    password: String,
}

async fn login_page(_: LoginPath, session: Session) -> Html<String> {
    views::login(session.user(), &[])
}

async fn login(
    _: LoginPath,
    State(db): State<Arc<DbClient>>,
    State(session_codec): State<Arc<SessionCodec>>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response> {
    let credentials = if form.username.trim().is_empty() || form.password.is_empty() {
        None
    } else {
        db.fetch_credentials(&form.username).await?
    };

    let user = match credentials {
        Some(credentials) if credentials.password_hash.verify(&form.password)? => {
            credentials.user
        }
        _ => {
            debug!("Rejected login attempt");
            let errors = views::messages([InvalidCredentialsError]);
            return Ok(views::login(session.user(), &errors).into_response());
        }
    };

    info!(user_id = %user.id, username = %user.username, "User logged in");
    let jar = start_session(jar, &session_codec, user)?;

    Ok((jar, Redirect::to(&HomePath.to_string())).into_response())
}

async fn logout(_: LogoutPath, jar: CookieJar) -> (CookieJar, Redirect) {
    (end_session(jar), Redirect::to(&HomePath.to_string()))
}

async fn register(
    _: RegisterPath,
    State(db): State<Arc<DbClient>>,
    State(session_codec): State<Arc<SessionCodec>>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response> {
    let requested_username = form.username.trim();
    let mut errors = Vec::new();

    let username = match Username::parse(requested_username.to_owned()) {
        Ok(username) => {
            if db.username_exists(username.get()).await? {
                errors.push(RegistrationError::UsernameTaken);
            }
            Some(username)
        }
        Err(username_errors) => {
            errors.extend(username_errors.into_iter().map(RegistrationError::from));
            None
        }
    };
    errors.extend(
        check_password(&form.password)
            .into_iter()
            .map(RegistrationError::from),
    );

    let Some(username) = username.filter(|_| errors.is_empty()) else {
        debug!(?errors, "Rejected registration");
        return Ok(registration_failed(&session, requested_username, &errors));
    };

    let password_hash = HashedPassword::generate(&form.password)?;
    let create_user = CreateUser {
        username,
        password_hash,
    };
    let user_id = match db.create_user(&create_user).await {
        Ok(user_id) => user_id,
        Err(DbError::UsernameTaken) => {
            let errors = [RegistrationError::UsernameTaken];
            return Ok(registration_failed(&session, requested_username, &errors));
        }
        Err(err) => return Err(err.into()),
    };

    info!(%user_id, username = %create_user.username, "Registered user");
    let user = User {
        id: user_id,
        username: create_user.username,
    };
    let jar = start_session(jar, &session_codec, user)?;

    Ok((jar, Redirect::to(&HomePath.to_string())).into_response())
}

fn registration_failed(
    session: &Session,
    username: &str,
    errors: &[RegistrationError],
) -> Response {
    views::landing(session.user(), username, &views::messages(errors)).into_response()
}
