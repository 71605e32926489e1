use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, Session},
    form::Form,
    views,
};
use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use quill_common::model::{
    Id,
    post::{CreatePost, Post, PostContent, PostMarker},
};
use quill_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use time::UtcDateTime;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(home)
        .typed_get(create_post_page)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_get(edit_post_page)
        .typed_post(edit_post)
        .typed_post(delete_post)
        .typed_get(no_post)
}

#[derive(TypedPath)]
#[typed_path("/")]
pub(crate) struct HomePath;

#[derive(TypedPath)]
#[typed_path("/create-post")]
pub(crate) struct CreatePostPath;

#[derive(TypedPath, Deserialize)]
#[typed_path("/post/{id}", rejection(ServerError))]
pub(crate) struct PostPath {
    pub id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/edit-post/{id}", rejection(ServerError))]
pub(crate) struct EditPostPath {
    pub id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/delete-post/{id}", rejection(ServerError))]
pub(crate) struct DeletePostPath {
    pub id: Id<PostMarker>,
}

#[derive(TypedPath)]
#[typed_path("/no-post")]
pub(crate) struct NoPostPath;

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
#[serde(default)]
struct PostForm {
    title: String,
    body: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
enum PostAccessDenied {
    Missing,
    NotAuthor,
}

impl IntoResponse for PostAccessDenied {
    fn into_response(self) -> Response {
        match self {
            PostAccessDenied::Missing => Redirect::to(&NoPostPath.to_string()),
            PostAccessDenied::NotAuthor => Redirect::to(&HomePath.to_string()),
        }
        .into_response()
    }
}

async fn fetch_owned_post(
    db: &DbClient,
    post_id: Id<PostMarker>,
    user: &AuthenticatedUser,
) -> Result<Result<Post, PostAccessDenied>> {
    let Some(post) = db.fetch_post(post_id).await? else {
        debug!(%post_id, "Post to change does not exist");
        return Ok(Err(PostAccessDenied::Missing));
    };

    if !post.is_authored_by(user.user_id()) {
        debug!(%post_id, user_id = %user.user_id(), "User is not the author of the post");
        return Ok(Err(PostAccessDenied::NotAuthor));
    }

    Ok(Ok(post))
}

async fn home(
    _: HomePath,
    State(db): State<Arc<DbClient>>,
    session: Session,
) -> Result<Html<String>> {
    match session.user() {
        Some(user) => {
            let posts = db.fetch_user_posts(user.id).await?;
            Ok(views::dashboard(user, &posts))
        }
        None => Ok(views::landing(None, "", &[])),
    }
}

async fn create_post_page(_: CreatePostPath, user: AuthenticatedUser) -> Html<String> {
    views::post_form(user.user(), None, "", "", &[])
}

async fn create_post(
    _: CreatePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    let content = match PostContent::new(&form.title, &form.body) {
        Ok(content) => content,
        Err(errors) => {
            let errors = views::messages(errors);
            let page = views::post_form(user.user(), None, &form.title, &form.body, &errors);
            return Ok(page.into_response());
        }
    };

    let post_id = db
        .create_post(&CreatePost {
            author: user.user_id(),
            content,
            created_at: UtcDateTime::now(),
        })
        .await?;

    info!(%post_id, user_id = %user.user_id(), "Created post");
    Ok(Redirect::to(&PostPath { id: post_id }.to_string()).into_response())
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    session: Session,
) -> Result<Response> {
    let Some(post) = db.fetch_post(id).await? else {
        return Ok(Redirect::to(&HomePath.to_string()).into_response());
    };

    let is_author = session
        .user()
        .is_some_and(|user| post.is_authored_by(user.id));

    Ok(views::single_post(session.user(), &post, is_author).into_response())
}

async fn edit_post_page(
    EditPostPath { id }: EditPostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let post = match fetch_owned_post(&db, id, &user).await? {
        Ok(post) => post,
        Err(denied) => return Ok(denied.into_response()),
    };

    let page = views::post_form(
        user.user(),
        Some(id),
        post.content.title(),
        post.content.body(),
        &[],
    );
    Ok(page.into_response())
}

async fn edit_post(
    EditPostPath { id }: EditPostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    if let Err(denied) = fetch_owned_post(&db, id, &user).await? {
        return Ok(denied.into_response());
    }

    let content = match PostContent::new(&form.title, &form.body) {
        Ok(content) => content,
        Err(errors) => {
            let errors = views::messages(errors);
            let page = views::post_form(user.user(), Some(id), &form.title, &form.body, &errors);
            return Ok(page.into_response());
        }
    };

    if !db.update_post(id, &content).await? {
        return Ok(PostAccessDenied::Missing.into_response());
    }

    info!(post_id = %id, user_id = %user.user_id(), "Updated post");
    Ok(Redirect::to(&PostPath { id }.to_string()).into_response())
}

async fn delete_post(
    DeletePostPath { id }: DeletePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    if let Err(denied) = fetch_owned_post(&db, id, &user).await? {
        return Ok(denied.into_response());
    }

    db.delete_post(id).await?;

    info!(post_id = %id, user_id = %user.user_id(), "Deleted post");
    Ok(Redirect::to(&HomePath.to_string()).into_response())
}

async fn no_post(_: NoPostPath, session: Session) -> Html<String> {
    views::no_post(session.user())
}
