use crate::server::ServerRouter;
use axum::Router;

pub(crate) mod posts;
pub(crate) mod users;

pub fn routes() -> ServerRouter {
    Router::new().merge(posts::routes()).merge(users::routes())
}
