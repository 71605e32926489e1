use crate::server::routes::{
    posts::{CreatePostPath, DeletePostPath, EditPostPath, HomePath, PostPath},
    users::{LoginPath, LogoutPath, RegisterPath},
};
use axum::{http::StatusCode, response::Html};
use quill_common::model::{
    Id,
    auth::SessionUser,
    post::{PartialPost, Post, PostMarker},
};
use std::fmt::Display;

const STYLE: &str = "
body { font-family: system-ui, sans-serif; max-width: 42rem; margin: 0 auto; padding: 1rem; }
header { display: flex; justify-content: space-between; align-items: center; gap: 1rem; }
nav { display: flex; gap: 1rem; align-items: center; }
.errors { color: #a4161a; }
.post-body { white-space: pre-wrap; }
.post-meta { color: #666; font-size: 0.9rem; }
form.inline { display: inline; }
label { display: block; margin-top: 0.75rem; }
input, textarea { width: 100%; box-sizing: border-box; }
";

pub fn messages<E: Display>(errors: impl IntoIterator<Item = E>) -> Vec<String> {
    errors.into_iter().map(|err| err.to_string()).collect()
}

#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let items: String = errors
        .iter()
        .map(|error| format!("<li>{}</li>", escape(error)))
        .collect();
    format!(r#"<ul class="errors">{items}</ul>"#)
}

fn page(viewer: Option<&SessionUser>, title: &str, content: &str) -> Html<String> {
    let navigation = match viewer {
        Some(user) => format!(
            r#"<a href="{create}">Create post</a>
      <span>Logged in as <strong>{username}</strong></span>
      <a href="{logout}">Log out</a>"#,
            create = CreatePostPath,
            username = escape(user.username.get()),
            logout = LogoutPath,
        ),
        None => format!(r#"<a href="{login}">Log in</a>"#, login = LoginPath),
    };

    layout(&navigation, title, content)
}

fn layout(navigation: &str, title: &str, content: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title} | Quill</title>
<style>{STYLE}</style>
</head><body>
<header>
  <h1><a href="{home}">Quill</a></h1>
  <nav>
      {navigation}
  </nav>
</header>
<main>
{content}
</main>
</body></html>"#,
        title = escape(title),
        home = HomePath,
    ))
}

#[must_use]
pub fn landing(viewer: Option<&SessionUser>, username: &str, errors: &[String]) -> Html<String> {
    let content = format!(
        r#"<h2>Write things down.</h2>
<p>Quill is a tiny place for your posts. Create an account to get started.</p>
{errors}
<form method="POST" action="{register}">
  <label>Username <input type="text" name="username" value="{username}" autocomplete="username"></label>
  <label>Password <input type="password" name="password" autocomplete="new-password"></label>
  <button type="submit">Create account</button>
</form>"#,
        errors = error_list(errors),
        register = RegisterPath,
        username = escape(username),
    );

    page(viewer, "Welcome", &content)
}

#[must_use]
pub fn login(viewer: Option<&SessionUser>, errors: &[String]) -> Html<String> {
    let content = format!(
        r#"<h2>Log in</h2>
{errors}
<form method="POST" action="{login}">
  <label>Username <input type="text" name="username" autocomplete="username"></label>
  <label>Password <input type="password" name="password" autocomplete="current-password"></label>
  <button type="submit">Log in</button>
</form>"#,
        errors = error_list(errors),
        login = LoginPath,
    );

    page(viewer, "Log in", &content)
}

#[must_use]
pub fn dashboard(user: &SessionUser, posts: &[PartialPost]) -> Html<String> {
    let mut content = format!(
        "<h2>Hello <strong>{}</strong>, your posts:</h2>\n",
        escape(user.username.get())
    );

    if posts.is_empty() {
        content.push_str(&format!(
            r#"<p class="empty">You have not written any posts yet. <a href="{CreatePostPath}">Write one</a>.</p>"#
        ));
    } else {
        let items: String = posts
            .iter()
            .map(|post| {
                format!(
                    "<li><a href=\"{path}\">{title}</a> <span class=\"post-meta\">{date}</span></li>\n",
                    path = PostPath { id: post.id },
                    title = escape(post.content.title()),
                    date = post.created_at.date(),
                )
            })
            .collect();
        content.push_str(&format!("<ul class=\"posts\">\n{items}</ul>"));
    }

    page(Some(user), "Dashboard", &content)
}

/// `post_id` is `None` when creating.
#[must_use]
pub fn post_form(
    user: &SessionUser,
    post_id: Option<Id<PostMarker>>,
    title: &str,
    body: &str,
    errors: &[String],
) -> Html<String> {
    let (heading, action, submit) = match post_id {
        Some(id) => ("Edit post", EditPostPath { id }.to_string(), "Save changes"),
        None => ("Create post", CreatePostPath.to_string(), "Publish"),
    };
    let back = post_id
        .map(|id| format!(r#"<p><a href="{}">&laquo; Back to post</a></p>"#, PostPath { id }))
        .unwrap_or_default();

    let content = format!(
        r#"{back}<h2>{heading}</h2>
{errors}
<form method="POST" action="{action}">
  <label>Title <input type="text" name="title" value="{title}"></label>
  <label>Content <textarea name="body" rows="12">{body}</textarea></label>
  <button type="submit">{submit}</button>
</form>"#,
        errors = error_list(errors),
        title = escape(title),
        body = escape(body),
    );

    page(Some(user), heading, &content)
}

#[must_use]
pub fn single_post(viewer: Option<&SessionUser>, post: &Post, is_author: bool) -> Html<String> {
    let controls = if is_author {
        format!(
            r#"<p class="controls"><a href="{edit}">Edit</a>
<form class="inline" method="POST" action="{delete}"><button type="submit">Delete</button></form></p>"#,
            edit = EditPostPath { id: post.id },
            delete = DeletePostPath { id: post.id },
        )
    } else {
        String::new()
    };

    let content = format!(
        r#"<article>
<h2>{title}</h2>
<p class="post-meta">Posted by <strong>{author}</strong> on {date}</p>
{controls}
<div class="post-body">{body}</div>
</article>"#,
        title = escape(post.content.title()),
        author = escape(post.author.username.get()),
        date = post.created_at.date(),
        body = escape(post.content.body()),
    );

    page(viewer, post.content.title(), &content)
}

#[must_use]
pub fn no_post(viewer: Option<&SessionUser>) -> Html<String> {
    let content = format!(
        r#"<h2>No such post</h2>
<p>The post you are looking for does not exist. <a href="{HomePath}">Go home</a>.</p>"#
    );

    page(viewer, "No such post", &content)
}

#[must_use]
pub fn error_page(status: StatusCode) -> Html<String> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let content = format!(
        r#"<h2>{code} {reason}</h2>
<p>Something went wrong. <a href="{HomePath}">Go home</a>.</p>"#,
        code = status.as_u16(),
    );

    layout("", reason, &content)
}
