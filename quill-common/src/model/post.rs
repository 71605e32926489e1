use crate::{
    model::{
        Id,
        user::{User, UserMarker},
    },
    util::strip_markup,
};
use thiserror::Error;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post joined with its author.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub content: PostContent,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub content: PostContent,
    pub created_at: UtcDateTime,
}

/// Title and body of a post, stripped of markup and trimmed.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostContent {
    title: String,
    body: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub content: PostContent,
    pub created_at: UtcDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostError {
    #[error("You must provide a title.")]
    MissingTitle,
    #[error("You must provide content.")]
    MissingBody,
}

impl Post {
    #[must_use]
    pub fn is_authored_by(&self, user_id: Id<UserMarker>) -> bool {
        self.author.id == user_id
    }
}

impl PostContent {
    pub fn new(title: &str, body: &str) -> Result<Self, Vec<InvalidPostError>> {
        let title = strip_markup(title).trim().to_owned();
        let body = strip_markup(body).trim().to_owned();

        let mut errors = Vec::new();
        if title.is_empty() {
            errors.push(InvalidPostError::MissingTitle);
        }
        if body.is_empty() {
            errors.push(InvalidPostError::MissingBody);
        }

        if errors.is_empty() {
            Ok(Self { title, body })
        } else {
            Err(errors)
        }
    }

    /// Wraps content that was validated before it was stored.
    #[must_use]
    pub fn from_stored(title: String, body: String) -> Self {
        Self { title, body }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        post::{InvalidPostError, Post, PostContent},
        user::{User, Username},
    };
    use time::macros::utc_datetime;

    #[test]
    fn content_is_trimmed() {
        let content = PostContent::new("  Hi ", "\nWorld\n\n").unwrap();

        assert_eq!(content.title(), "Hi");
        assert_eq!(content.body(), "World");
    }

    #[test]
    fn content_is_stripped_of_markup() {
        let content = PostContent::new("<h1>Hi</h1>", "**bold** <script>x</script>").unwrap();

        assert_eq!(content.title(), "Hi");
        assert_eq!(content.body(), "**bold** x");
    }

    #[test]
    fn missing_fields() {
        assert_eq!(
            PostContent::new("", "   "),
            Err(vec![
                InvalidPostError::MissingTitle,
                InvalidPostError::MissingBody
            ])
        );
        assert_eq!(
            PostContent::new("<b></b>", "body"),
            Err(vec![InvalidPostError::MissingTitle])
        );
        assert_eq!(
            PostContent::new("title", "<p> </p>"),
            Err(vec![InvalidPostError::MissingBody])
        );
    }

    #[test]
    fn authorship() {
        let post = Post {
            id: Id::new(1),
            author: User {
                id: Id::new(7),
                username: Username::new("alice".to_owned()).unwrap(),
            },
            content: PostContent::new("Hi", "World").unwrap(),
            created_at: utc_datetime!(2025-10-24 10:00),
        };

        assert!(post.is_authored_by(Id::new(7)));
        assert!(!post.is_authored_by(Id::new(8)));
    }
}
