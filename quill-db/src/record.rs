use quill_common::{
    model::{
        ModelValidationError,
        auth::HashedPassword,
        post::{PartialPost, Post, PostContent},
        user::{User, UserCredentials, Username},
    },
    util::parse_timestamp,
};
use sqlx::FromRow;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserCredentialsRecord {
    pub id: i64,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub id: i64,
    pub created_date: String,
    pub title: String,
    pub body: String,
    pub author_id: i64,
    pub username: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PartialPostRecord {
    pub id: i64,
    pub created_date: String,
    pub title: String,
    pub body: String,
    pub author_id: i64,
}

impl TryFrom<UserCredentialsRecord> for UserCredentials {
    type Error = ModelValidationError;

    fn try_from(value: UserCredentialsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: User {
                id: value.id.into(),
                username: Username::new(value.username)?,
            },
            password_hash: HashedPassword::from_phc_string(value.password),
        })
    }
}

impl TryFrom<PartialPostRecord> for PartialPost {
    type Error = ModelValidationError;

    fn try_from(value: PartialPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            author_id: value.author_id.into(),
            content: PostContent::from_stored(value.title, value.body),
            created_at: parse_timestamp(&value.created_date)?,
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            author: User {
                id: value.author_id.into(),
                username: Username::new(value.username)?,
            },
            content: PostContent::from_stored(value.title, value.body),
            created_at: parse_timestamp(&value.created_date)?,
        })
    }
}
