use crate::record::{FullPostRecord, PartialPostRecord, UserCredentialsRecord};
use quill_common::{
    model::{
        Id, ModelValidationError,
        post::{CreatePost, PartialPost, Post, PostContent, PostMarker},
        user::{CreateUser, UserCredentials, UserMarker},
    },
    util::format_timestamp,
};
use sqlx::{
    SqlitePool, query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("The username is already taken")]
    UsernameTaken,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    /// Opens (creating if needed) the database in WAL mode and makes sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        info!(database_url, "Connected to database");
        Self::with_schema(pool).await
    }

    /// A private database that lives as long as the client. Used for tests and throwaway servers.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // Every in-memory connection is its own database, so there must be exactly one.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_schema(pool).await
    }

    async fn with_schema(pool: SqlitePool) -> Result<Self> {
        let client = Self { pool };
        client.create_schema().await?;
        Ok(client)
    }

    pub async fn create_schema(&self) -> Result<()> {
        let mut transaction = self.pool.begin().await?;

        query(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
            )
            ",
        )
        .execute(&mut *transaction)
        .await?;

        query(
            "
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_date TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users (id)
            )
            ",
        )
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;
        debug!("Database schema is in place");

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Looks the user up by exact, case-sensitive username.
    pub async fn fetch_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        let record = query_as::<_, UserCredentialsRecord>(
            "
            SELECT
                users.id,
                users.username,
                users.password
            FROM
                users
            WHERE
                users.username = ?
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(UserCredentials::try_from).transpose()?;
        Ok(credentials)
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE users.username = ?)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let user_id = query_scalar::<_, i64>(
            "
            INSERT INTO users (username, password)
            VALUES (?, ?)
            RETURNING id
            ",
        )
        .bind(user.username.get())
        .bind(user.password_hash.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                DbError::UsernameTaken
            }
            err => DbError::Sqlx(err),
        })?;

        Ok(user_id.into())
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.id,
                posts.created_date,
                posts.title,
                posts.body,
                posts.author_id,
                users.username
            FROM
                posts INNER JOIN users ON users.id = posts.author_id
            WHERE
                posts.id = ?
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// Newest first.
    pub async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<PartialPost>> {
        let records = query_as::<_, PartialPostRecord>(
            "
            SELECT
                posts.id,
                posts.created_date,
                posts.title,
                posts.body,
                posts.author_id
            FROM
                posts
            WHERE
                posts.author_id = ?
            ORDER BY
                posts.created_date DESC,
                posts.id DESC
            ",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(PartialPost::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let post_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts (created_date, title, body, author_id)
            VALUES (?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(format_timestamp(post.created_at))
        .bind(post.content.title())
        .bind(post.content.body())
        .bind(post.author.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(post_id.into())
    }

    /// Replaces title and body. Returns whether the post existed.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE posts
            SET title = ?, body = ?
            WHERE posts.id = ?
            ",
        )
        .bind(content.title())
        .bind(content.body())
        .bind(post_id.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Returns whether the post existed.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts WHERE posts.id = ?")
            .bind(post_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{DbClient, DbError};
    use quill_common::model::{
        Id,
        auth::HashedPassword,
        post::{CreatePost, PostContent},
        user::{CreateUser, UserMarker, Username},
    };
    use time::{Duration, macros::utc_datetime};

    async fn client() -> DbClient {
        DbClient::connect_in_memory().await.unwrap()
    }

    async fn create_user(db: &DbClient, username: &str) -> Id<UserMarker> {
        db.create_user(&CreateUser {
            username: Username::new(username.to_owned()).unwrap(),
            password_hash: HashedPassword::from_phc_string(format!("hash-of-{username}")),
        })
        .await
        .unwrap()
    }

    fn content(title: &str, body: &str) -> PostContent {
        PostContent::new(title, body).unwrap()
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let db = client().await;
        let alice = create_user(&db, "alice").await;

        db.create_schema().await.unwrap();

        let credentials = db.fetch_credentials("alice").await.unwrap().unwrap();
        assert_eq!(credentials.user.id, alice);
    }

    #[tokio::test]
    async fn users() {
        let db = client().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        assert_ne!(alice, bob);

        let credentials = db.fetch_credentials("alice").await.unwrap().unwrap();
        assert_eq!(credentials.user.id, alice);
        assert_eq!(credentials.user.username.get(), "alice");
        assert_eq!(credentials.password_hash.as_str(), "hash-of-alice");

        assert!(db.username_exists("bob").await.unwrap());
        assert!(!db.username_exists("carol").await.unwrap());
    }

    #[tokio::test]
    async fn usernames_match_exactly() {
        let db = client().await;
        create_user(&db, "alice").await;

        assert!(db.fetch_credentials("Alice").await.unwrap().is_none());
        assert!(db.fetch_credentials("alice ").await.unwrap().is_none());
        assert!(!db.username_exists("ALICE").await.unwrap());

        create_user(&db, "Alice").await;
        assert!(db.username_exists("Alice").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_username() {
        let db = client().await;
        create_user(&db, "alice").await;

        let result = db
            .create_user(&CreateUser {
                username: Username::new("alice".to_owned()).unwrap(),
                password_hash: HashedPassword::from_phc_string("other".to_owned()),
            })
            .await;

        assert!(matches!(result, Err(DbError::UsernameTaken)));
        let credentials = db.fetch_credentials("alice").await.unwrap().unwrap();
        assert_eq!(credentials.password_hash.as_str(), "hash-of-alice");
    }

    #[tokio::test]
    async fn post_round_trip() {
        let db = client().await;
        let alice = create_user(&db, "alice").await;
        let created_at = utc_datetime!(2025-10-24 10:30:05.123);

        let post_id = db
            .create_post(&CreatePost {
                author: alice,
                content: content("Hi", "World"),
                created_at,
            })
            .await
            .unwrap();

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.id, post_id);
        assert_eq!(post.author.id, alice);
        assert_eq!(post.author.username.get(), "alice");
        assert_eq!(post.content, content("Hi", "World"));
        assert_eq!(post.created_at, created_at);

        assert!(db.fetch_post(Id::new(post_id.get() + 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn post_requires_existing_author() {
        let db = client().await;

        let result = db
            .create_post(&CreatePost {
                author: Id::new(404),
                content: content("Hi", "World"),
                created_at: utc_datetime!(2025-10-24 10:30),
            })
            .await;

        assert!(matches!(result, Err(DbError::Sqlx(_))));
    }

    #[tokio::test]
    async fn user_posts_are_newest_first() {
        let db = client().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let start = utc_datetime!(2025-10-24 10:30);

        let mut alice_posts = Vec::new();
        for (minutes, title) in [(5, "second"), (0, "first"), (10, "third")] {
            let id = db
                .create_post(&CreatePost {
                    author: alice,
                    content: content(title, "body"),
                    created_at: start + Duration::minutes(minutes),
                })
                .await
                .unwrap();
            alice_posts.push(id);
        }
        db.create_post(&CreatePost {
            author: bob,
            content: content("bob's", "body"),
            created_at: start,
        })
        .await
        .unwrap();

        let titles = db
            .fetch_user_posts(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|post| post.content.title().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(titles, ["third", "second", "first"]);

        let bob_posts = db.fetch_user_posts(bob).await.unwrap();
        assert_eq!(bob_posts.len(), 1);
        assert_eq!(bob_posts[0].author_id, bob);

        let carol_posts = db.fetch_user_posts(Id::new(404)).await.unwrap();
        assert!(carol_posts.is_empty());
    }

    #[tokio::test]
    async fn update_keeps_creation_time() {
        let db = client().await;
        let alice = create_user(&db, "alice").await;
        let created_at = utc_datetime!(2025-10-24 10:30);
        let post_id = db
            .create_post(&CreatePost {
                author: alice,
                content: content("Hi", "World"),
                created_at,
            })
            .await
            .unwrap();

        assert!(db.update_post(post_id, &content("Hello", "Everyone")).await.unwrap());

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.content, content("Hello", "Everyone"));
        assert_eq!(post.created_at, created_at);

        assert!(!db.update_post(Id::new(404), &content("a", "b")).await.unwrap());
    }

    #[tokio::test]
    async fn delete_only_touches_one_post() {
        let db = client().await;
        let alice = create_user(&db, "alice").await;
        let mut ids = Vec::new();
        for title in ["one", "two"] {
            ids.push(
                db.create_post(&CreatePost {
                    author: alice,
                    content: content(title, "body"),
                    created_at: utc_datetime!(2025-10-24 10:30),
                })
                .await
                .unwrap(),
            );
        }

        assert!(db.delete_post(ids[0]).await.unwrap());
        assert!(!db.delete_post(ids[0]).await.unwrap());
        assert!(!db.delete_post(Id::new(404)).await.unwrap());

        assert!(db.fetch_post(ids[0]).await.unwrap().is_none());
        assert!(db.fetch_post(ids[1]).await.unwrap().is_some());
    }
}
