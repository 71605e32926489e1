use crate::model::{
    Id,
    user::{UserMarker, Username},
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const PASSWORD_SALT_LEN: usize = 16;
pub const SESSION_LIFETIME: Duration = Duration::hours(24);

const SKY_COLOR: &str = "blue";

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

#[derive(Debug, Error)]
#[error("Signing the session token failed: {0}")]
pub struct IssueSessionTokenError(jsonwebtoken::errors::Error);

/// Returned for every token that must not be trusted, whatever the reason.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The session token is invalid")]
pub struct InvalidSessionToken;

/// An argon2 hash in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct HashedPassword(String);

#[derive(Clone, Eq, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SessionSecret(String);

/// The identity a valid session token vouches for.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct SessionUser {
    pub id: Id<UserMarker>,
    pub username: Username,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionClaims {
    exp: i64,
    sky_color: String,
    user_id: Id<UserMarker>,
    user_name: Username,
}

/// Signs and verifies the HS256 tokens held in the session cookie.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl HashedPassword {
    pub fn generate(password: &str) -> Result<Self, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// `Ok(false)` means the password is wrong; errors mean the stored hash is unusable.
    pub fn verify(&self, password: &str) -> Result<bool, PasswordHashError> {
        let hash = PasswordHash::new(&self.0).map_err(PasswordHashError)?;

        match Argon2::default().verify_password(password.as_bytes(), &hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHashError(err)),
        }
    }

    #[must_use]
    pub fn from_phc_string(hash: String) -> Self {
        Self(hash)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SessionSecret {
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self(secret)
    }
}

impl SessionCodec {
    #[must_use]
    pub fn new(secret: &SessionSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.0.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.0.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user: &SessionUser) -> Result<String, IssueSessionTokenError> {
        self.issue_at(user, UtcDateTime::now())
    }

    pub fn issue_at(
        &self,
        user: &SessionUser,
        issued_at: UtcDateTime,
    ) -> Result<String, IssueSessionTokenError> {
        let claims = SessionClaims {
            exp: (issued_at + SESSION_LIFETIME).unix_timestamp(),
            sky_color: SKY_COLOR.to_owned(),
            user_id: user.id,
            user_name: user.username.clone(),
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(IssueSessionTokenError)
    }

    pub fn verify(&self, token: &str) -> Result<SessionUser, InvalidSessionToken> {
        let token_data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
                .map_err(|_| InvalidSessionToken)?;

        Ok(SessionUser {
            id: token_data.claims.user_id,
            username: token_data.claims.user_name,
        })
    }
}

impl Debug for HashedPassword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HashedPassword").field(&"[redacted]").finish()
    }
}

impl Debug for SessionSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionSecret").field(&"[redacted]").finish()
    }
}

impl Debug for SessionCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}
