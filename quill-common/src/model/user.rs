use crate::model::{Id, auth::HashedPassword};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 10;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 18;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
}

/// A stored user together with the hash their password is checked against.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: HashedPassword,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub username: Username,
    pub password_hash: HashedPassword,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidUsernameError {
    #[error("You must provide a username")]
    Missing,
    #[error("Username cannot be less than 3 characters")]
    TooShort,
    #[error("Username cannot be more than 10 characters")]
    TooLong,
    #[error("Username can only contain letters and numbers")]
    InvalidCharacters,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPasswordError {
    #[error("You must provide a password")]
    Missing,
    #[error("Password cannot be less than 8 characters")]
    TooShort,
    #[error("Password cannot be more than 18 characters")]
    TooLong,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error("Username is already taken")]
    UsernameTaken,
    #[error(transparent)]
    Password(#[from] InvalidPasswordError),
}

impl Username {
    /// Every rule the (already trimmed) username breaks, in display order.
    #[must_use]
    pub fn check(username: &str) -> Vec<InvalidUsernameError> {
        if username.is_empty() {
            return vec![InvalidUsernameError::Missing];
        }

        let mut errors = Vec::new();
        let len = username.chars().count();
        if len < USERNAME_MIN_LEN {
            errors.push(InvalidUsernameError::TooShort);
        }
        if len > USERNAME_MAX_LEN {
            errors.push(InvalidUsernameError::TooLong);
        }
        if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(InvalidUsernameError::InvalidCharacters);
        }

        errors
    }

    /// Like [`Username::new`], but reports every broken rule.
    pub fn parse(username: String) -> Result<Self, Vec<InvalidUsernameError>> {
        let errors = Self::check(&username);
        if errors.is_empty() {
            Ok(Self(username))
        } else {
            Err(errors)
        }
    }

    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        match Self::check(&username).first() {
            Some(&err) => Err(err),
            None => Ok(Self(username)),
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        if Username::check(&inner).is_empty() {
            Ok(Username(inner))
        } else {
            Err(Error::invalid_value(Unexpected::Str(&inner), &"Username"))
        }
    }
}

/// Length rules for a raw password. Passwords are never trimmed.
#[must_use]
pub fn check_password(password: &str) -> Vec<InvalidPasswordError> {
    if password.is_empty() {
        return vec![InvalidPasswordError::Missing];
    }

    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        vec![InvalidPasswordError::TooShort]
    } else if len > PASSWORD_MAX_LEN {
        vec![InvalidPasswordError::TooLong]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::{
        InvalidPasswordError, InvalidUsernameError, RegistrationError, Username, check_password,
    };

    #[test]
    fn valid_usernames() {
        for username in ["abc", "alice", "Bob42", "0123456789"] {
            assert!(Username::check(username).is_empty());
            assert_eq!(Username::new(username.to_owned()).unwrap().get(), username);
        }
    }

    #[test]
    fn invalid_usernames() {
        assert_eq!(Username::check(""), vec![InvalidUsernameError::Missing]);
        assert_eq!(Username::check("ab"), vec![InvalidUsernameError::TooShort]);
        assert_eq!(
            Username::check("abcdefghijk"),
            vec![InvalidUsernameError::TooLong]
        );
        assert_eq!(
            Username::check("al ice"),
            vec![InvalidUsernameError::InvalidCharacters]
        );
        assert_eq!(
            Username::check("a_"),
            vec![
                InvalidUsernameError::TooShort,
                InvalidUsernameError::InvalidCharacters
            ]
        );
        assert_eq!(
            Username::check("bjørn"),
            vec![InvalidUsernameError::InvalidCharacters]
        );
        assert_eq!(
            Username::new("way-too-long-name".to_owned()),
            Err(InvalidUsernameError::TooLong)
        );
        assert_eq!(
            Username::parse("way-too-long-name".to_owned()),
            Err(vec![
                InvalidUsernameError::TooLong,
                InvalidUsernameError::InvalidCharacters
            ])
        );
    }

    #[test]
    fn username_deserialization_validates() {
        let username: Username = serde_json::from_str(r#""alice""#).unwrap();
        assert_eq!(username.get(), "alice");

        assert!(serde_json::from_str::<Username>(r#""a""#).is_err());
        assert!(serde_json::from_str::<Username>(r#""<script>""#).is_err());
    }

    #[test]
    fn password_lengths() {
        assert_eq!(check_password(""), vec![InvalidPasswordError::Missing]);
        assert_eq!(check_password("1234567"), vec![InvalidPasswordError::TooShort]);
        assert!(check_password("12345678").is_empty());
        assert!(check_password("123456789012345678").is_empty());
        assert_eq!(
            check_password("1234567890123456789"),
            vec![InvalidPasswordError::TooLong]
        );
        assert!(check_password("        ").is_empty());
    }

    #[test]
    fn registration_error_messages() {
        assert_eq!(
            RegistrationError::from(InvalidUsernameError::TooShort).to_string(),
            "Username cannot be less than 3 characters"
        );
        assert_eq!(
            RegistrationError::UsernameTaken.to_string(),
            "Username is already taken"
        );
        assert_eq!(
            RegistrationError::from(InvalidPasswordError::TooLong).to_string(),
            "Password cannot be more than 18 characters"
        );
    }
}
