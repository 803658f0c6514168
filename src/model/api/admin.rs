use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::db::admin::NewAdmin;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

// Never print the plaintext password.
impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = Error;

    /// Convert [`AdminCredentials`] to a new [`Admin`] by hashing the password.
    ///
    /// Fails with [`Error::BadRequest`] if the username is empty or the password
    /// is shorter than [`MIN_PASSWORD_LENGTH`], and with [`Error::Argon2`] if
    /// hashing itself fails.
    ///
    /// [`Admin`]: crate::model::db::admin::Admin
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::BadRequest(format!(
                "Admin needs a username and a password of at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            username: cred.username,
            password_hash,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_salted_and_verifiable() {
        let first = NewAdmin::try_from(AdminCredentials::example()).unwrap();
        let second = NewAdmin::try_from(AdminCredentials::example()).unwrap();
        assert_ne!(first.password_hash, second.password_hash);
        assert!(!first.password_hash.contains("coordinator"));
        assert!(first.verify_password("coordinator").unwrap());
        assert!(!first.verify_password("not the password").unwrap());
    }

    #[test]
    fn rejects_weak_credentials() {
        let empty = NewAdmin::try_from(AdminCredentials::empty());
        assert!(matches!(empty, Err(Error::BadRequest(_))));
        let short = AdminCredentials {
            username: "someone".into(),
            password: "short".into(),
        };
        assert!(matches!(NewAdmin::try_from(short), Err(Error::BadRequest(_))));
    }

    #[test]
    fn debug_hides_password() {
        let printed = format!("{:?}", AdminCredentials::example());
        assert!(printed.contains("coordinator"));
        assert_eq!(printed.matches("coordinator").count(), 1);
    }
}
