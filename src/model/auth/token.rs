use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rocket::{
    http::{Cookie, SameSite},
    time::Duration,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::model::mongodb::Id;

use super::user::{Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user with specific rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user, with the correct rights for that user type.
    pub fn new<U: User>(user: &U) -> Self {
        Self {
            id: user.id(),
            rights: U::RIGHTS,
        }
    }

    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Deserialize a token from a cookie, checking its signature and expiry.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self> {
        let claims = jsonwebtoken::decode::<Claims>(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )?;
        Ok(claims.claims.token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_round_trip() {
        let config = Config::example();
        let token = AuthToken {
            id: Id::new(),
            rights: Rights::Student,
        };

        let cookie = token.into_cookie(&config).unwrap();
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(AuthToken::from_cookie(&cookie, &config).unwrap(), token);
    }

    #[test]
    fn foreign_or_tampered_cookies_are_rejected() {
        let config = Config::example();
        let token = AuthToken {
            id: Id::new(),
            rights: Rights::Student,
        };
        let cookie = token.into_cookie(&config).unwrap();

        // Signed with a different secret.
        assert!(AuthToken::from_cookie(&cookie, &Config::example2()).is_err());

        // Payload swapped for one claiming admin rights.
        let forged = AuthToken {
            rights: Rights::Admin,
            ..token
        }
        .into_cookie(&Config::example2())
        .unwrap();
        let mut parts = cookie.value().split('.');
        let header = parts.next().unwrap();
        let signature = parts.nth(1).unwrap();
        let forged_payload = forged.value().split('.').nth(1).unwrap();
        let tampered = Cookie::new(
            AUTH_TOKEN_COOKIE,
            format!("{header}.{forged_payload}.{signature}"),
        );
        assert!(AuthToken::from_cookie(&tampered, &config).is_err());

        let garbage = Cookie::new(AUTH_TOKEN_COOKIE, "not a jwt");
        assert!(AuthToken::from_cookie(&garbage, &config).is_err());
    }
}
