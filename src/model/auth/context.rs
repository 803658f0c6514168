use log::warn;
use mongodb::Database;
use rocket::{
    http::Status,
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    db::{admin::Admin, student::Student},
    mongodb::{Coll, Id},
};

use super::{
    token::{AuthToken, AUTH_TOKEN_COOKIE},
    user::Rights,
};

/// Who is making the current request.
///
/// Every request gets one: a missing, invalid, or expired session cookie, or
/// one naming a user that no longer exists, all mean [`AccessContext::Anonymous`].
/// Handlers ask for the identity they need, which fails closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessContext {
    Anonymous,
    Student(Id),
    Admin(Id),
}

impl AccessContext {
    /// The logged-in student's ID.
    pub fn student(&self) -> Result<Id> {
        match self {
            Self::Student(id) => Ok(*id),
            Self::Admin(_) => Err(Error::Forbidden("only students can vote".to_string())),
            Self::Anonymous => Err(Error::Unauthorized),
        }
    }

    /// The logged-in admin's ID.
    pub fn admin(&self) -> Result<Id> {
        match self {
            Self::Admin(id) => Ok(*id),
            Self::Student(_) => Err(Error::Forbidden("admin access required".to_string())),
            Self::Anonymous => Err(Error::Unauthorized),
        }
    }

    /// Succeeds for any logged-in user.
    pub fn authenticated(&self) -> Result<()> {
        match self {
            Self::Anonymous => Err(Error::Unauthorized),
            Self::Student(_) | Self::Admin(_) => Ok(()),
        }
    }

    /// Name of the role, for display.
    pub fn role(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Student(_) => "student",
            Self::Admin(_) => "admin",
        }
    }

    /// Resolve a decoded token against the database.
    async fn from_token(token: AuthToken, db: &Database) -> Result<Self> {
        let context = match token.rights {
            Rights::Student => Coll::<Student>::from_db(db)
                .find_one(token.id.as_doc(), None)
                .await?
                .map(|student| Self::Student(student.id)),
            Rights::Admin => Coll::<Admin>::from_db(db)
                .find_one(token.id.as_doc(), None)
                .await?
                .map(|admin| Self::Admin(admin.id)),
        };
        Ok(context.unwrap_or(Self::Anonymous))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AccessContext {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwraps are safe as `Config` and `Database` are always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();
        let db = req.guard::<&State<Database>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => return Outcome::Success(Self::Anonymous),
        };
        let token = match AuthToken::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => {
                warn!("Ignoring invalid session cookie: {e}");
                return Outcome::Success(Self::Anonymous);
            }
        };

        match Self::from_token(token, db).await {
            Ok(context) => Outcome::Success(context),
            Err(e) => Outcome::Failure((Status::InternalServerError, e)),
        }
    }
}

/// An admin session, required before anything else on the request is read.
///
/// Fails with 403 for a student and 401 for an anonymous caller, so routes that
/// take it first never parse their body for anyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminSession(pub Id);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminSession {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let ctx = try_outcome!(req.guard::<AccessContext>().await);
        match ctx.admin() {
            Ok(id) => Outcome::Success(Self(id)),
            Err(e) => Outcome::Failure((e.status(), e)),
        }
    }
}
