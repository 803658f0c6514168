use std::io::Error as IoError;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, Responder},
    Request,
};
use thiserror::Error;

use crate::model::mongodb::Id;

pub type Result<T> = std::result::Result<T, Error>;

/// Message shown for any failed student login, whatever the reason.
pub const STUDENT_LOGIN_FAILED: &str = "Invalid student number or already voted";

/// Message shown for any failed admin login, whatever the reason.
pub const ADMIN_LOGIN_FAILED: &str = "Invalid admin credentials";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Photo storage failure: {0}")]
    Storage(#[from] IoError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    InvalidCredentials(&'static str),
    #[error("Please log in to access this page")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Student has already voted")]
    AlreadyVoted,
    #[error("No candidate with ID {0}")]
    InvalidCandidate(Id),
    #[error("No category with ID {0}")]
    InvalidCategory(Id),
    #[error("Invalid photo: {0}")]
    InvalidPhoto(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error should be reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Jwt(_) | Self::Argon2(_) | Self::Storage(_) => {
                Status::InternalServerError
            }
            Self::NotFound(_) => Status::NotFound,
            Self::BadRequest(_) => Status::BadRequest,
            Self::InvalidCredentials(_) | Self::Unauthorized => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::AlreadyVoted => Status::Conflict,
            Self::InvalidCandidate(_) | Self::InvalidCategory(_) | Self::InvalidPhoto(_) => {
                Status::UnprocessableEntity
            }
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        // Internal details stay in the log.
        let message = if status == Status::InternalServerError {
            error!("{self}");
            "Internal server error".to_string()
        } else {
            debug!("{self}");
            self.to_string()
        };
        (status, message).respond_to(req)
    }
}
