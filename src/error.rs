use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error as ThisError;

use crate::core::validation::{FieldError, ValidationErrors};

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("you must sign in first")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not your poll")]
    NotOwner,

    #[error("you can create a maximum of {0} polls")]
    QuotaExceeded(i64),

    #[error("poll expired")]
    PollExpired,

    #[error("{0}")]
    ValidationFailed(#[from] ValidationErrors),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("jwt error")]
    JWTError(#[from] jsonwebtoken::errors::Error),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "Unauthenticated",
            Error::NotFound(_) => "NotFound",
            Error::NotOwner => "NotOwner",
            Error::QuotaExceeded(_) => "QuotaExceeded",
            Error::PollExpired => "PollExpired",
            Error::ValidationFailed(_) => "ValidationFailed",
            _ => "Internal",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::NotOwner => StatusCode::FORBIDDEN,
            Error::QuotaExceeded(_) | Error::PollExpired => StatusCode::CONFLICT,
            Error::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self.kind() {
            "Internal" => {
                log::error!("request failed: {}", self);
                "something went wrong".to_owned()
            }
            _ => self.to_string(),
        };
        let fields = match self {
            Error::ValidationFailed(errors) => Some(errors.fields()),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            kind: self.kind(),
            message,
            fields,
        })
    }
}
