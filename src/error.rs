use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::validation::ValidationError;

pub const TECHNICAL_MESSAGE: &str = "Erreur technique";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", .0.first().map(String::as_str).unwrap_or("Données invalides"))]
    Validation(Vec<String>),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("corrupt stored record: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<I>(errors: I) -> Self
    where
        I: IntoIterator<Item = ValidationError>,
    {
        Self::Validation(errors.into_iter().map(|error| error.to_string()).collect())
    }

    pub fn is_technical(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Corrupt(_) | Self::Hashing(_))
    }

    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(errors) => errors.clone(),
            other if other.is_technical() => vec![TECHNICAL_MESSAGE.to_string()],
            other => vec![other.to_string()],
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(vec![error.to_string()])
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Corrupt(_) | Self::Hashing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_technical() {
            log::error!("Request failed: {self}");
        }
        let body = match self {
            Self::Validation(errors) => json!({ "error": self.to_string(), "errors": errors }),
            other if other.is_technical() => json!({ "error": TECHNICAL_MESSAGE }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
