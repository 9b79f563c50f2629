use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use diesel::r2d2;
use serde_json::json;
use std::fmt;

use crate::models::subscription::Status;

/// Errors surfaced by the subscription handlers
#[derive(Debug)]
pub enum AppError {
    // Authorization (ownership); missing or bad tokens are rejected by `auth`
    Forbidden,

    // Validation Errors
    InvalidInput { field: String, message: String },
    DuplicateResource { resource: String },
    ResourceNotFound { resource: String },

    // Lifecycle Errors
    InvalidTransition { from: Status, to: Status },

    // Database Errors
    DatabaseError,
    ConnectionPoolError,

    // System Errors
    InternalError,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Forbidden => write!(f, "Access denied"),

            AppError::InvalidInput { field, message } => write!(f, "Invalid {}: {}", field, message),
            AppError::DuplicateResource { resource } => write!(f, "{} already exists", resource),
            AppError::ResourceNotFound { resource } => write!(f, "{} not found", resource),

            AppError::InvalidTransition { from, to } => {
                write!(f, "Cannot move subscription from {} to {}", from, to)
            }

            AppError::DatabaseError => write!(f, "A database error occurred - please try again"),
            AppError::ConnectionPoolError => {
                write!(f, "Service temporarily unavailable - please try again")
            }

            AppError::InternalError => write!(f, "An unexpected error occurred - please try again"),
        }
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Forbidden => "FORBIDDEN",
            AppError::InvalidInput { .. } => "INVALID_INPUT",
            AppError::DuplicateResource { .. } => "DUPLICATE_RESOURCE",
            AppError::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::DatabaseError => "DATABASE_ERROR",
            AppError::ConnectionPoolError => "CONNECTION_POOL_ERROR",
            AppError::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::DuplicateResource { .. } | AppError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            AppError::DatabaseError | AppError::ConnectionPoolError | AppError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::DatabaseError | AppError::ConnectionPoolError | AppError::InternalError => {
                log::error!("Server error: {:?}", self);
            }
            AppError::Forbidden => {
                log::warn!("Authorization failed: {:?}", self);
            }
            _ => {
                log::info!("Client error: {:?}", self);
            }
        }

        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string()
            }
        }))
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid_input(field: &str, message: &str) -> Self {
        AppError::InvalidInput {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn duplicate_resource(resource: &str) -> Self {
        AppError::DuplicateResource {
            resource: resource.to_string(),
        }
    }

    pub fn resource_not_found(resource: &str) -> Self {
        AppError::ResourceNotFound {
            resource: resource.to_string(),
        }
    }
}

/// Convert database connection pool errors
impl From<r2d2::PoolError> for AppError {
    fn from(err: r2d2::PoolError) -> Self {
        log::error!("Database connection pool error: {}", err);
        AppError::ConnectionPoolError
    }
}

/// Convert diesel database errors
impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::Error as DieselError;

        match err {
            DieselError::NotFound => AppError::resource_not_found("Record"),
            _ => {
                log::error!("Database error: {}", err);
                AppError::DatabaseError
            }
        }
    }
}

/// Convert blocking pool cancellation
impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        log::error!("Blocking task failed: {}", err);
        AppError::InternalError
    }
}

/// Convert user table errors
impl From<crate::models::user::UserTableError> for AppError {
    fn from(err: crate::models::user::UserTableError) -> Self {
        use crate::models::user::UserTableError;

        match err {
            UserTableError::EmailExists => AppError::duplicate_resource("User with this email"),
            UserTableError::InvalidEmail => AppError::invalid_input("email", "Invalid email format"),
            UserTableError::InvalidName => AppError::invalid_input("name", "Invalid name"),
            UserTableError::InvalidRole => AppError::invalid_input("role", "Unknown role"),
            UserTableError::DatabaseError => AppError::DatabaseError,
        }
    }
}
