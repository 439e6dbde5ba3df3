use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use askama::Template;
use sea_orm::DbErr;
use std::fmt;
use thiserror::Error;

use crate::web::templates::ErrorTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 400 BAD REQUEST
    InvalidUpload,

    // 403 FORBIDDEN
    NotEnoughPermission,
    StaffOnly,

    // 404 NOT FOUND
    PageNotFound,
    IncidentNotFound,
    IncidentTypeNotFound,
    AttachmentNotFound,

    // 500 SERVER ERRORS
    DatabaseError,
    StorageError,
    TemplateError,
    TokenGenerationFailed,
    InternalError,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidUpload => "The uploaded file could not be read",

            ErrorCode::NotEnoughPermission => "You do not have permission to access this incident",
            ErrorCode::StaffOnly => "Only staff members can perform this action",

            ErrorCode::PageNotFound => "Page not found",
            ErrorCode::IncidentNotFound => "Incident report not found",
            ErrorCode::IncidentTypeNotFound => "Incident type not found",
            ErrorCode::AttachmentNotFound => "This incident has no attachment",

            ErrorCode::DatabaseError => "A database error occurred",
            ErrorCode::StorageError => "A file storage error occurred",
            ErrorCode::TemplateError => "The page could not be rendered",
            ErrorCode::TokenGenerationFailed => "Could not start a session",
            ErrorCode::InternalError => "Internal server error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidUpload => StatusCode::BAD_REQUEST,

            ErrorCode::NotEnoughPermission |
            ErrorCode::StaffOnly => StatusCode::FORBIDDEN,

            ErrorCode::PageNotFound |
            ErrorCode::IncidentNotFound |
            ErrorCode::IncidentTypeNotFound |
            ErrorCode::AttachmentNotFound => StatusCode::NOT_FOUND,

            ErrorCode::DatabaseError |
            ErrorCode::StorageError |
            ErrorCode::TemplateError |
            ErrorCode::TokenGenerationFailed |
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ApiError(ErrorCode, Option<String>),
}

impl AppError {
    pub fn new(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        AppError::ApiError(code, Some(detail.into()))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ApiError(code, _) => *code,
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        log::error!("database error: {}", err);
        AppError::with_detail(ErrorCode::DatabaseError, err.to_string())
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        log::error!("template rendering error: {}", err);
        AppError::with_detail(ErrorCode::TemplateError, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        log::error!("storage error: {}", err);
        AppError::with_detail(ErrorCode::StorageError, err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        log::error!("session token error: {}", err);
        AppError::new(ErrorCode::TokenGenerationFailed)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        log::error!("password hashing error: {}", err);
        AppError::new(ErrorCode::InternalError)
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::with_detail(ErrorCode::InvalidUpload, err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.code().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::ApiError(code, detail) => {
                let status = code.status_code();
                // server-side details stay in the logs
                let detail = if status.is_server_error() { None } else { detail.clone() };

                let page = ErrorTemplate::new(status.as_u16(), code.message(), detail);
                match page.render() {
                    Ok(html) => HttpResponse::build(status)
                        .content_type(ContentType::html())
                        .body(html),
                    Err(_) => HttpResponse::build(status)
                        .content_type(ContentType::plaintext())
                        .body(code.message()),
                }
            }
        }
    }
}
