// akeno-admin/src/models/mod.rs
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use serde_json::json;
use std::fmt;

pub mod consultation;
pub use consultation::*;

pub mod session;
pub use session::*;

pub mod team;
pub use team::*;

// Failures of outbound calls (identity provider and backend)
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ClientError {
    #[display(fmt = "Network error: {}", _0)]
    Network(String),
    #[display(fmt = "Request timed out")]
    Timeout,
    #[display(fmt = "Authentication failed: {}", _0)]
    Auth(String),
    #[display(fmt = "Backend error ({:?}): {}", status, message)]
    Backend { status: Option<u16>, message: String },
    #[display(fmt = "Session expired")]
    SessionExpired,
    #[display(fmt = "Conflict: {}", _0)]
    Conflict(String),
    #[display(fmt = "{}: {}", field, message)]
    Validation { field: String, message: String },
}

impl std::error::Error for ClientError {}

impl ClientError {
    pub fn backend(status: Option<u16>, message: impl Into<String>) -> Self {
        ClientError::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn validation(field: &str, message: &str) -> Self {
        ClientError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    // Message shown in a foreground view when a load fails
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => "Unable to connect to the backend server".to_string(),
            ClientError::Timeout => {
                "Backend server is not responding (request timed out)".to_string()
            }
            ClientError::SessionExpired => "Your session has expired. Please sign in again".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::backend(err.status().map(|s| s.as_u16()), format!("Malformed response: {}", err))
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

// Errors returned from the dashboard HTTP surface
#[derive(Debug)]
pub enum ServiceError {
    BadRequest(String),
    Validation { field: String, message: String },
    Unauthorized(String),
    NotFound,
    Conflict(String),
    BadGateway(String),
    GatewayTimeout,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServiceError::BadRequest(msg) => write!(f, "BadRequest: {}", msg),
            ServiceError::Validation { field, message } => write!(f, "Invalid {}: {}", field, message),
            ServiceError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ServiceError::NotFound => write!(f, "Not Found"),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::BadGateway(msg) => write!(f, "Bad Gateway: {}", msg),
            ServiceError::GatewayTimeout => write!(f, "Gateway Timeout"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::BadRequest(ref message) => HttpResponse::BadRequest().json(message),
            ServiceError::Validation { field, message } => {
                HttpResponse::BadRequest().json(json!({ "field": field, "message": message }))
            }
            ServiceError::Unauthorized(ref message) => HttpResponse::Unauthorized().json(message),
            ServiceError::NotFound => HttpResponse::NotFound().json("Not Found"),
            ServiceError::Conflict(ref message) => HttpResponse::Conflict().json(message),
            ServiceError::BadGateway(ref message) => HttpResponse::BadGateway().json(message),
            ServiceError::GatewayTimeout => HttpResponse::GatewayTimeout()
                .json("Backend server is not responding (30s timeout)"),
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout => ServiceError::GatewayTimeout,
            ClientError::Network(msg) => ServiceError::BadGateway(msg),
            ClientError::Backend { status: Some(404), .. } => ServiceError::NotFound,
            ClientError::Backend { message, .. } => ServiceError::BadGateway(message),
            ClientError::Auth(msg) => ServiceError::Unauthorized(msg),
            ClientError::SessionExpired => ServiceError::Unauthorized("Session expired".to_string()),
            ClientError::Conflict(msg) => ServiceError::Conflict(msg),
            ClientError::Validation { field, message } => ServiceError::Validation { field, message },
        }
    }
}
