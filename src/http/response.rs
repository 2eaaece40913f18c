//! Response envelopes and error mapping.
//!
//! # Responsibilities
//! - Define the JSON envelopes every endpoint answers with
//! - Map handler failures to status codes and `{"error": ...}` bodies
//!
//! # Design Decisions
//! - Store errors never leak to clients; they are logged by the handler
//! - Validation problems are returned per field

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::database::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdResponse {
    pub object_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validation_errors: BTreeMap<String, String>,
}

/// Failure of a user endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Path id is not an integer.
    InvalidId,
    /// Body is not valid JSON for the expected shape.
    MalformedBody,
    /// Body parsed but failed validation.
    Validation(BTreeMap<String, String>),
    /// No user with the requested id.
    NotFound,
    /// Delete target does not exist.
    DoesNotExist,
    /// Store failure; the message is safe to show to clients.
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId
            | ApiError::MalformedBody
            | ApiError::Validation(_)
            | ApiError::DoesNotExist => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(self) -> ErrorResponse {
        let (error, validation_errors) = match self {
            ApiError::InvalidId => ("Not a valid ID".to_string(), BTreeMap::new()),
            ApiError::MalformedBody => ("missing values or malformed body".to_string(), BTreeMap::new()),
            ApiError::Validation(problems) => ("invalid user".to_string(), problems),
            ApiError::NotFound => ("User not found".to_string(), BTreeMap::new()),
            ApiError::DoesNotExist => ("Object does not exist".to_string(), BTreeMap::new()),
            ApiError::Internal(message) => (message.to_string(), BTreeMap::new()),
        };
        ErrorResponse {
            error,
            validation_errors,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
