//! Request decoding and validation.
//!
//! # Responsibilities
//! - Parse the `{id}` path segment
//! - Decode and validate user bodies
//! - Name the request ID header shared with the middleware stack

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::database::NewUser;
use crate::http::response::ApiError;

/// Header carrying the per-request UUID.
pub const X_REQUEST_ID: &str = "x-request-id";

pub const ROLES: [&str; 2] = ["Customer", "Employee"];

/// User body accepted by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputUser {
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub user_id: i64,
}

impl InputUser {
    /// Field name → problem description; empty when valid.
    pub fn problems(&self) -> BTreeMap<String, String> {
        let mut problems = BTreeMap::new();

        if self.user_id < 1 {
            problems.insert("user_id".to_string(), "user_id must be more than 0".to_string());
        }

        if !ROLES.contains(&self.role.as_str()) {
            problems.insert(
                "role".to_string(),
                "role must be 'Customer' or 'Employee'".to_string(),
            );
        }

        problems
    }

    pub fn into_new_user(self) -> NewUser {
        NewUser {
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            user_id: self.user_id,
        }
    }
}

/// Parse a path id.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|e| {
        tracing::warn!(id = %raw, error = %e, "Invalid ID in path");
        ApiError::InvalidId
    })
}

/// Decode, validate and map a user body.
pub fn decode_user(body: Result<Json<InputUser>, JsonRejection>) -> Result<NewUser, ApiError> {
    let Json(input) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Body parser error");
        ApiError::MalformedBody
    })?;

    let problems = input.problems();
    if !problems.is_empty() {
        tracing::warn!(?problems, "Problems validating input");
        return Err(ApiError::Validation(problems));
    }

    Ok(input.into_new_user())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> InputUser {
        InputUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role: "Employee".into(),
            user_id: 12,
        }
    }

    #[test]
    fn test_valid_user_has_no_problems() {
        assert!(valid().problems().is_empty());
        assert_eq!(decode_user(Ok(Json(valid()))).unwrap().user_id, 12);
    }

    #[test]
    fn test_problems_are_reported_per_field() {
        let input = InputUser {
            role: "Admin".into(),
            user_id: 0,
            ..valid()
        };

        let problems = input.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems.contains_key("role"));
        assert!(problems.contains_key("user_id"));

        let err = decode_user(Ok(Json(input))).unwrap_err();
        assert!(matches!(err, ApiError::Validation(p) if p.len() == 2));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Ok(42));
        assert_eq!(parse_id("abc"), Err(ApiError::InvalidId));
        assert_eq!(parse_id(""), Err(ApiError::InvalidId));
    }
}
