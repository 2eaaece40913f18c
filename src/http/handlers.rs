//! User endpoint handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::http::request::{decode_user, parse_id, InputUser};
use crate::http::response::{ApiError, IdResponse, MessageResponse, UserResponse, UsersResponse};
use crate::http::server::AppState;

/// `GET /api/user`
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = state.users.list_users().await.map_err(|e| {
        tracing::error!(error = %e, "Error listing users");
        ApiError::Internal("Error retrieving data")
    })?;

    Ok(Json(UsersResponse { users }))
}

/// `GET /api/user/{id}`
pub async fn fetch_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;

    match state.users.fetch_user(id).await {
        Ok(Some(user)) => Ok(Json(UserResponse { user })),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => {
            tracing::error!(id, error = %e, "Error fetching user");
            Err(ApiError::Internal("Error retrieving data"))
        }
    }
}

/// `PUT /api/user/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<InputUser>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;
    let user = decode_user(body)?;

    match state.users.update_user(id, user).await {
        Ok(Some(user)) => Ok(Json(UserResponse { user })),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => {
            tracing::error!(id, error = %e, "Error updating user");
            Err(ApiError::Internal("Error updating data"))
        }
    }
}

/// `POST /api/user`
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<InputUser>, JsonRejection>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let user = decode_user(body)?;

    let object_id = state.users.create_user(user).await.map_err(|e| {
        tracing::error!(error = %e, "Error creating user");
        ApiError::Internal("Error creating object")
    })?;

    tracing::info!(id = object_id, "User created");
    Ok((StatusCode::CREATED, Json(IdResponse { object_id })))
}

/// `DELETE /api/user/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let id = parse_id(&id)?;

    match state.users.fetch_user(id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(id, "Delete target does not exist");
            return Err(ApiError::DoesNotExist);
        }
        Err(e) => {
            tracing::error!(id, error = %e, "Error validating delete target");
            return Err(ApiError::Internal("Error validating object"));
        }
    }

    match state.users.delete_user(id).await {
        Ok(true) => Ok((
            StatusCode::ACCEPTED,
            Json(MessageResponse::new("object successfully deleted")),
        )),
        // Removed concurrently between the check and the delete.
        Ok(false) => Err(ApiError::DoesNotExist),
        Err(e) => {
            tracing::error!(id, error = %e, "Error deleting user");
            Err(ApiError::Internal("Error deleting object"))
        }
    }
}

/// `GET /api/health-check`
pub async fn health_check() -> Json<MessageResponse> {
    tracing::debug!("Health check called");
    Json(MessageResponse::new("ok"))
}

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Json<MessageResponse>) {
    (StatusCode::NOT_FOUND, Json(MessageResponse::new("Page not found")))
}
