//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack, graceful shutdown)
//!     → request.rs (path id, body decode + validation)
//!     → handlers.rs (one UserStore call per request)
//!     → response.rs (JSON envelopes, error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{InputUser, X_REQUEST_ID};
pub use response::{ApiError, ErrorResponse, IdResponse, MessageResponse, UserResponse, UsersResponse};
pub use server::{AppState, HttpServer, ServerError};
