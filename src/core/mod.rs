//! Core Module - Infrastructure components of the application
//!
//! - JWT authentication and middleware
//! - Configuration
//! - Error handling
//! - Application state

pub mod auth;
pub mod config;
pub mod error;
pub mod state;

pub use auth::{AuthUser, Claims, authentication_middleware, decode_jwt, encode_jwt};
pub use config::Config;
pub use error::{AppError, ChatError};
pub use state::AppState;
