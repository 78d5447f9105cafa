use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
mod password;
pub mod repo;
pub(crate) mod repo_types;
pub mod services;

pub use extractors::{require_auth, AuthUser};
pub use jwt::JwtKeys;

/// Registration and login; reachable without a token.
pub fn public_router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Routes that sit behind the auth gate.
pub fn protected_router() -> Router<AppState> {
    handlers::me_routes()
}
