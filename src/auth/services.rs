use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_against_dummy, verify_password},
    repo::UserRepo,
    repo_types::User,
};
use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates a credential. The email is stored lower-cased so uniqueness is
/// case-insensitive.
pub async fn register(users: &dyn UserRepo, req: RegisterRequest) -> Result<User, AppError> {
    let email = normalize_email(&req.email);
    let display_name = req.display_name.trim();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::bad_request("Password too short"));
    }
    if display_name.is_empty() {
        return Err(AppError::bad_request("Display name is required"));
    }

    // Ensure email is not taken; the unique index still guards the race.
    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&req.password)?;
    let user = users.create(&email, display_name, &hash).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks a credential and issues a token. Unknown email and wrong password
/// produce the same `Unauthorized`.
pub async fn authenticate(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<(String, User), AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let Some(user) = users.find_by_email(&email).await? else {
        verify_against_dummy(&req.password);
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized);
    };

    // A corrupt stored hash is indistinguishable from a wrong password.
    if !verify_password(&req.password, &user.password_hash).unwrap_or(false) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized);
    }

    let token = keys.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user))
}
