use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub email: String,              // lower-cased, unique
    pub display_name: String,       // shown in the UI
    pub password_hash: String,      // Argon2 PHC string, never leaves the server
    pub created_at: OffsetDateTime, // creation timestamp
}
