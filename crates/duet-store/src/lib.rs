//! Duet — PostgreSQL persistence.
//!
//! Implements `SessionRepository` over the `users`, `sessions` and `turns`
//! tables and embeds the workspace migrations.

pub mod pg_session_repository;

use sqlx::PgPool;
use sqlx::migrate::MigrateError;

/// Applies all pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the recorded history does
/// not match the embedded files.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
