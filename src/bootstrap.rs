use sqlx::PgPool;

use crate::auth::hash_password;
use crate::config::AdminSeed;
use crate::models::{split_name, ROLE_ADMIN};

/// Ensures the configured admin account exists and carries the admin role.
/// An existing account keeps its password; only the role is raised.
pub async fn ensure_admin(pool: &PgPool, seed: &AdminSeed) -> anyhow::Result<()> {
    let promoted = sqlx::query("UPDATE users SET role = $1 WHERE email = $2")
        .bind(ROLE_ADMIN)
        .bind(&seed.email)
        .execute(pool)
        .await?;

    if promoted.rows_affected() > 0 {
        tracing::warn!(email = %seed.email, "admin role ensured for existing account");
        return Ok(());
    }

    let hash = hash_password(&seed.password).map_err(|e| anyhow::anyhow!(e))?;
    let (first_name, last_name) = split_name("Health Center Admin");

    sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(first_name)
    .bind(last_name)
    .bind(&seed.email)
    .bind(hash)
    .bind(ROLE_ADMIN)
    .execute(pool)
    .await?;

    tracing::warn!(email = %seed.email, "bootstrapped admin account (password taken from ADMIN_PASSWORD)");
    Ok(())
}
