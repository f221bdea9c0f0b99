use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::AccessGrant;

/// Local SQLite store for access grants (`users`) and the audit trail (`log`).
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub logged_at: DateTime<Utc>,
    pub payload: Value,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every in-memory connection is its own database.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Returns false when the grant already existed.
    pub async fn add_grant(&self, email: &str, scope: &str) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO users (email, scope) VALUES (?, ?)")
            .bind(email)
            .bind(scope)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to add grant {scope} for {email}"))?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn remove_grant(&self, email: &str, scope: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE email = ? AND scope = ?")
            .bind(email)
            .bind(scope)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn grants_for_user(&self, email: &str) -> Result<Vec<AccessGrant>> {
        let rows = sqlx::query("SELECT email, scope FROM users WHERE email = ? ORDER BY scope ASC")
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to load grants for {email}"))?;
        Ok(rows.into_iter().map(grant_from_row).collect())
    }

    pub async fn list_grants(&self) -> Result<Vec<AccessGrant>> {
        let rows = sqlx::query("SELECT email, scope FROM users ORDER BY email ASC, scope ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(grant_from_row).collect())
    }

    pub async fn append_audit(&self, payload: &Value) -> Result<i64> {
        let rec = sqlx::query("INSERT INTO log (logged_at, payload) VALUES (?, ?) RETURNING id")
            .bind(Utc::now())
            .bind(payload.to_string())
            .fetch_one(&self.pool)
            .await
            .context("failed to append audit entry")?;
        Ok(rec.get::<i64, _>(0))
    }

    /// Newest entries first.
    pub async fn recent_audit(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query("SELECT id, logged_at, payload FROM log ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| {
                let raw: String = r.get("payload");
                Ok(AuditEntry {
                    id: r.get("id"),
                    logged_at: r.get("logged_at"),
                    payload: serde_json::from_str(&raw)
                        .with_context(|| format!("corrupt audit payload: {raw}"))?,
                })
            })
            .collect()
    }
}

fn grant_from_row(row: sqlx::sqlite::SqliteRow) -> AccessGrant {
    AccessGrant::new(row.get::<String, _>(0), &row.get::<String, _>(1))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
