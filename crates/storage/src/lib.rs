use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    ChannelId, Enterprise, EnterpriseId, EnterpriseKind, MessageId, NewEnterprise,
};

const ENTERPRISE_COLUMNS: &str =
    "id, name, manager, discord_link, description, type, created_at";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Persists a new enterprise, stamping `id` and `created_at`.
    pub async fn create_enterprise(&self, enterprise: &NewEnterprise) -> Result<Enterprise> {
        let row = sqlx::query(&format!(
            "INSERT INTO enterprises (name, manager, discord_link, description, type, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {ENTERPRISE_COLUMNS}"
        ))
        .bind(&enterprise.name)
        .bind(&enterprise.manager)
        .bind(&enterprise.discord_link)
        .bind(&enterprise.description)
        .bind(enterprise.kind.as_str())
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert enterprise '{}'", enterprise.name))?;
        enterprise_from_row(&row)
    }

    /// Deletes every enterprise whose name matches exactly and returns how
    /// many rows went away. Zero is a normal outcome.
    pub async fn delete_enterprises_by_name(&self, name: &str) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM enterprises WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete enterprises named '{name}'"))?
            .rows_affected();
        Ok(removed)
    }

    /// Every enterprise, legal ones first, then by name (byte order), with
    /// insertion order breaking ties between duplicate names.
    pub async fn list_enterprises(&self) -> Result<Vec<Enterprise>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTERPRISE_COLUMNS}
             FROM enterprises
             ORDER BY CASE type WHEN 'legal' THEN 0 ELSE 1 END ASC, name ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to list enterprises")?;

        rows.iter().map(enterprise_from_row).collect()
    }

    pub async fn load_display_artifact(&self, channel_id: ChannelId) -> Result<Option<MessageId>> {
        let row = sqlx::query("SELECT message_id FROM display_artifacts WHERE channel_id = ?")
            .bind(channel_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("failed to load display artifact")?;

        row.map(|r| {
            let raw = r.get::<String, _>(0);
            raw.parse::<MessageId>()
                .with_context(|| format!("corrupt display artifact id '{raw}'"))
        })
        .transpose()
    }

    pub async fn save_display_artifact(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO display_artifacts (channel_id, message_id, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(channel_id) DO UPDATE SET message_id=excluded.message_id, updated_at=excluded.updated_at",
        )
        .bind(channel_id.to_string())
        .bind(message_id.to_string())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .context("failed to save display artifact")?;
        Ok(())
    }

    pub async fn clear_display_artifact(&self, channel_id: ChannelId) -> Result<()> {
        sqlx::query("DELETE FROM display_artifacts WHERE channel_id = ?")
            .bind(channel_id.to_string())
            .execute(&self.pool)
            .await
            .context("failed to clear display artifact")?;
        Ok(())
    }
}

fn enterprise_from_row(row: &SqliteRow) -> Result<Enterprise> {
    let raw_kind = row.get::<String, _>(5);
    let kind = raw_kind
        .parse::<EnterpriseKind>()
        .map_err(|e| anyhow!("stored enterprise has {e}"))?;
    Ok(Enterprise {
        id: EnterpriseId(row.get::<i64, _>(0)),
        name: row.get::<String, _>(1),
        manager: row.get::<String, _>(2),
        discord_link: row.get::<String, _>(3),
        description: row.get::<String, _>(4),
        kind,
        created_at: row.get::<i64, _>(6),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
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
