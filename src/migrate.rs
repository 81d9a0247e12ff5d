use anyhow::Result;
use sqlx::SqlitePool;

/// Idempotently create the index tables and the event log.
///
/// Run by `lookbook init` and lazily by the indexing job, so a fresh
/// deployment can reindex without a separate migration step.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    // People search index: one row per slug, overwritten on reindex.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people_index (
            slug TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            title TEXT,
            skills TEXT NOT NULL DEFAULT '[]',
            open_to_work INTEGER NOT NULL DEFAULT 0,
            search_text TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            embedding BLOB,
            indexed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_index (
            slug TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            summary TEXT,
            skills TEXT NOT NULL DEFAULT '[]',
            sectors TEXT NOT NULL DEFAULT '[]',
            cohort TEXT,
            open_to_work INTEGER NOT NULL DEFAULT 0,
            search_text TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            embedding BLOB,
            indexed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only CRM log. Rows are never updated or deleted.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS share_events (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            email TEXT,
            note TEXT,
            people_count INTEGER NOT NULL,
            project_count INTEGER NOT NULL,
            people_slugs TEXT NOT NULL DEFAULT '[]',
            project_slugs TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_share_events_kind ON share_events(kind)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_share_events_created_at ON share_events(created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;

    fn test_config(dir: &std::path::Path) -> Config {
        let body = format!(
            r#"
[db]
path = "{}/lookbook.sqlite"

[server]
bind = "127.0.0.1:0"

[content]
base_url = "http://localhost:1"
dataset = "test"

[revalidate]
secret = "s"

[index]
secret = "s"
"#,
            dir.display()
        );
        toml::from_str(&body).unwrap()
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = test_config(tmp.path());
        let pool = db::connect(&cfg).await.unwrap();

        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert!(tables.contains(&"people_index".to_string()));
        assert!(tables.contains(&"project_index".to_string()));
        assert!(tables.contains(&"share_events".to_string()));

        pool.close().await;
    }
}
