//! CRM event log and lead forwarding.
//!
//! Every lead or sharepack action appends one immutable `share_events`
//! row. The append is best-effort: a database failure is logged and
//! swallowed so it can never block the caller's response. Leads are
//! additionally forwarded to an outbound webhook when one is configured.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Duration;
use uuid::Uuid;

use crate::config::LeadsConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRequest {
    pub email: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub people_slugs: Vec<String>,
    #[serde(default)]
    pub project_slugs: Vec<String>,
}

/// Outcome of the optional webhook forward.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardOutcome {
    pub forwarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Append one event row. Rows are never updated or deleted.
pub async fn record_event(
    pool: &SqlitePool,
    kind: &str,
    email: Option<&str>,
    note: Option<&str>,
    people_slugs: &[String],
    project_slugs: &[String],
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO share_events
            (id, kind, email, note, people_count, project_count, people_slugs, project_slugs, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(kind)
    .bind(email)
    .bind(note)
    .bind(people_slugs.len() as i64)
    .bind(project_slugs.len() as i64)
    .bind(serde_json::to_string(people_slugs)?)
    .bind(serde_json::to_string(project_slugs)?)
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;

    Ok(())
}

/// Append an event, swallowing any failure. Logging must never block the
/// caller's response.
pub async fn record_event_best_effort(
    pool: &SqlitePool,
    kind: &str,
    email: Option<&str>,
    note: Option<&str>,
    people_slugs: &[String],
    project_slugs: &[String],
) {
    if let Err(e) = record_event(pool, kind, email, note, people_slugs, project_slugs).await {
        tracing::warn!(kind, error = %e, "failed to record share event");
    }
}

/// Forward a lead to the configured CRM webhook.
///
/// An unconfigured webhook is not an error: the outcome simply reports
/// `forwarded: false`.
pub async fn forward_lead(config: &LeadsConfig, lead: &LeadRequest) -> Result<ForwardOutcome> {
    let Some(ref url) = config.webhook_url else {
        return Ok(ForwardOutcome {
            forwarded: false,
            status: None,
        });
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "email": lead.email,
        "note": lead.note,
        "peopleSlugs": lead.people_slugs,
        "projectSlugs": lead.project_slugs,
        "source": "lookbook",
    });

    let response = client.post(url).json(&body).send().await?;

    Ok(ForwardOutcome {
        forwarded: true,
        status: Some(response.status().as_u16()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::Row;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn lead_event_is_appended_with_counts() {
        let pool = pool().await;
        let people = vec!["ada".to_string(), "grace".to_string()];
        let projects = vec!["ledger".to_string()];

        record_event(
            &pool,
            "lead",
            Some("buyer@example.com"),
            Some("intro please"),
            &people,
            &projects,
        )
        .await
        .unwrap();

        let row = sqlx::query("SELECT * FROM share_events")
            .fetch_one(&pool)
            .await
            .unwrap();
        let kind: String = row.get("kind");
        let people_count: i64 = row.get("people_count");
        let slugs: String = row.get("people_slugs");
        assert_eq!(kind, "lead");
        assert_eq!(people_count, 2);
        assert_eq!(slugs, r#"["ada","grace"]"#);

        pool.close().await;
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        // No schema: the insert fails, but the call must not panic or err.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        record_event_best_effort(&pool, "lead", None, None, &[], &[]).await;

        pool.close().await;
    }

    #[tokio::test]
    async fn unconfigured_webhook_is_not_forwarded() {
        let config = LeadsConfig::default();
        let outcome = forward_lead(&config, &LeadRequest::default()).await.unwrap();
        assert!(!outcome.forwarded);
        assert!(outcome.status.is_none());
    }
}
