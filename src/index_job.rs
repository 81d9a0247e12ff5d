//! Search index maintenance.
//!
//! Recomputes the `people_index` and `project_index` tables from the
//! content store: compose a content string per record, embed it, and
//! upsert by slug. Embedding calls are batched by `embedding.batch_size`;
//! a failed provider call aborts the whole job (partial writes from
//! earlier batches persist). Records whose content hash is unchanged skip
//! the provider call but are still rewritten so the denormalized fields
//! stay current.
//!
//! After upserting, a reconciliation pass deletes index rows whose slug no
//! longer exists in the content store.

use anyhow::{bail, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::content::ContentClient;
use crate::embedding;
use crate::migrate;
use crate::models::{Person, Project};

/// Hard cap on the text sent to the embedding provider.
pub const MAX_CONTENT_CHARS: usize = 8000;

#[derive(Debug, Default, Serialize)]
pub struct IndexReport {
    pub people: usize,
    pub projects: usize,
    /// Records embedded this run (content changed or row was new).
    pub embedded: usize,
    /// Records whose stored hash matched; provider call skipped.
    pub skipped: usize,
    /// Stale rows removed by reconciliation.
    pub removed: usize,
}

/// Collapse whitespace runs, join the parts, and truncate to the cap.
pub fn compose_content(parts: &[&str]) -> String {
    let joined = parts.join(" ");
    let normalized: String = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    normalized.chars().take(MAX_CONTENT_CHARS).collect()
}

pub fn person_content(person: &Person) -> String {
    let skills = person.skills.join(" ");
    compose_content(&[
        &person.name,
        person.title.as_deref().unwrap_or(""),
        &skills,
    ])
}

pub fn project_content(project: &Project) -> String {
    let skills = project.skills.join(" ");
    let sectors = project.sectors.join(" ");
    compose_content(&[
        &project.title,
        project.summary.as_deref().unwrap_or(""),
        &skills,
        &sectors,
    ])
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run the full re-index. Requires an enabled embedding provider.
pub async fn run_index(
    config: &Config,
    pool: &SqlitePool,
    content: &ContentClient,
) -> Result<IndexReport> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    migrate::ensure_schema(pool).await?;
    let provider = embedding::create_provider(&config.embedding)?;

    let people = content.fetch_people().await?;
    let projects = content.fetch_projects().await?;

    let mut report = IndexReport::default();
    let now = chrono::Utc::now().timestamp();

    // ---- people ----
    let person_docs: Vec<(String, String)> = people
        .iter()
        .map(|p| {
            let text = person_content(p);
            let hash = hash_text(&text);
            (text, hash)
        })
        .collect();

    let pending: Vec<usize> = filter_pending(
        pool,
        "people_index",
        people.iter().map(|p| p.slug.as_str()),
        person_docs.iter().map(|(_, h)| h.as_str()),
    )
    .await?;

    let blobs = embed_pending(
        config,
        provider.as_ref(),
        &pending,
        person_docs.iter().map(|(t, _)| t.clone()).collect(),
    )
    .await?;

    for (i, person) in people.iter().enumerate() {
        let (text, hash) = &person_docs[i];
        let blob = blobs.get(&i).map(|v| embedding::vec_to_blob(v));
        upsert_person(pool, person, text, hash, blob.as_deref(), now).await?;
        if blob.is_some() {
            report.embedded += 1;
        } else {
            report.skipped += 1;
        }
    }
    report.people = people.len();

    // ---- projects ----
    let project_docs: Vec<(String, String)> = projects
        .iter()
        .map(|p| {
            let text = project_content(p);
            let hash = hash_text(&text);
            (text, hash)
        })
        .collect();

    let pending: Vec<usize> = filter_pending(
        pool,
        "project_index",
        projects.iter().map(|p| p.slug.as_str()),
        project_docs.iter().map(|(_, h)| h.as_str()),
    )
    .await?;

    let blobs = embed_pending(
        config,
        provider.as_ref(),
        &pending,
        project_docs.iter().map(|(t, _)| t.clone()).collect(),
    )
    .await?;

    for (i, project) in projects.iter().enumerate() {
        let (text, hash) = &project_docs[i];
        let blob = blobs.get(&i).map(|v| embedding::vec_to_blob(v));
        upsert_project(pool, project, text, hash, blob.as_deref(), now).await?;
        if blob.is_some() {
            report.embedded += 1;
        } else {
            report.skipped += 1;
        }
    }
    report.projects = projects.len();

    // ---- reconciliation ----
    let live_people: HashSet<String> = people.iter().map(|p| p.slug.clone()).collect();
    let live_projects: HashSet<String> = projects.iter().map(|p| p.slug.clone()).collect();
    report.removed = reconcile(pool, "people_index", &live_people).await?
        + reconcile(pool, "project_index", &live_projects).await?;

    Ok(report)
}

/// Indexes of records whose stored content hash is missing or stale.
async fn filter_pending<'a>(
    pool: &SqlitePool,
    table: &str,
    slugs: impl Iterator<Item = &'a str>,
    hashes: impl Iterator<Item = &'a str>,
) -> Result<Vec<usize>> {
    let query = format!("SELECT content_hash FROM {} WHERE slug = ?", table);
    let mut pending = Vec::new();

    for (i, (slug, hash)) in slugs.zip(hashes).enumerate() {
        let stored: Option<String> = sqlx::query_scalar(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await?;
        if stored.as_deref() != Some(hash) {
            pending.push(i);
        }
    }

    Ok(pending)
}

/// Embed the pending texts in batches. Returns doc index → vector.
/// A provider failure propagates and aborts the job.
async fn embed_pending(
    config: &Config,
    provider: &dyn embedding::EmbeddingProvider,
    pending: &[usize],
    texts: Vec<String>,
) -> Result<HashMap<usize, Vec<f32>>> {
    let mut vectors = HashMap::new();

    for batch in pending.chunks(config.embedding.batch_size) {
        let batch_texts: Vec<String> = batch.iter().map(|&i| texts[i].clone()).collect();
        let embedded =
            embedding::embed_texts(provider, &config.embedding, &batch_texts).await?;
        for (&i, vec) in batch.iter().zip(embedded.into_iter()) {
            vectors.insert(i, vec);
        }
    }

    Ok(vectors)
}

async fn upsert_person(
    pool: &SqlitePool,
    person: &Person,
    text: &str,
    hash: &str,
    blob: Option<&[u8]>,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO people_index
            (slug, name, title, skills, open_to_work, search_text, content_hash, embedding, indexed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(slug) DO UPDATE SET
            name = excluded.name,
            title = excluded.title,
            skills = excluded.skills,
            open_to_work = excluded.open_to_work,
            search_text = excluded.search_text,
            content_hash = excluded.content_hash,
            embedding = COALESCE(excluded.embedding, people_index.embedding),
            indexed_at = excluded.indexed_at
        "#,
    )
    .bind(&person.slug)
    .bind(&person.name)
    .bind(&person.title)
    .bind(serde_json::to_string(&person.skills)?)
    .bind(person.open_to_work)
    .bind(text)
    .bind(hash)
    .bind(blob)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

async fn upsert_project(
    pool: &SqlitePool,
    project: &Project,
    text: &str,
    hash: &str,
    blob: Option<&[u8]>,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO project_index
            (slug, title, summary, skills, sectors, cohort, open_to_work, search_text, content_hash, embedding, indexed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(slug) DO UPDATE SET
            title = excluded.title,
            summary = excluded.summary,
            skills = excluded.skills,
            sectors = excluded.sectors,
            cohort = excluded.cohort,
            open_to_work = excluded.open_to_work,
            search_text = excluded.search_text,
            content_hash = excluded.content_hash,
            embedding = COALESCE(excluded.embedding, project_index.embedding),
            indexed_at = excluded.indexed_at
        "#,
    )
    .bind(&project.slug)
    .bind(&project.title)
    .bind(&project.summary)
    .bind(serde_json::to_string(&project.skills)?)
    .bind(serde_json::to_string(&project.sectors)?)
    .bind(&project.cohort)
    .bind(project.open_to_work)
    .bind(text)
    .bind(hash)
    .bind(blob)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete rows whose slug is no longer in the live set. Returns the count.
async fn reconcile(pool: &SqlitePool, table: &str, live: &HashSet<String>) -> Result<usize> {
    let existing: Vec<String> = sqlx::query_scalar(&format!("SELECT slug FROM {}", table))
        .fetch_all(pool)
        .await?;

    let delete = format!("DELETE FROM {} WHERE slug = ?", table);
    let mut removed = 0;
    for slug in existing {
        if !live.contains(&slug) {
            sqlx::query(&delete).bind(&slug).execute(pool).await?;
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::Row;

    fn person(slug: &str, name: &str, skills: &[&str]) -> Person {
        Person {
            slug: slug.to_string(),
            name: name.to_string(),
            title: Some("Engineer".to_string()),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            open_to_work: true,
            bio: None,
            highlights: Vec::new(),
            industry_expertise: Vec::new(),
            links: Vec::new(),
            experience: Vec::new(),
        }
    }

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[test]
    fn content_is_whitespace_normalized_and_truncated() {
        let text = compose_content(&["  Ada \n Lovelace ", "", "Rust\t\tPython"]);
        assert_eq!(text, "Ada Lovelace Rust Python");

        let long = "x".repeat(2 * MAX_CONTENT_CHARS);
        let truncated = compose_content(&[&long]);
        assert_eq!(truncated.chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn person_content_includes_name_title_skills() {
        let p = person("ada", "Ada Lovelace", &["Python", "Math"]);
        assert_eq!(person_content(&p), "Ada Lovelace Engineer Python Math");
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_slug() {
        let pool = pool().await;
        let p = person("ada", "Ada Lovelace", &["Python"]);
        let text = person_content(&p);
        let hash = hash_text(&text);
        let blob = embedding::vec_to_blob(&[0.1, 0.2]);

        upsert_person(&pool, &p, &text, &hash, Some(&blob), 1).await.unwrap();
        upsert_person(&pool, &p, &text, &hash, Some(&blob), 2).await.unwrap();

        let rows = sqlx::query("SELECT slug, indexed_at, embedding FROM people_index")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let indexed_at: i64 = rows[0].get("indexed_at");
        assert_eq!(indexed_at, 2);

        pool.close().await;
    }

    #[tokio::test]
    async fn skipped_upsert_keeps_existing_embedding() {
        let pool = pool().await;
        let p = person("ada", "Ada Lovelace", &["Python"]);
        let text = person_content(&p);
        let hash = hash_text(&text);
        let blob = embedding::vec_to_blob(&[0.5, 0.5]);

        upsert_person(&pool, &p, &text, &hash, Some(&blob), 1).await.unwrap();
        // Hash unchanged: refresh without a new vector.
        upsert_person(&pool, &p, &text, &hash, None, 2).await.unwrap();

        let row = sqlx::query("SELECT embedding, indexed_at FROM people_index WHERE slug = 'ada'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let stored: Vec<u8> = row.get("embedding");
        assert_eq!(embedding::blob_to_vec(&stored), vec![0.5, 0.5]);
        let indexed_at: i64 = row.get("indexed_at");
        assert_eq!(indexed_at, 2);

        pool.close().await;
    }

    #[tokio::test]
    async fn filter_pending_skips_matching_hashes() {
        let pool = pool().await;
        let p = person("ada", "Ada Lovelace", &["Python"]);
        let text = person_content(&p);
        let hash = hash_text(&text);
        upsert_person(&pool, &p, &text, &hash, None, 1).await.unwrap();

        let pending = filter_pending(
            &pool,
            "people_index",
            ["ada", "grace"].into_iter(),
            [hash.as_str(), "other-hash"].into_iter(),
        )
        .await
        .unwrap();

        // ada's hash matches; grace has no row yet.
        assert_eq!(pending, vec![1]);

        pool.close().await;
    }

    #[tokio::test]
    async fn reconcile_removes_departed_slugs() {
        let pool = pool().await;
        for slug in ["ada", "grace"] {
            let p = person(slug, slug, &[]);
            let text = person_content(&p);
            upsert_person(&pool, &p, &text, &hash_text(&text), None, 1)
                .await
                .unwrap();
        }

        let live: HashSet<String> = ["ada".to_string()].into_iter().collect();
        let removed = reconcile(&pool, "people_index", &live).await.unwrap();
        assert_eq!(removed, 1);

        let slugs: Vec<String> = sqlx::query_scalar("SELECT slug FROM people_index")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(slugs, vec!["ada"]);

        pool.close().await;
    }
}
