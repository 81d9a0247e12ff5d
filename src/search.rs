//! Simple search over the local index tables.
//!
//! Text matching is deliberately narrow: the query is tokenized on
//! whitespace and ONLY the first token is used, as a token-prefix match
//! against the denormalized `search_text`. Multi-word queries are not
//! phrase-matched. Tag filters require every requested tag to be present.
//!
//! The people and projects sub-queries run concurrently and are joined
//! into one response; a side excluded by the kind selector contributes an
//! empty array without touching the database.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::models::{PersonHit, ProjectHit};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 30;

/// Which index tables to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    People,
    Projects,
    Both,
}

impl SearchKind {
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.unwrap_or("both") {
            "people" => Ok(Self::People),
            "projects" => Ok(Self::Projects),
            "both" => Ok(Self::Both),
            other => bail!(
                "Unknown search kind: '{}'. Use people, projects, or both.",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub skills: Vec<String>,
    pub sectors: Vec<String>,
    pub open_to_work: Option<bool>,
    pub kind: SearchKind,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub people: Vec<PersonHit>,
    pub projects: Vec<ProjectHit>,
}

/// Clamp a requested result limit into `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// First whitespace token of the query, if any. The rest is ignored.
pub fn first_token(query: &str) -> Option<&str> {
    query.split_whitespace().next()
}

/// Escape LIKE wildcards so user tokens match literally.
fn escape_like(token: &str) -> String {
    token
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// True when every requested tag appears in the record's tags.
/// An empty request imposes no constraint.
pub fn contains_all(record_tags: &[String], requested: &[String]) -> bool {
    requested.iter().all(|tag| record_tags.contains(tag))
}

fn parse_tags(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Run both sub-queries concurrently and combine the results.
pub async fn run_search(pool: &SqlitePool, request: &SearchRequest) -> Result<SearchResults> {
    let (people, projects) = tokio::join!(
        search_people(pool, request),
        search_projects(pool, request),
    );

    Ok(SearchResults {
        people: people?,
        projects: projects?,
    })
}

async fn search_people(pool: &SqlitePool, request: &SearchRequest) -> Result<Vec<PersonHit>> {
    if request.kind == SearchKind::Projects {
        return Ok(Vec::new());
    }

    let rows = match first_token(&request.query) {
        Some(token) => {
            let escaped = escape_like(token);
            sqlx::query(
                r#"
                SELECT slug, name, title, skills, open_to_work
                FROM people_index
                WHERE search_text LIKE ? ESCAPE '\' OR search_text LIKE ? ESCAPE '\'
                ORDER BY name ASC, slug ASC
                "#,
            )
            .bind(format!("{}%", escaped))
            .bind(format!("% {}%", escaped))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT slug, name, title, skills, open_to_work FROM people_index \
                 ORDER BY name ASC, slug ASC",
            )
            .fetch_all(pool)
            .await?
        }
    };

    let mut hits = Vec::new();
    for row in rows {
        let skills = parse_tags(row.get("skills"));
        if !contains_all(&skills, &request.skills) {
            continue;
        }
        let open_to_work: bool = row.get("open_to_work");
        if let Some(wanted) = request.open_to_work {
            if open_to_work != wanted {
                continue;
            }
        }
        hits.push(PersonHit {
            slug: row.get("slug"),
            name: row.get("name"),
            title: row.get("title"),
            skills,
            open_to_work,
        });
        if hits.len() >= request.limit {
            break;
        }
    }

    Ok(hits)
}

async fn search_projects(pool: &SqlitePool, request: &SearchRequest) -> Result<Vec<ProjectHit>> {
    if request.kind == SearchKind::People {
        return Ok(Vec::new());
    }

    let rows = match first_token(&request.query) {
        Some(token) => {
            let escaped = escape_like(token);
            sqlx::query(
                r#"
                SELECT slug, title, summary, skills, sectors, cohort, open_to_work
                FROM project_index
                WHERE search_text LIKE ? ESCAPE '\' OR search_text LIKE ? ESCAPE '\'
                ORDER BY title ASC, slug ASC
                "#,
            )
            .bind(format!("{}%", escaped))
            .bind(format!("% {}%", escaped))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT slug, title, summary, skills, sectors, cohort, open_to_work \
                 FROM project_index ORDER BY title ASC, slug ASC",
            )
            .fetch_all(pool)
            .await?
        }
    };

    let mut hits = Vec::new();
    for row in rows {
        let skills = parse_tags(row.get("skills"));
        let sectors = parse_tags(row.get("sectors"));
        if !contains_all(&skills, &request.skills) {
            continue;
        }
        if !contains_all(&sectors, &request.sectors) {
            continue;
        }
        let open_to_work: bool = row.get("open_to_work");
        if let Some(wanted) = request.open_to_work {
            if open_to_work != wanted {
                continue;
            }
        }
        hits.push(ProjectHit {
            slug: row.get("slug"),
            title: row.get("title"),
            summary: row.get("summary"),
            skills,
            sectors,
            cohort: row.get("cohort"),
            open_to_work,
        });
        if hits.len() >= request.limit {
            break;
        }
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::ensure_schema(&pool).await.unwrap();

        for (slug, name, title, skills, otw, text) in [
            (
                "ada-lovelace",
                "Ada Lovelace",
                Some("Machine Learning Engineer"),
                r#"["Python","Machine Learning"]"#,
                true,
                "ada lovelace machine learning engineer python",
            ),
            (
                "grace-hopper",
                "Grace Hopper",
                Some("Compiler Engineer"),
                r#"["COBOL"]"#,
                false,
                "grace hopper compiler engineer cobol",
            ),
            (
                "mach-jones",
                "Mach Jones",
                None,
                r#"["react"]"#,
                true,
                "mach jones react frontend",
            ),
        ] {
            sqlx::query(
                "INSERT INTO people_index \
                 (slug, name, title, skills, open_to_work, search_text, content_hash, indexed_at) \
                 VALUES (?, ?, ?, ?, ?, ?, 'h', 0)",
            )
            .bind(slug)
            .bind(name)
            .bind(title)
            .bind(skills)
            .bind(otw)
            .bind(text)
            .execute(&pool)
            .await
            .unwrap();
        }

        sqlx::query(
            "INSERT INTO project_index \
             (slug, title, summary, skills, sectors, cohort, open_to_work, search_text, content_hash, indexed_at) \
             VALUES ('ledger', 'Ledger', 'machine-assisted bookkeeping', '[\"react\"]', '[\"fintech\"]', 'spring', 0, 'ledger machine assisted bookkeeping react fintech', 'h', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    fn request(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            skills: Vec::new(),
            sectors: Vec::new(),
            open_to_work: None,
            kind: SearchKind::Both,
            limit: DEFAULT_LIMIT,
        }
    }

    #[test]
    fn limit_clamps() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(31)), MAX_LIMIT);
        assert_eq!(clamp_limit(Some(5)), 5);
    }

    #[test]
    fn kind_parses() {
        assert_eq!(SearchKind::parse(None).unwrap(), SearchKind::Both);
        assert_eq!(SearchKind::parse(Some("people")).unwrap(), SearchKind::People);
        assert!(SearchKind::parse(Some("companies")).is_err());
    }

    #[test]
    fn containment_semantics() {
        let record = vec!["react".to_string()];
        assert!(contains_all(&record, &[]));
        assert!(contains_all(&record, &["react".to_string()]));
        assert!(!contains_all(
            &record,
            &["react".to_string(), "go".to_string()]
        ));
    }

    #[tokio::test]
    async fn only_first_token_is_matched() {
        let pool = seeded_pool().await;

        // "machine learning engineer" matches on "machine" alone: Ada's
        // search text contains the token "machine", and so does the Ledger
        // project ("machine-assisted"). Grace has "engineer" but no token
        // starting with "machine", so she is excluded.
        let results = run_search(&pool, &request("machine learning engineer"))
            .await
            .unwrap();
        let people: Vec<&str> = results.people.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(people, vec!["ada-lovelace"]);
        assert_eq!(results.projects.len(), 1);
        assert_eq!(results.projects[0].slug, "ledger");
    }

    #[tokio::test]
    async fn prefix_matches_token_starts_anywhere() {
        let pool = seeded_pool().await;

        // "mach" is a prefix of "machine" (mid-text) and of "mach" (name).
        let results = run_search(&pool, &request("mach")).await.unwrap();
        let people: Vec<&str> = results.people.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(people, vec!["ada-lovelace", "mach-jones"]);
    }

    #[tokio::test]
    async fn empty_query_imposes_no_text_constraint() {
        let pool = seeded_pool().await;
        let results = run_search(&pool, &request("   ")).await.unwrap();
        assert_eq!(results.people.len(), 3);
        assert_eq!(results.projects.len(), 1);
    }

    #[tokio::test]
    async fn skill_filter_requires_every_tag() {
        let pool = seeded_pool().await;
        let mut req = request("");
        req.skills = vec!["react".to_string(), "go".to_string()];
        let results = run_search(&pool, &req).await.unwrap();
        // mach-jones has only "react": excluded.
        assert!(results.people.is_empty());
        assert!(results.projects.is_empty());
    }

    #[tokio::test]
    async fn open_to_work_filter_applies() {
        let pool = seeded_pool().await;
        let mut req = request("");
        req.open_to_work = Some(true);
        let results = run_search(&pool, &req).await.unwrap();
        let people: Vec<&str> = results.people.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(people, vec!["ada-lovelace", "mach-jones"]);
        assert!(results.projects.is_empty());
    }

    #[tokio::test]
    async fn excluded_kind_returns_empty_side() {
        let pool = seeded_pool().await;
        let mut req = request("");
        req.kind = SearchKind::People;
        let results = run_search(&pool, &req).await.unwrap();
        assert_eq!(results.people.len(), 3);
        assert!(results.projects.is_empty());
    }

    #[tokio::test]
    async fn limit_truncates_results() {
        let pool = seeded_pool().await;
        let mut req = request("");
        req.limit = 2;
        let results = run_search(&pool, &req).await.unwrap();
        assert_eq!(results.people.len(), 2);
    }

    #[tokio::test]
    async fn like_wildcards_are_escaped() {
        let pool = seeded_pool().await;
        // A bare "%" must not match everything.
        let results = run_search(&pool, &request("%")).await.unwrap();
        assert!(results.people.is_empty());
        assert!(results.projects.is_empty());
    }
}
