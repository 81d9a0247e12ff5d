//! Content store query layer.
//!
//! People and projects are authored in an external headless CMS and fetched
//! here through its GROQ-style query API. This module only issues reads;
//! all writes happen in the CMS's own editing surface.
//!
//! Queries are assembled by [`GroqQuery`], a parameterized builder: filter
//! fragments reference `$pN` placeholders and the values travel in a
//! separate params map, serialized as JSON and sent as their own
//! query-string entries. User input is never spliced into the query text.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::ContentConfig;
use crate::models::{Person, Project};

const PERSON_PROJECTION: &str = r#"{
  "slug": slug.current, name, title, skills, openToWork, bio,
  highlights, industryExpertise, links, experience
}"#;

const PROJECT_PROJECTION: &str = r#"{
  "slug": slug.current, title, summary, skills, sectors, cohort, industries,
  hasDemoVideo, openToRelocate, openToWork, freelance, nycBased, remoteOnly,
  "team": team[]->{ "slug": slug.current, name, image }
}"#;

/// A structured query under construction.
///
/// Every value-carrying filter goes through [`GroqQuery::bind`], which
/// allocates a fresh `$pN` placeholder. Drafts are always excluded.
#[derive(Debug)]
pub struct GroqQuery {
    filters: Vec<String>,
    params: BTreeMap<String, serde_json::Value>,
    order: String,
    projection: String,
    next_param: usize,
}

impl GroqQuery {
    /// Start a query over one document type, drafts excluded.
    pub fn for_type(doc_type: &'static str, projection: &str, order: &str) -> Self {
        let mut q = Self {
            filters: vec!["!(_id in path(\"drafts.**\"))".to_string()],
            params: BTreeMap::new(),
            order: order.to_string(),
            projection: projection.to_string(),
            next_param: 0,
        };
        let p = q.bind(serde_json::Value::String(doc_type.to_string()));
        q.filters.insert(0, format!("_type == ${}", p));
        q
    }

    fn bind(&mut self, value: serde_json::Value) -> String {
        let name = format!("p{}", self.next_param);
        self.next_param += 1;
        self.params.insert(name.clone(), value);
        name
    }

    /// Exact equality on a field.
    pub fn eq_str(&mut self, field: &str, value: &str) -> &mut Self {
        let p = self.bind(serde_json::Value::String(value.to_string()));
        self.filters.push(format!("{} == ${}", field, p));
        self
    }

    /// Exact equality on a boolean flag.
    pub fn eq_bool(&mut self, field: &str, value: bool) -> &mut Self {
        let p = self.bind(serde_json::Value::Bool(value));
        self.filters.push(format!("{} == ${}", field, p));
        self
    }

    /// Substring match (wildcard both sides) across one or more fields.
    pub fn contains_text(&mut self, fields: &[&str], term: &str) -> &mut Self {
        let p = self.bind(serde_json::Value::String(format!("*{}*", term)));
        let alternatives: Vec<String> = fields
            .iter()
            .map(|f| format!("{} match ${}", f, p))
            .collect();
        self.filters.push(format!("({})", alternatives.join(" || ")));
        self
    }

    /// Require every listed value to be present in an array field.
    pub fn all_in(&mut self, field: &str, values: &[String]) -> &mut Self {
        for value in values {
            let p = self.bind(serde_json::Value::String(value.clone()));
            self.filters.push(format!("${} in {}", p, field));
        }
        self
    }

    /// Render the final query string and its bound params.
    pub fn build(&self) -> (String, BTreeMap<String, serde_json::Value>) {
        let query = format!(
            "*[{}] | order({}) {}",
            self.filters.join(" && "),
            self.order,
            self.projection
        );
        (query, self.params.clone())
    }
}

/// Read-only client for the content store's query API.
pub struct ContentClient {
    http: reqwest::Client,
    base_url: String,
    dataset: String,
    token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct QueryResponse<T> {
    result: Vec<T>,
}

impl ContentClient {
    pub fn new(config: &ContentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dataset: config.dataset.clone(),
            token: config.token.clone(),
        })
    }

    /// Execute a built query and deserialize the `result` array.
    pub async fn query<T: DeserializeOwned>(&self, query: &GroqQuery) -> Result<Vec<T>> {
        let (text, params) = query.build();
        let url = format!("{}/query/{}", self.base_url, self.dataset);

        let mut request = self.http.get(&url).query(&[("query", text.as_str())]);
        for (name, value) in &params {
            request = request.query(&[(format!("${}", name), value.to_string())]);
        }
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .with_context(|| "content store request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("content store error {}: {}", status, body);
        }

        let parsed: QueryResponse<T> = response
            .json()
            .await
            .with_context(|| "content store returned malformed JSON")?;
        Ok(parsed.result)
    }

    /// All non-draft people, ordered by name.
    pub async fn fetch_people(&self) -> Result<Vec<Person>> {
        let query = GroqQuery::for_type("person", PERSON_PROJECTION, "name asc");
        self.query(&query).await
    }

    /// All non-draft projects, ordered by title.
    pub async fn fetch_projects(&self) -> Result<Vec<Project>> {
        let query = GroqQuery::for_type("project", PROJECT_PROJECTION, "title asc");
        self.query(&query).await
    }

    /// Projects matching a pre-built filter query (the browse path).
    pub async fn fetch_projects_filtered(&self, query: &GroqQuery) -> Result<Vec<Project>> {
        self.query(query).await
    }
}

/// Base query for the browse path: all non-draft projects by title.
pub fn project_query() -> GroqQuery {
    GroqQuery::for_type("project", PROJECT_PROJECTION, "title asc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_query_excludes_drafts_and_orders_by_title() {
        let (text, params) = project_query().build();
        assert!(text.contains("!(_id in path(\"drafts.**\"))"));
        assert!(text.contains("order(title asc)"));
        assert_eq!(params.get("p0").and_then(|v| v.as_str()), Some("project"));
    }

    #[test]
    fn user_values_never_appear_in_query_text() {
        let mut q = project_query();
        q.eq_str("cohort", "spring-2025\"] malicious");
        q.contains_text(&["title", "summary"], "inject*here");
        q.all_in("industries", &["fin\"tech".to_string()]);

        let (text, params) = q.build();
        assert!(!text.contains("malicious"));
        assert!(!text.contains("inject"));
        assert!(!text.contains("fin\"tech"));
        // Every value is carried in a bound param instead.
        assert!(params
            .values()
            .any(|v| v.as_str() == Some("spring-2025\"] malicious")));
        assert!(params.values().any(|v| v.as_str() == Some("*inject*here*")));
    }

    #[test]
    fn all_in_binds_one_param_per_value() {
        let mut q = project_query();
        q.all_in("industries", &["fintech".to_string(), "health".to_string()]);
        let (text, params) = q.build();
        // p0 is the type; two more for the industries.
        assert_eq!(params.len(), 3);
        assert!(text.contains("$p1 in industries"));
        assert!(text.contains("$p2 in industries"));
    }

    #[test]
    fn contains_text_matches_both_fields() {
        let mut q = project_query();
        q.contains_text(&["title", "summary"], "banking");
        let (text, params) = q.build();
        assert!(text.contains("(title match $p1 || summary match $p1)"));
        assert_eq!(params.get("p1").and_then(|v| v.as_str()), Some("*banking*"));
    }
}
