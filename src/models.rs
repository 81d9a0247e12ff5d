//! Core data types shared across the API, the content layer, and the index.
//!
//! People and projects are owned by the external content store and arrive
//! here as read-mostly camelCase JSON documents. Everything derived from
//! them (index rows, events, extraction candidates) is modeled separately.

use serde::{Deserialize, Serialize};

/// A person profile as served by the content store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub open_to_work: bool,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub industry_expertise: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
}

/// One entry of a person's work history, ordered as authored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub org: String,
    pub role: String,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A project case study as served by the content store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub cohort: Option<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub has_demo_video: bool,
    #[serde(default)]
    pub open_to_relocate: bool,
    #[serde(default)]
    pub open_to_work: bool,
    #[serde(default)]
    pub freelance: bool,
    #[serde(default)]
    pub nyc_based: bool,
    #[serde(default)]
    pub remote_only: bool,
    #[serde(default)]
    pub team: Vec<TeamMember>,
}

/// A resolved team reference on a project.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A search-index row read back from `people_index`.
#[derive(Debug, Clone, Serialize)]
pub struct PersonHit {
    pub slug: String,
    pub name: String,
    pub title: Option<String>,
    pub skills: Vec<String>,
    pub open_to_work: bool,
}

/// A search-index row read back from `project_index`.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectHit {
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub skills: Vec<String>,
    pub sectors: Vec<String>,
    pub cohort: Option<String>,
    pub open_to_work: bool,
}

/// Candidate profile extracted from free text by the LLM, after coercion.
///
/// Transient: lives for one request/response cycle and is always passed
/// through preparation before any storage decision is made by an admin.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPerson {
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Tri-state: `Some(true)`/`Some(false)` when the text says, `None` when unknown.
    pub open_to_work: Option<bool>,
}

/// Normalized profile ready for admin confirmation. Never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedPerson {
    pub name: Option<String>,
    pub title: Option<String>,
    pub skills: Vec<String>,
    pub open_to_work: bool,
}
