//! Structured filter path for browsing project case studies.
//!
//! Criteria compose by conjunction; anything left unset imposes no
//! constraint. All matches are fetched from the content store, then
//! paginated here — the catalog is small enough that the round trip
//! dominates either way.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::content::{project_query, ContentClient, GroqQuery};
use crate::models::Project;

pub const DEFAULT_PER_PAGE: usize = 12;
pub const MAX_PER_PAGE: usize = 50;

/// Filter criteria for the browse endpoint. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCriteria {
    /// Free-text term, substring-matched against title and summary.
    pub term: Option<String>,
    pub cohort: Option<String>,
    /// Every listed industry must be present on the project.
    #[serde(default)]
    pub industries: Vec<String>,
    pub has_demo_video: Option<bool>,
    pub open_to_relocate: Option<bool>,
    pub open_to_work: Option<bool>,
    pub freelance: Option<bool>,
    pub nyc_based: Option<bool>,
    pub remote_only: Option<bool>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowsePage {
    pub items: Vec<Project>,
    pub pagination: Pagination,
}

/// Translate criteria into a parameterized content-store query.
pub fn criteria_query(criteria: &ProjectCriteria) -> GroqQuery {
    let mut query = project_query();

    if let Some(term) = criteria.term.as_deref().map(str::trim) {
        if !term.is_empty() {
            query.contains_text(&["title", "summary"], term);
        }
    }
    if let Some(cohort) = criteria.cohort.as_deref().map(str::trim) {
        if !cohort.is_empty() {
            query.eq_str("cohort", cohort);
        }
    }
    if !criteria.industries.is_empty() {
        query.all_in("industries", &criteria.industries);
    }

    for (field, value) in [
        ("hasDemoVideo", criteria.has_demo_video),
        ("openToRelocate", criteria.open_to_relocate),
        ("openToWork", criteria.open_to_work),
        ("freelance", criteria.freelance),
        ("nycBased", criteria.nyc_based),
        ("remoteOnly", criteria.remote_only),
    ] {
        if let Some(v) = value {
            query.eq_bool(field, v);
        }
    }

    query
}

/// Slice a full result set into one page.
///
/// Page is clamped to ≥ 1, per-page to `[1, MAX_PER_PAGE]` with
/// [`DEFAULT_PER_PAGE`] when unset.
pub fn paginate<T>(items: Vec<T>, page: Option<usize>, per_page: Option<usize>) -> (Vec<T>, Pagination) {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = page.unwrap_or(1).max(1);

    let total = items.len();
    let total_pages = total.div_ceil(per_page);

    let start = (page - 1).saturating_mul(per_page);
    let page_items: Vec<T> = items
        .into_iter()
        .skip(start)
        .take(per_page)
        .collect();

    (
        page_items,
        Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    )
}

/// Run the full browse path: query the content store, paginate the matches.
pub async fn browse_projects(
    client: &ContentClient,
    criteria: &ProjectCriteria,
) -> Result<BrowsePage> {
    let query = criteria_query(criteria);
    let matches = client.fetch_projects_filtered(&query).await?;
    let (items, pagination) = paginate(matches, criteria.page, criteria.per_page);
    Ok(BrowsePage { items, pagination })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_criteria_add_no_filters() {
        let criteria = ProjectCriteria::default();
        let (text, params) = criteria_query(&criteria).build();
        let (base_text, base_params) = project_query().build();
        assert_eq!(text, base_text);
        assert_eq!(params, base_params);
    }

    #[test]
    fn set_criteria_compose_by_conjunction() {
        let criteria = ProjectCriteria {
            term: Some("fintech".to_string()),
            cohort: Some("spring-2025".to_string()),
            industries: vec!["banking".to_string()],
            nyc_based: Some(true),
            ..Default::default()
        };
        let (text, _) = criteria_query(&criteria).build();
        assert!(text.contains("title match"));
        assert!(text.contains("cohort =="));
        assert!(text.contains("in industries"));
        assert!(text.contains("nycBased =="));
        // Conjunction throughout, no disjunction between criteria.
        assert!(!text.contains(") || (cohort"));
    }

    #[test]
    fn blank_term_imposes_no_constraint() {
        let criteria = ProjectCriteria {
            term: Some("   ".to_string()),
            ..Default::default()
        };
        let (text, _) = criteria_query(&criteria).build();
        assert!(!text.contains("match"));
    }

    #[test]
    fn false_flag_still_filters() {
        let criteria = ProjectCriteria {
            remote_only: Some(false),
            ..Default::default()
        };
        let (text, params) = criteria_query(&criteria).build();
        assert!(text.contains("remoteOnly == $p1"));
        assert_eq!(params.get("p1"), Some(&serde_json::Value::Bool(false)));
    }

    #[test]
    fn pagination_splits_25_by_12() {
        let items: Vec<u32> = (0..25).collect();

        let (page1, meta) = paginate(items.clone(), Some(1), Some(12));
        assert_eq!(page1.len(), 12);
        assert_eq!(meta.total, 25);
        assert_eq!(meta.total_pages, 3);

        let (page3, _) = paginate(items.clone(), Some(3), Some(12));
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0], 24);

        let (page4, _) = paginate(items, Some(4), Some(12));
        assert!(page4.is_empty());
    }

    #[test]
    fn pagination_clamps_inputs() {
        let items: Vec<u32> = (0..5).collect();

        let (_, meta) = paginate(items.clone(), Some(0), Some(0));
        assert_eq!(meta.page, 1);
        assert_eq!(meta.per_page, 1);

        let (_, meta) = paginate(items.clone(), None, Some(500));
        assert_eq!(meta.per_page, MAX_PER_PAGE);

        let (_, meta) = paginate(items, None, None);
        assert_eq!(meta.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn empty_result_set_has_zero_pages() {
        let (items, meta) = paginate(Vec::<u32>::new(), None, None);
        assert!(items.is_empty());
        assert_eq!(meta.total, 0);
        assert_eq!(meta.total_pages, 0);
    }
}
