//! Cache revalidation trigger.
//!
//! When content changes upstream, the CMS calls `POST /revalidate` with a
//! shared secret. This module computes which rendered paths are stale and
//! optionally notifies the frontend so it regenerates them on next request.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RevalidateConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Person,
    Project,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalidateRequest {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub slug: Option<String>,
    /// People whose detail pages are affected, e.g. when a project's team
    /// composition changes.
    #[serde(default)]
    pub person_slugs: Vec<String>,
}

/// Compute the invalidation set: listing pages unconditionally, the
/// changed entity's detail page when identified, and every affected person
/// detail page. Deduplicated, order-preserving.
pub fn invalidation_paths(request: &RevalidateRequest) -> Vec<String> {
    let mut paths = vec!["/people".to_string(), "/projects".to_string()];

    if let Some(ref slug) = request.slug {
        let detail = match request.kind {
            ChangeKind::Person => format!("/people/{}", slug),
            ChangeKind::Project => format!("/projects/{}", slug),
        };
        paths.push(detail);
    }

    for slug in &request.person_slugs {
        paths.push(format!("/people/{}", slug));
    }

    let mut seen = std::collections::HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
    paths
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalidateOutcome {
    pub revalidated: bool,
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_status: Option<u16>,
}

/// Invalidate the given paths, forwarding to the frontend when configured.
pub async fn invalidate(
    config: &RevalidateConfig,
    paths: Vec<String>,
) -> Result<RevalidateOutcome> {
    let Some(ref url) = config.forward_url else {
        return Ok(RevalidateOutcome {
            revalidated: true,
            paths,
            forward_status: None,
        });
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let response = client
        .post(url)
        .json(&serde_json::json!({ "paths": paths }))
        .send()
        .await?;

    Ok(RevalidateOutcome {
        revalidated: true,
        forward_status: Some(response.status().as_u16()),
        paths,
    })
}
