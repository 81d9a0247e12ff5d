//! Moderation seam for the preparation pipeline.
//!
//! The moderation service is an opaque external collaborator: it takes the
//! candidate profile text and returns a report. The `openai` implementation
//! calls the moderations endpoint; `disabled` passes everything through
//! unflagged.

use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;

use crate::config::ModerationConfig;
use crate::models::PreparedPerson;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModerationReport {
    pub flagged: bool,
    /// Category names the provider flagged, empty when clean.
    pub categories: Vec<String>,
}

/// Concatenate the moderatable text: name, title, skills, optional source.
pub fn moderation_input(profile: &PreparedPerson, source_text: Option<&str>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(ref name) = profile.name {
        parts.push(name);
    }
    if let Some(ref title) = profile.title {
        parts.push(title);
    }
    for skill in &profile.skills {
        parts.push(skill);
    }
    if let Some(source) = source_text {
        parts.push(source);
    }
    parts.join("\n")
}

/// Run the moderation check over a prepared profile.
pub async fn moderate(
    config: &ModerationConfig,
    profile: &PreparedPerson,
    source_text: Option<&str>,
) -> Result<ModerationReport> {
    match config.provider.as_str() {
        "disabled" => Ok(ModerationReport::default()),
        "openai" => moderate_openai(config, &moderation_input(profile, source_text)).await,
        other => bail!("Unknown moderation provider: {}", other),
    }
}

async fn moderate_openai(config: &ModerationConfig, input: &str) -> Result<ModerationReport> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let mut body = serde_json::json!({ "input": input });
    if let Some(ref model) = config.model {
        body["model"] = serde_json::Value::String(model.clone());
    }

    let response = client
        .post("https://api.openai.com/v1/moderations")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("Moderation API error {}: {}", status, body_text);
    }

    let json: serde_json::Value = response.json().await?;
    parse_moderation_response(&json)
}

fn parse_moderation_response(json: &serde_json::Value) -> Result<ModerationReport> {
    let result = json
        .get("results")
        .and_then(|r| r.get(0))
        .ok_or_else(|| anyhow::anyhow!("Invalid moderation response: missing results"))?;

    let flagged = result
        .get("flagged")
        .and_then(|f| f.as_bool())
        .unwrap_or(false);

    let mut categories: Vec<String> = result
        .get("categories")
        .and_then(|c| c.as_object())
        .map(|map| {
            map.iter()
                .filter(|(_, v)| v.as_bool().unwrap_or(false))
                .map(|(k, _)| k.clone())
                .collect()
        })
        .unwrap_or_default();
    categories.sort();

    Ok(ModerationReport { flagged, categories })
}
