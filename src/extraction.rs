//! AI-assisted profile extraction.
//!
//! Sends admin-supplied free text to the configured chat-completions
//! provider with a fixed system instruction and parses the reply into an
//! [`ExtractedPerson`]. The model is asked for strict JSON but is not
//! trusted to comply: parsing is a validating pass that tags its result —
//! [`ParsedProfile::WellFormed`] when the whole reply is a JSON object,
//! [`ParsedProfile::Salvaged`] when the object had to be recovered from
//! surrounding prose, [`ParsedProfile::Unparseable`] when nothing could be
//! recovered. Malformed model output never errors; only transport and
//! provider failures do.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::models::ExtractedPerson;

/// Inputs shorter than this are rejected before any provider call.
pub const MIN_INPUT_CHARS: usize = 20;

/// Cap on extracted skills, applied after deduplication.
pub const MAX_SKILLS: usize = 12;

const SYSTEM_PROMPT: &str = "You extract structured candidate profiles from free text. \
Reply with ONLY a JSON object of the shape \
{\"name\": string|null, \"title\": string|null, \"skills\": string[], \"openToWork\": boolean|null}. \
Use null when the text does not say. Do not invent skills that are not mentioned.";

/// Outcome of parsing a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedProfile {
    /// The whole reply was a JSON object.
    WellFormed(ExtractedPerson),
    /// A JSON object was recovered from the first `{` to the last `}`.
    Salvaged(ExtractedPerson),
    /// No JSON object could be recovered.
    Unparseable,
}

impl ParsedProfile {
    /// The best-effort profile plus a wire-friendly tag.
    pub fn into_parts(self) -> (ExtractedPerson, &'static str) {
        match self {
            Self::WellFormed(p) => (p, "well_formed"),
            Self::Salvaged(p) => (p, "salvaged"),
            Self::Unparseable => (
                ExtractedPerson {
                    name: None,
                    title: None,
                    skills: Vec::new(),
                    open_to_work: None,
                },
                "unparseable",
            ),
        }
    }
}

/// Parse a raw model reply into a tagged profile. Never fails.
pub fn parse_profile(raw: &str) -> ParsedProfile {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw.trim()) {
        if value.is_object() {
            return ParsedProfile::WellFormed(coerce(&value));
        }
    }

    // Salvage: the model often wraps the object in explanatory prose.
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw[start..=end]) {
                if value.is_object() {
                    return ParsedProfile::Salvaged(coerce(&value));
                }
            }
        }
    }

    ParsedProfile::Unparseable
}

/// Defensive coercion of a parsed object into the profile shape.
///
/// Wrong-typed fields degrade to null rather than failing: the admin sees
/// whatever could be recovered and fills in the rest by hand.
fn coerce(value: &serde_json::Value) -> ExtractedPerson {
    let name = value
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let title = value
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let mut skills: Vec<String> = Vec::new();
    if let Some(items) = value.get("skills").and_then(|v| v.as_array()) {
        for item in items {
            if let Some(s) = item.as_str() {
                if !skills.iter().any(|existing| existing == s) {
                    skills.push(s.to_string());
                }
            }
            if skills.len() >= MAX_SKILLS {
                break;
            }
        }
    }

    let open_to_work = value.get("openToWork").and_then(|v| v.as_bool());

    ExtractedPerson {
        name,
        title,
        skills,
        open_to_work,
    }
}

/// Extract a candidate profile from free text via the configured provider.
///
/// # Errors
///
/// Fails on a disabled provider, a missing API key, or any transport or
/// provider error. Malformed model output is not an error — it comes back
/// tagged through [`ParsedProfile`].
pub async fn extract_person(config: &ExtractionConfig, text: &str) -> Result<ParsedProfile> {
    let raw = chat_completion(config, SYSTEM_PROMPT, text).await?;
    Ok(parse_profile(&raw))
}

async fn chat_completion(config: &ExtractionConfig, system: &str, user: &str) -> Result<String> {
    match config.provider.as_str() {
        "openai" => {}
        "disabled" => bail!("Extraction provider is disabled"),
        other => bail!("Unknown extraction provider: {}", other),
    }

    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("extraction.model required"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": model,
        "temperature": 0,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": user },
        ],
    });

    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("OpenAI API error {}: {}", status, body_text);
    }

    let json: serde_json::Value = response.json().await?;
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing content"))?;

    Ok(content.to_string())
}
