use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    pub content: ContentConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    pub revalidate: RevalidateConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub leads: LeadsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Query API root, e.g. `https://cms.example.com/v1/data`.
    pub base_url: String,
    pub dataset: String,
    /// Bearer token for private datasets. Public datasets need none.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: default_dims(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RevalidateConfig {
    /// Shared secret expected in the `x-revalidate-secret` header.
    pub secret: String,
    /// Frontend endpoint to notify with the invalidated paths, if any.
    #[serde(default)]
    pub forward_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Shared secret for the reindex endpoint (header or query parameter).
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LeadsConfig {
    /// Outbound CRM webhook. Absence is not an error: leads are only logged.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl ExtractionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.content.base_url.trim().is_empty() {
        anyhow::bail!("content.base_url must not be empty");
    }
    if config.content.dataset.trim().is_empty() {
        anyhow::bail!("content.dataset must not be empty");
    }

    if config.revalidate.secret.trim().is_empty() {
        anyhow::bail!("revalidate.secret must not be empty");
    }
    if config.index.secret.trim().is_empty() {
        anyhow::bail!("index.secret must not be empty");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims == 0 {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.extraction.is_enabled() && config.extraction.model.is_none() {
        anyhow::bail!(
            "extraction.model must be specified when provider is '{}'",
            config.extraction.provider
        );
    }

    match config.extraction.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown extraction provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    match config.moderation.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown moderation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}
