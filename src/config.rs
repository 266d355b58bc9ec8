use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Pipeline configuration. Every tunable is enumerated here with a
/// documented default and validated once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest neighbors to fetch
    pub top_k: usize,
    /// Candidate multiplier for the keyword fallback scan
    pub fallback_scan_limit: usize,
    /// Similarity assigned to fragments found via the keyword fallback
    pub degraded_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            fallback_scan_limit: 50,
            degraded_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of inactivity before a session expires
    pub ttl_seconds: u64,
    /// Maximum turns retained per session; oldest evicted first
    pub max_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            max_turns: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// History window in turns; kept even so user/assistant pairs align
    pub history_window: usize,
    /// Per-turn preview length for assistant content
    pub answer_preview_chars: usize,
    /// Per-fragment preview length in the prompt body
    pub fragment_preview_chars: usize,
    /// Fragments included in the prompt body (all are kept for validation)
    pub max_prompt_fragments: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            history_window: 6,
            answer_preview_chars: 150,
            fragment_preview_chars: 300,
            max_prompt_fragments: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Per-sentence similarity threshold for grounding
    pub grounding_threshold: f64,
    /// Minimum fraction of grounded sentences for is_grounded
    pub grounded_ratio: f64,
    /// Overall score at or above which the answer is approved
    pub approve_threshold: f64,
    /// Overall score at or above which the answer goes to review
    pub review_threshold: f64,
    /// Score weights: grounding / factual consistency / retrieval quality
    pub grounding_weight: f64,
    pub consistency_weight: f64,
    pub retrieval_weight: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            grounding_threshold: 0.7,
            grounded_ratio: 0.6,
            approve_threshold: 0.7,
            review_threshold: 0.5,
            grounding_weight: 0.4,
            consistency_weight: 0.4,
            retrieval_weight: 0.2,
        }
    }
}

/// Independent timeout for every external call. A retrieval timeout
/// triggers the keyword fallback; a validation timeout caps the verdict at
/// review; a generation timeout is fatal to its request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub embedding_ms: u64,
    pub retrieval_ms: u64,
    pub generation_ms: u64,
    pub validation_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_ms: 15_000,
            retrieval_ms: 10_000,
            generation_ms: 30_000,
            validation_ms: 30_000,
        }
    }
}

impl RagConfig {
    /// Load configuration from file, creating the default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = RagConfig::default();
            config.save()?;
            return Ok(config);
        }

        let contents =
            fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: RagConfig =
            toml::from_str(&contents).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".ragline").join("config.toml"))
    }

    /// Validate every tunable; run once at startup
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be at least 1");
        }
        if self.session.max_turns == 0 {
            anyhow::bail!("session.max_turns must be at least 1");
        }
        if self.session.ttl_seconds == 0 {
            anyhow::bail!("session.ttl_seconds must be at least 1");
        }
        if self.fusion.history_window % 2 != 0 {
            anyhow::bail!("fusion.history_window must be even so exchange pairs align");
        }
        for (name, value) in [
            ("grounding_threshold", self.validation.grounding_threshold),
            ("grounded_ratio", self.validation.grounded_ratio),
            ("approve_threshold", self.validation.approve_threshold),
            ("review_threshold", self.validation.review_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("validation.{} must be within [0, 1]", name);
            }
        }
        if self.validation.review_threshold > self.validation.approve_threshold {
            anyhow::bail!("validation.review_threshold must not exceed approve_threshold");
        }
        let weight_sum = self.validation.grounding_weight
            + self.validation.consistency_weight
            + self.validation.retrieval_weight;
        if (weight_sum - 1.0).abs() > 1e-6 {
            anyhow::bail!("validation score weights must sum to 1.0, got {}", weight_sum);
        }
        Ok(())
    }
}
