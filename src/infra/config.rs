// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::errors::SceneForgeError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used for code generation, rewriting, decomposition, consolidation.
    pub generator: String,
    /// Vision model used by the judges.
    pub evaluator: String,
    /// OpenAI-compatible chat completions base URL.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-call timeout in seconds for generation requests.
    pub timeout_seconds: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            generator: "gpt-4.1".into(),
            evaluator: "gpt-4.1".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum optimization iterations per object (evaluation calls).
    pub max_iterations: u8,
    /// Corrective regeneration attempts after a failed code execution.
    pub correction_retries: u8,
    /// Whether to run the material styling stage after composition.
    pub enable_materials: bool,
    /// Similarity threshold above which two suggestions are considered
    /// duplicates during local collapse (0.0..=1.0).
    pub suggestion_similarity: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            correction_retries: 1,
            enable_materials: true,
            suggestion_similarity: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Base URL of the documentation retrieval service.
    pub endpoint: String,
    /// When false, every query returns the not-found sentinel locally.
    pub enabled: bool,
    pub timeout_seconds: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:7821".into(),
            enabled: false,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Base URL of the editor add-on bridge.
    pub endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:7820".into(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory under which per-run artifact directories are created.
    pub runs_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { runs_dir: None }
    }
}

impl OutputConfig {
    pub fn resolved_runs_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.runs_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sceneforge")
            .join("runs")
    }
}

impl Config {
    /// Load from the default location (`~/.sceneforge/config.toml`),
    /// falling back to defaults if the file does not exist.
    pub fn load() -> Result<Self, SceneForgeError> {
        let path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sceneforge")
            .join("config.toml");
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SceneForgeError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| {
            SceneForgeError::Config(format!("{}: {e}", path.display()))
        })
    }

    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, SceneForgeError> {
        std::env::var(&self.models.api_key_env).map_err(|_| {
            SceneForgeError::Config(format!(
                "API key not found: set {}",
                self.models.api_key_env
            ))
        })
    }
}
