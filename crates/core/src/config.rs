//! Configuration management for kbchat.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.kbchat/config.yaml`, or `KBCHAT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Everything here is read once at startup and handed to the session as
//! read-only settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the generation factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .kbchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider ("ollama" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Provider endpoint override
    pub endpoint: Option<String>,

    /// Explicit API key (from `KBCHAT_API_KEY`)
    pub api_key: Option<String>,

    /// Name of the environment variable holding the provider API key
    pub api_key_env: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub sampling: SamplingConfig,

    pub retrieval: RetrievalConfig,

    pub history: HistoryConfig,

    pub search: SearchConfig,

    pub prompts: PromptConfig,
}

/// Sampling parameters passed to the generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingConfig {
    #[serde(rename = "maxTokens", default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(rename = "topP", default = "default_top_p")]
    pub top_p: f32,
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Retrieval settings for the relevance gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Whether turns consult the search collaborator at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of documents kept per turn
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Minimum relevance score a document needs to be used
    #[serde(rename = "minScore", default = "default_min_score")]
    pub min_score: f32,
}

fn default_true() -> bool {
    true
}

fn default_top_k() -> usize {
    3
}

fn default_min_score() -> f32 {
    0.5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

/// Conversation history bound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    /// Number of user/assistant exchanges kept in the sliding window
    #[serde(rename = "maxExchanges", default = "default_max_exchanges")]
    pub max_exchanges: usize,
}

fn default_max_exchanges() -> usize {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_exchanges: default_max_exchanges(),
        }
    }
}

/// Search backend selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SearchConfig {
    /// SQLite-backed document store inside the workspace
    Local {
        /// Database path, relative to the workspace unless absolute
        #[serde(default)]
        path: Option<PathBuf>,
    },

    /// OpenSearch (or Elasticsearch-compatible) index
    OpenSearch {
        /// Base URL including scheme, e.g. `https://search.internal:443`
        endpoint: String,
        index: String,
        #[serde(rename = "timeoutSecs", default)]
        timeout_secs: Option<u64>,
    },
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::Local { path: None }
    }
}

/// Prompt template and sanitizer overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptConfig {
    /// Handlebars template used when retrieved context is available
    #[serde(default)]
    pub grounded: Option<PathBuf>,

    /// Handlebars template used when answering from general knowledge
    #[serde(default)]
    pub ungrounded: Option<PathBuf>,

    #[serde(rename = "reasoningStart", default)]
    pub reasoning_start: Option<String>,

    #[serde(rename = "reasoningEnd", default)]
    pub reasoning_end: Option<String>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    sampling: Option<SamplingConfig>,
    retrieval: Option<RetrievalConfig>,
    history: Option<HistoryConfig>,
    search: Option<SearchConfig>,
    prompts: Option<PromptConfig>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key: None,
            api_key_env: None,
            log_level: None,
            verbose: false,
            no_color: false,
            sampling: SamplingConfig::default(),
            retrieval: RetrievalConfig::default(),
            history: HistoryConfig::default(),
            search: SearchConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `KBCHAT_WORKSPACE`: Override workspace path
    /// - `KBCHAT_CONFIG`: Path to config file
    /// - `KBCHAT_PROVIDER`: LLM provider
    /// - `KBCHAT_MODEL`: Model identifier
    /// - `KBCHAT_ENDPOINT`: Provider endpoint
    /// - `KBCHAT_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration for an explicit workspace and/or config file.
    ///
    /// Both are known before any file is read, so `--workspace` selects
    /// which `.kbchat/config.yaml` is merged. Flag values win over
    /// `KBCHAT_WORKSPACE` and `KBCHAT_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        Self::load_with_env(workspace, config_file, |key| std::env::var(key).ok())
    }

    fn load_with_env<F>(
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        env: F,
    ) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let workspace = workspace.or_else(|| env("KBCHAT_WORKSPACE").map(PathBuf::from));
        if let Some(ref workspace) = workspace {
            config.workspace = workspace.clone();
        }

        config.config_file = config_file.or_else(|| env("KBCHAT_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.kbchat_dir().join("config.yaml"),
        };

        if config_path.exists() {
            tracing::debug!("Merging config file {:?}", config_path);
            config = config.merge_yaml(&config_path)?;

            // An explicitly chosen workspace beats the file's own setting.
            if let Some(workspace) = workspace {
                config.workspace = workspace;
            }
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        if let Some(provider) = env("KBCHAT_PROVIDER") {
            config.provider = provider;
        }

        if let Some(model) = env("KBCHAT_MODEL") {
            config.model = model;
        }

        if let Some(endpoint) = env("KBCHAT_ENDPOINT") {
            config.endpoint = Some(endpoint);
        }

        if let Some(api_key) = env("KBCHAT_API_KEY") {
            config.api_key = Some(api_key);
        }

        if let Some(level) = env("RUST_LOG") {
            config.log_level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if llm.endpoint.is_some() {
                result.endpoint = llm.endpoint;
            }
            if llm.api_key_env.is_some() {
                result.api_key_env = llm.api_key_env;
            }
        }

        if let Some(sampling) = file.sampling {
            result.sampling = sampling;
        }
        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(history) = file.history {
            result.history = history;
        }
        if let Some(search) = file.search {
            result.search = search;
        }
        if let Some(prompts) = file.prompts {
            result.prompts = prompts;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the file and environment.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .kbchat directory.
    pub fn kbchat_dir(&self) -> PathBuf {
        self.workspace.join(".kbchat")
    }

    /// Ensure the .kbchat directory exists.
    pub fn ensure_kbchat_dir(&self) -> AppResult<()> {
        let dir = self.kbchat_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .kbchat directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve a possibly relative path against the workspace.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Path of the local document database.
    pub fn local_index_path(&self) -> Option<PathBuf> {
        match &self.search {
            SearchConfig::Local { path: Some(path) } => Some(self.resolve_path(path)),
            SearchConfig::Local { path: None } => Some(self.kbchat_dir().join("documents.db")),
            SearchConfig::OpenSearch { .. } => None,
        }
    }

    /// Resolve the provider API key.
    ///
    /// `KBCHAT_API_KEY` wins over the variable named by `apiKeyEnv`.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.model.trim().is_empty() {
            return Err(AppError::Config("Model cannot be empty".to_string()));
        }

        let sampling = &self.sampling;
        if !sampling.temperature.is_finite() || !(0.0..=2.0).contains(&sampling.temperature) {
            return Err(AppError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                sampling.temperature
            )));
        }
        if !sampling.top_p.is_finite() || !(0.0..=1.0).contains(&sampling.top_p) {
            return Err(AppError::Config(format!(
                "topP must be within 0.0..=1.0, got {}",
                sampling.top_p
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }
        if !self.retrieval.min_score.is_finite() || self.retrieval.min_score < 0.0 {
            return Err(AppError::Config(format!(
                "minScore must be a non-negative number, got {}",
                self.retrieval.min_score
            )));
        }

        if let SearchConfig::OpenSearch {
            endpoint, index, ..
        } = &self.search
        {
            if endpoint.trim().is_empty() || index.trim().is_empty() {
                return Err(AppError::Config(
                    "OpenSearch backend requires both endpoint and index".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.sampling.max_tokens, 512);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.min_score, 0.5);
        assert!(config.retrieval.enabled);
        assert_eq!(config.history.max_exchanges, 10);
        assert_eq!(config.search, SearchConfig::Local { path: None });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("gpt-4o-mini".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  provider: openai
  model: gpt-4o-mini
  endpoint: https://api.example.com/v1
  apiKeyEnv: EXAMPLE_KEY
sampling:
  maxTokens: 256
  temperature: 0.2
retrieval:
  enabled: false
  topK: 5
history:
  maxExchanges: 4
search:
  backend: opensearch
  endpoint: https://search.example.com:443
  index: kb-default
logging:
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();

        assert_eq!(config.provider, "openai");
        assert_eq!(config.endpoint.as_deref(), Some("https://api.example.com/v1"));
        assert_eq!(config.api_key_env.as_deref(), Some("EXAMPLE_KEY"));
        assert_eq!(config.sampling.max_tokens, 256);
        assert_eq!(config.sampling.top_p, 0.9);
        assert!(!config.retrieval.enabled);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.min_score, 0.5);
        assert_eq!(config.history.max_exchanges, 4);
        assert!(config.no_color);
        assert_eq!(
            config.search,
            SearchConfig::OpenSearch {
                endpoint: "https://search.example.com:443".to_string(),
                index: "kb-default".to_string(),
                timeout_secs: None,
            }
        );
        assert_eq!(config.local_index_path(), None);
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "search: [unbalanced").unwrap();

        let result = AppConfig::default().merge_yaml(&path);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_local_index_path_defaults_under_kbchat_dir() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/docs");
        assert_eq!(
            config.local_index_path(),
            Some(PathBuf::from("/srv/docs/.kbchat/documents.db"))
        );

        config.search = SearchConfig::Local {
            path: Some(PathBuf::from("index/kb.db")),
        };
        assert_eq!(
            config.local_index_path(),
            Some(PathBuf::from("/srv/docs/index/kb.db"))
        );
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_retrieval_bounds() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retrieval.min_score = -0.1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sampling.top_p = 1.5;
        assert!(config.validate().is_err());
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_load_reads_config_under_chosen_workspace() {
        let workspace = TempDir::new().unwrap();
        std::fs::create_dir_all(workspace.path().join(".kbchat")).unwrap();
        std::fs::write(
            workspace.path().join(".kbchat/config.yaml"),
            "search:\n  backend: opensearch\n  endpoint: https://search.example.com\n  index: kb\nhistory:\n  maxExchanges: 2\n",
        )
        .unwrap();

        let config =
            AppConfig::load_with_env(Some(workspace.path().to_path_buf()), None, env_from(&[]))
                .unwrap();

        assert_eq!(config.workspace.as_path(), workspace.path());
        assert_eq!(config.history.max_exchanges, 2);
        assert!(matches!(config.search, SearchConfig::OpenSearch { .. }));
        assert_eq!(config.local_index_path(), None);
    }

    #[test]
    fn test_load_precedence_file_then_env() {
        let workspace = TempDir::new().unwrap();
        let config_path = workspace.path().join("custom.yaml");
        std::fs::write(
            &config_path,
            "llm:\n  provider: openai\n  model: from-file\n  endpoint: http://file.example\n",
        )
        .unwrap();

        let env = env_from(&[
            ("KBCHAT_WORKSPACE", "/does/not/matter"),
            ("KBCHAT_ENDPOINT", "http://env.example"),
        ]);
        let config = AppConfig::load_with_env(
            Some(workspace.path().to_path_buf()),
            Some(config_path),
            env,
        )
        .unwrap();

        // Flag beats KBCHAT_WORKSPACE, env beats the file, file beats defaults.
        assert_eq!(config.workspace.as_path(), workspace.path());
        assert_eq!(config.endpoint.as_deref(), Some("http://env.example"));
        assert_eq!(config.model, "from-file");
        assert_eq!(config.provider, "openai");

        // And command-line overrides beat everything.
        let config = config.with_overrides(
            None,
            None,
            None,
            Some("from-cli".to_string()),
            None,
            false,
            false,
        );
        assert_eq!(config.model, "from-cli");
    }

    #[test]
    fn test_load_explicit_config_file_must_exist() {
        let workspace = TempDir::new().unwrap();
        let result = AppConfig::load_with_env(
            Some(workspace.path().to_path_buf()),
            Some(workspace.path().join("missing.yaml")),
            env_from(&[]),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
