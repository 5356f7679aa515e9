use crate::error::GameLensError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default instruction prepended to free-text queries
pub const DEFAULT_INSTRUCTION: &str = "Represent a video game that has a description of:";

/// Hard ceiling for `MAX_NUM_RESULTS`
pub const RESULT_LIMIT_CEILING: usize = 10_000;

/// Which ranking path answers queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingStrategy {
    /// Approximate nearest-neighbor index (primary)
    Index,
    /// Full scan of the catalog
    Exhaustive,
}

impl FromStr for RankingStrategy {
    type Err = GameLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "index" => Ok(Self::Index),
            "exhaustive" => Ok(Self::Exhaustive),
            other => Err(GameLensError::config(format!(
                "Unknown ranking strategy '{}', must be one of: index, exhaustive",
                other
            ))),
        }
    }
}

impl fmt::Display for RankingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Exhaustive => write!(f, "exhaustive"),
        }
    }
}

/// GameLens application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data directory
    pub data_dir: PathBuf,

    /// Catalog snapshot (names and embeddings)
    pub catalog_path: PathBuf,

    /// Description index snapshot
    pub description_index_path: PathBuf,

    /// Review index snapshot
    pub review_index_path: PathBuf,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Instruction used when the caller does not supply one
    pub embedding_instruction: String,

    /// Token limit for instruction plus query
    pub max_query_tokens: usize,

    /// Result count when the caller does not supply one
    pub default_num_results: usize,

    /// Upper bound on requested result count
    pub max_num_results: usize,

    /// Candidates per page during exhaustive scans
    pub scan_page_size: usize,

    /// Ranking path
    pub ranking_strategy: RankingStrategy,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            catalog_path: PathBuf::from("./data/catalog.json"),
            description_index_path: PathBuf::from("./data/description_index.json"),
            review_index_path: PathBuf::from("./data/review_index.json"),
            ollama_base_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_instruction: DEFAULT_INSTRUCTION.to_string(),
            max_query_tokens: 512,
            default_num_results: 10,
            max_num_results: 100,
            scan_page_size: 100,
            ranking_strategy: RankingStrategy::Index,
            log_dir: PathBuf::from("./data/log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, GameLensError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();
        let data_dir = Self::get_env_path("DATA_DIR").unwrap_or(defaults.data_dir);

        let config = Self {
            catalog_path: Self::get_env_path("CATALOG_PATH")
                .unwrap_or_else(|| data_dir.join("catalog.json")),
            description_index_path: Self::get_env_path("DESCRIPTION_INDEX_PATH")
                .unwrap_or_else(|| data_dir.join("description_index.json")),
            review_index_path: Self::get_env_path("REVIEW_INDEX_PATH")
                .unwrap_or_else(|| data_dir.join("review_index.json")),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or(defaults.ollama_base_url),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_instruction: std::env::var("EMBEDDING_INSTRUCTION")
                .unwrap_or(defaults.embedding_instruction),
            max_query_tokens: Self::get_env_parsed("MAX_QUERY_TOKENS")
                .unwrap_or(defaults.max_query_tokens),
            default_num_results: Self::get_env_parsed("DEFAULT_NUM_RESULTS")
                .unwrap_or(defaults.default_num_results),
            max_num_results: Self::get_env_parsed("MAX_NUM_RESULTS")
                .unwrap_or(defaults.max_num_results),
            scan_page_size: Self::get_env_parsed("SCAN_PAGE_SIZE")
                .unwrap_or(defaults.scan_page_size),
            ranking_strategy: match std::env::var("RANKING_STRATEGY") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.ranking_strategy,
            },
            log_dir: Self::get_env_path("LOG_DIR").unwrap_or_else(|| data_dir.join("log")),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            data_dir,
        };

        config.validate()?;

        Ok(config)
    }

    /// Get PathBuf from environment variable
    fn get_env_path(key: &str) -> Option<PathBuf> {
        std::env::var(key).ok().map(PathBuf::from)
    }

    /// Get a parsed value from environment variable, ignoring unparsable input
    fn get_env_parsed<T: FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.parse().ok())
    }

    /// Clamp a requested result count to the configured bounds
    pub fn clamp_num_results(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_num_results)
            .min(self.max_num_results)
    }

    /// Get log file path
    pub fn get_log_path(&self, filename: &str) -> PathBuf {
        self.log_dir.join(filename)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), GameLensError> {
        if self.embedding_model.is_empty() {
            return Err(GameLensError::config("Embedding model name cannot be empty"));
        }

        if !self.ollama_base_url.starts_with("http://")
            && !self.ollama_base_url.starts_with("https://") {
            return Err(GameLensError::config(
                "Ollama base URL must start with http:// or https://"
            ));
        }

        if self.scan_page_size == 0 {
            return Err(GameLensError::config("Scan page size cannot be 0"));
        }

        if self.max_query_tokens == 0 {
            return Err(GameLensError::config("Max query tokens cannot be 0"));
        }

        if self.max_num_results > RESULT_LIMIT_CEILING {
            return Err(GameLensError::config(format!(
                "Max result count {} exceeds ceiling {}",
                self.max_num_results, RESULT_LIMIT_CEILING
            )));
        }

        if self.default_num_results > self.max_num_results {
            return Err(GameLensError::config(format!(
                "Default result count {} exceeds maximum {}",
                self.default_num_results, self.max_num_results
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_num_results, 10);
        assert_eq!(config.max_num_results, 100);
        assert_eq!(config.ranking_strategy, RankingStrategy::Index);
        assert_eq!(config.embedding_instruction, DEFAULT_INSTRUCTION);
    }

    #[test]
    fn test_clamp_num_results() {
        let config = AppConfig::default();
        assert_eq!(config.clamp_num_results(None), 10);
        assert_eq!(config.clamp_num_results(Some(0)), 0);
        assert_eq!(config.clamp_num_results(Some(25)), 25);
        assert_eq!(config.clamp_num_results(Some(1000)), 100);
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.embedding_model = String::new();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.scan_page_size = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.default_num_results = 200;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_max_results() {
        let mut config = AppConfig::default();
        config.max_num_results = RESULT_LIMIT_CEILING;
        assert!(config.validate().is_ok());

        config.max_num_results = usize::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_ranking_strategy() {
        assert_eq!("index".parse::<RankingStrategy>().unwrap(), RankingStrategy::Index);
        assert_eq!(" Exhaustive ".parse::<RankingStrategy>().unwrap(), RankingStrategy::Exhaustive);
        assert!("brute".parse::<RankingStrategy>().is_err());
        assert_eq!(RankingStrategy::Exhaustive.to_string(), "exhaustive");
    }
}
