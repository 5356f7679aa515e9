pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, RankingStrategy, DEFAULT_INSTRUCTION, RESULT_LIMIT_CEILING};
pub use error::GameLensError;
pub type Result<T> = std::result::Result<T, GameLensError>;
