/// GameLens error types
#[derive(Debug, thiserror::Error)]
pub enum GameLensError {
    /// Aggregation or max-over-set attempted on zero vectors
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Vectors of differing dimensionality presented for comparison
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Degenerate embedding with zero norm
    #[error("Zero-norm vector: {0}")]
    ZeroVector(String),

    /// Query plus instruction exceed the embedding model's token limit
    #[error("Query too long: {tokens} tokens exceeds limit of {limit}, shorten query or instruction")]
    QueryTooLong { tokens: usize, limit: usize },

    /// No usable ANN index snapshot
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Index snapshot incompatible with similarity scoring
    #[error("Index configuration error: {0}")]
    IndexConfig(String),

    /// Embedding backend error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Scan cancelled between pages
    #[error("Search cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GameLensError {
    /// Create empty input error
    pub fn empty_input<S: Into<String>>(msg: S) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Create dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create zero vector error
    pub fn zero_vector<S: Into<String>>(msg: S) -> Self {
        Self::ZeroVector(msg.into())
    }

    /// Create index unavailable error
    pub fn index_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::IndexUnavailable(msg.into())
    }

    /// Create index configuration error
    pub fn index_config<S: Into<String>>(msg: S) -> Self {
        Self::IndexConfig(msg.into())
    }

    /// Create embedding error
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

// Status mapping for whichever transport layer sits in front of the engine
impl GameLensError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::QueryTooLong { .. } => 400,
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Embedding(_) => 503,
            Self::Cancelled => 499,
            Self::EmptyInput(_) => 500,
            Self::DimensionMismatch { .. } => 500,
            Self::ZeroVector(_) => 500,
            Self::IndexUnavailable(_) => 500,
            Self::IndexConfig(_) => 500,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
            Self::Io(_) => 500,
            Self::Json(_) => 500,
            Self::Other(_) => 500,
        }
    }

    /// Whether a request-level caller can skip the offending candidate
    pub fn is_skippable_candidate(&self) -> bool {
        matches!(self, Self::ZeroVector(_) | Self::EmptyInput(_))
    }
}
