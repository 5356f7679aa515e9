use gamelens_common::GameLensError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable entity identifier (Steam appid)
pub type EntityId = u64;

/// Fixed-dimension embedding vector
pub type Embedding = Vec<f32>;

/// Which embedding family a query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Store description passages
    Description,
    /// User reviews
    Review,
    /// Both of the above
    All,
}

impl MatchType {
    /// Concrete types in merge order
    pub const CONCRETE: [MatchType; 2] = [MatchType::Description, MatchType::Review];

    /// Expand a query-shape selector into the concrete types it covers
    pub fn expand(self) -> &'static [MatchType] {
        match self {
            MatchType::Description => &[MatchType::Description],
            MatchType::Review => &[MatchType::Review],
            MatchType::All => &Self::CONCRETE,
        }
    }

    /// Whether this names a stored embedding family
    pub fn is_concrete(self) -> bool {
        !matches!(self, MatchType::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Description => "description",
            MatchType::Review => "review",
            MatchType::All => "all",
        }
    }
}

impl Default for MatchType {
    fn default() -> Self {
        MatchType::All
    }
}

impl FromStr for MatchType {
    type Err = GameLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(MatchType::All),
            "description" => Ok(MatchType::Description),
            "review" => Ok(MatchType::Review),
            _ => Err(GameLensError::invalid_input(
                "Invalid type, must be one of: all, description, review",
            )),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    /// Entity id
    pub appid: EntityId,

    /// Display name, resolved after ranking
    pub name: Option<String>,

    /// Concrete type that produced this match
    pub match_type: MatchType,

    /// Similarity (higher is more similar)
    pub score: f32,
}

impl ScoredMatch {
    pub fn new(appid: EntityId, match_type: MatchType, score: f32) -> Self {
        Self {
            appid,
            name: None,
            match_type,
            score,
        }
    }
}
