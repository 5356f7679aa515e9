use serde::{Deserialize, Serialize};

/// Ollama embeddings request
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    /// Model name (e.g., "nomic-embed-text")
    pub model: String,

    /// Instruction and query text, already joined
    pub prompt: String,
}

/// Ollama embeddings response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// Embedding vector
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Join an instruction and query the way the embedding model expects them
pub fn instructed_prompt(instruction: &str, text: &str) -> String {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        text.trim().to_string()
    } else {
        format!("{} {}", instruction, text.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructed_prompt() {
        assert_eq!(
            instructed_prompt("Represent a game:", "  space trading sim "),
            "Represent a game: space trading sim"
        );
        assert_eq!(instructed_prompt("   ", "roguelike"), "roguelike");
    }

    #[test]
    fn test_embed_response_missing_embedding() {
        let response: EmbedResponse = serde_json::from_str("{}").unwrap();
        assert!(response.embedding.is_empty());
    }
}
