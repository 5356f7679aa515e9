//! GameLens embedding source
//!
//! Query-length validation and an Ollama client for the external embedding model

mod client;
mod source;
mod tokens;
mod types;

pub use client::OllamaEmbedder;
pub use source::EmbeddingSource;
pub use tokens::approximate_token_count;
pub use types::{instructed_prompt, EmbedRequest, EmbedResponse};
