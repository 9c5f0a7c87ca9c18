//! LLM provider abstraction and implementations.
//!
//! Provides a trait-based abstraction for LLM providers with typed
//! completion responses and a separate embedding trait for the clustering
//! subsystem. Both are OpenAI-compatible RPCs so the same client shape
//! works against OpenAI, Anthropic-compat gateways, and self-hosted models.

pub mod openai_compat;

use crate::error::LlmError;

/// Token usage information from an LLM completion.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the input/prompt.
    pub input_tokens: u32,
    /// Number of tokens in the output/completion.
    pub output_tokens: u32,
}

/// Response from an LLM completion request.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated text content. Expected to be a JSON object when the
    /// caller requested `response_format: json_object` (every pipeline node
    /// does).
    pub text: String,
    /// Token usage for this completion.
    pub usage: TokenUsage,
    /// The model that produced this response.
    pub model: String,
}

/// Parameters controlling LLM generation behavior.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = deterministic, 1.0+ = creative).
    pub temperature: f32,
    /// Whether to request a strict JSON object response.
    pub json_mode: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.3,
            json_mode: true,
        }
    }
}

/// Trait abstracting all LLM completion operations.
///
/// Object-safe for use as `Arc<dyn LlmProvider>`. Every pipeline node that
/// calls an LLM does so through this trait; nodes never see `reqwest`
/// directly.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the display name of this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Send a completion request to the LLM.
    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError>;

    /// Check if the provider is reachable and configured correctly.
    async fn health_check(&self) -> Result<(), LlmError>;
}

/// A single embedding vector with its position in the input batch.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// Index of the corresponding input string.
    pub index: u32,
    /// The embedding vector.
    pub vector: Vec<f32>,
}

/// Trait abstracting the embeddings RPC used by the clustering subsystem.
///
/// Peripheral to the core pipeline: only the clustering path (outside this
/// crate's scope) calls it, but the contract lives here alongside the
/// completion trait since both are the same kind of provider RPC.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of input strings, returning one vector per input.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Embedding>, LlmError>;
}
