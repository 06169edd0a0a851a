//! Generation collaborator for kbchat.
//!
//! A provider-agnostic chat interface over Large Language Models.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI-compatible**: any `/chat/completions` endpoint
//!
//! # Example
//! ```no_run
//! use kbchat_llm::{ChatMessage, LlmClient, LlmRequest, OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::user("Hello, world!")], "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmUsage, Role};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
