//! LLM integration crate for the nameforge CLI.
//!
//! This crate provides a provider-agnostic abstraction for the external
//! text-generation API that enriches name records. Providers are reached
//! through a unified trait-based interface.
//!
//! # Providers
//! - **OpenAI**: chat completions (default)
//!
//! # Example
//! ```no_run
//! use nameforge_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("sk-...")?;
//! let request = LlmRequest::new("Analyze these names...", "gpt-4o-mini");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OpenAiClient;
pub use types::ProviderType;
