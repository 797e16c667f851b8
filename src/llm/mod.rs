//! LLM module - hosted model integrations
//!
//! Provides the provider abstraction with Groq as the primary backend.

pub mod groq;
pub mod traits;

pub use groq::GroqClient;
pub use traits::{ModelProvider, ModelReply};
