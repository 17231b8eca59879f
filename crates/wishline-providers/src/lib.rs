//! # Wishline Providers
//!
//! Greeting text generation. All OpenAI-compatible APIs (OpenAI, OpenRouter,
//! DeepSeek, Gemini, Groq, Mistral, Ollama) are handled by a single
//! `OpenAiCompatibleGenerator` over a static registry; the `fallback` module
//! holds the hardcoded greeting table used when generation fails.

pub mod fallback;
pub mod openai_compatible;
pub mod registry;

use wishline_core::config::LlmConfig;
use wishline_core::error::{Result, WishlineError};
use wishline_core::traits::GreetingGenerator;

/// Create a generator from configuration.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn GreetingGenerator>> {
    match config.provider.as_str() {
        // Custom endpoint: "custom:https://my-server.com/v1"
        other if other.starts_with("custom:") => Ok(Box::new(
            openai_compatible::OpenAiCompatibleGenerator::custom(other, config)?,
        )),
        name => {
            let registry = registry::get_provider_config(name)
                .ok_or_else(|| WishlineError::ProviderNotFound(name.into()))?;
            Ok(Box::new(
                openai_compatible::OpenAiCompatibleGenerator::from_registry(registry, config)?,
            ))
        }
    }
}

/// List all available provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = registry::all_provider_names();
    names.push("custom");
    names
}
