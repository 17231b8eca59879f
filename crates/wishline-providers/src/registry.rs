//! Provider registry: maps provider names to endpoint configurations.
//!
//! The unified `OpenAiCompatibleGenerator` uses these entries to talk to any
//! compatible API; providers differ only in endpoint, auth style, and which
//! environment variables hold the key.

/// How to attach auth credentials to requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// No authentication required (local servers).
    None,
}

/// Configuration for a single provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub name: &'static str,
    /// Base URL for the API.
    pub base_url: &'static str,
    /// Path for chat completions (appended to base_url).
    pub chat_path: &'static str,
    /// Environment variable names to try for the API key (in order).
    pub env_keys: &'static [&'static str],
    /// How to send auth credentials.
    pub auth_style: AuthStyle,
    /// Environment variable to override the base URL (e.g., OLLAMA_HOST).
    pub base_url_env: Option<&'static str>,
}

/// All known providers.
static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        chat_path: "/chat/completions",
        env_keys: &["OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: Some("OPENAI_API_BASE"),
    },
    ProviderConfig {
        name: "openrouter",
        base_url: "https://openrouter.ai/api/v1",
        chat_path: "/chat/completions",
        env_keys: &["OPENROUTER_API_KEY", "OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "deepseek",
        base_url: "https://api.deepseek.com",
        chat_path: "/chat/completions",
        env_keys: &["DEEPSEEK_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "gemini",
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
        chat_path: "/chat/completions",
        env_keys: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "groq",
        base_url: "https://api.groq.com/openai/v1",
        chat_path: "/chat/completions",
        env_keys: &["GROQ_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "mistral",
        base_url: "https://api.mistral.ai/v1",
        chat_path: "/chat/completions",
        env_keys: &["MISTRAL_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "ollama",
        base_url: "http://localhost:11434/v1",
        chat_path: "/chat/completions",
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("OLLAMA_HOST"),
    },
];

/// Look up a provider config by name.
pub fn get_provider_config(name: &str) -> Option<&'static ProviderConfig> {
    // Also match aliases
    let lookup = match name {
        "google" => "gemini",
        "together_ai" | "togetherai" => "openrouter",
        other => other,
    };
    PROVIDERS.iter().find(|p| p.name == lookup)
}

/// List all known provider names.
pub fn all_provider_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}
