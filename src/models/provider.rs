//! Model providers

use std::fmt;
use std::str::FromStr;

use crate::errors::AssistantError;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Groq,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Groq => "groq",
            Provider::Ollama => "ollama",
        }
    }

    /// Base URL for chat and embedding endpoints
    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => OPENAI_BASE_URL,
            Provider::Groq => GROQ_BASE_URL,
            Provider::Ollama => DEFAULT_OLLAMA_URL,
        }
    }

    /// Environment key name the provider authenticates with
    pub fn api_key_name(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
            Provider::Ollama => None,
        }
    }

    /// Whether the provider speaks the OpenAI wire format
    pub fn is_openai_compatible(&self) -> bool {
        matches!(self, Provider::OpenAi | Provider::Groq)
    }
}

impl FromStr for Provider {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "groq" => Ok(Provider::Groq),
            "ollama" => Ok(Provider::Ollama),
            other => Err(AssistantError::ModelInit {
                provider: other.to_string(),
                reason: "unknown provider (expected openai, groq, or ollama)".to_string(),
            }),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" Groq ".parse::<Provider>().unwrap(), Provider::Groq);
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::Ollama);
        assert!("gemini".parse::<Provider>().is_err());
    }

    #[test]
    fn test_key_names_follow_provider() {
        assert_eq!(Provider::OpenAi.api_key_name(), Some("OPENAI_API_KEY"));
        assert_eq!(Provider::Groq.api_key_name(), Some("GROQ_API_KEY"));
        assert_eq!(Provider::Ollama.api_key_name(), None);
    }

    #[test]
    fn test_wire_format_selection() {
        assert!(Provider::OpenAi.is_openai_compatible());
        assert!(Provider::Groq.is_openai_compatible());
        assert!(!Provider::Ollama.is_openai_compatible());
    }
}
