use kasa_core::Config;
use std::sync::Arc;

use crate::{GeminiProvider, Provider};

/// Infer the provider name from the model string prefix.
/// Returns None when the prefix is not recognized.
pub fn infer_provider_from_model(model: &str) -> Option<&'static str> {
    if model.starts_with("gemini/") || model.starts_with("gemini-") {
        Some("gemini")
    } else {
        None
    }
}

/// Unified provider construction entry point.
///
/// Resolution order:
/// 1. `config.agent.provider` when set explicitly
/// 2. model string prefix (e.g. "gemini-2.5-flash" → gemini)
pub fn create_provider(config: &Config) -> anyhow::Result<Arc<dyn Provider>> {
    let model = &config.agent.model;

    let effective_provider: &str = if let Some(ep) = config.agent.provider.as_deref() {
        ep
    } else if let Some(inferred) = infer_provider_from_model(model) {
        inferred
    } else {
        return Err(anyhow::anyhow!(
            "No LLM provider configured. Set 'provider' in the agent config section \
             or use a recognized model prefix (e.g. 'gemini-...')."
        ));
    };

    match effective_provider {
        "gemini" => {
            let provider_cfg = config.get_provider("gemini").ok_or_else(|| {
                anyhow::anyhow!("Provider 'gemini' not found in providers section")
            })?;
            if provider_cfg.api_key.is_empty() {
                return Err(anyhow::anyhow!(
                    "Provider 'gemini' has no API key. Set providers.gemini.apiKey \
                     in the config file or export GEMINI_API_KEY."
                ));
            }
            Ok(Arc::new(GeminiProvider::new(
                &provider_cfg.api_key,
                provider_cfg.api_base.as_deref(),
                model,
                config.agent.max_tokens,
                config.agent.temperature,
            )))
        }
        other => Err(anyhow::anyhow!("Unknown provider '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_provider_from_model() {
        assert_eq!(infer_provider_from_model("gemini-2.5-flash"), Some("gemini"));
        assert_eq!(infer_provider_from_model("gemini/gemini-2.5-flash"), Some("gemini"));
        assert_eq!(infer_provider_from_model("gpt-4o"), None);
    }

    #[test]
    fn test_create_provider_requires_api_key() {
        let config = Config::default();
        let err = match create_provider(&config) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("no API key"));
    }

    #[test]
    fn test_create_provider_with_key() {
        let mut config = Config::default();
        config.providers.get_mut("gemini").unwrap().api_key = "test-key".to_string();
        assert!(create_provider(&config).is_ok());
    }

    #[test]
    fn test_create_provider_unknown_model_prefix() {
        let mut config = Config::default();
        config.agent.model = "claude-sonnet-4".to_string();
        let err = match create_provider(&config) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("No LLM provider configured"));
    }
}
