//! Provider selection from the configured `<provider>/<model>` spec.

use std::sync::Arc;

use tracing::info;

use crate::config::ServiceConfig;
use crate::credentials::Credentials;

use super::ollama::OllamaProvider;
use super::openai::{OpenAiProvider, OPENAI_API_URL};
use super::LlmProvider;

/// Provider construction errors.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Model spec is not in `<provider>/<model>` format.
    #[error("invalid model spec '{spec}', expected '<provider>/<model>'")]
    InvalidModelSpec {
        /// Invalid raw spec.
        spec: String,
    },
    /// Unsupported provider type in spec prefix.
    #[error("unsupported provider '{provider}'")]
    UnsupportedProvider {
        /// Unsupported provider prefix.
        provider: String,
    },
    /// Required API credential missing for selected provider.
    #[error("missing credential for provider '{provider}': {key}")]
    MissingCredential {
        /// Provider name.
        provider: String,
        /// Missing credential key.
        key: String,
    },
}

/// A `<provider>/<model>` spec split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModelSpec {
    /// Provider prefix (`openai`, `ollama`).
    pub provider: String,
    /// Model name passed to the provider.
    pub model: String,
}

/// Split a model spec on its first `/`.
///
/// # Errors
///
/// Returns [`RouterError::InvalidModelSpec`] if either half is empty.
pub fn parse_model_spec(spec: &str) -> Result<ParsedModelSpec, RouterError> {
    let (provider, model) = spec.split_once('/').unwrap_or_default();
    if provider.is_empty() || model.is_empty() {
        return Err(RouterError::InvalidModelSpec {
            spec: spec.to_owned(),
        });
    }
    Ok(ParsedModelSpec {
        provider: provider.to_owned(),
        model: model.to_owned(),
    })
}

/// Instantiate the provider named by `service.model`.
///
/// # Errors
///
/// Returns an error for a malformed spec, an unknown provider, or a missing
/// API key for providers that need one.
pub fn build_provider(
    service: &ServiceConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn LlmProvider>, RouterError> {
    let parsed = parse_model_spec(&service.model)?;
    let provider: Arc<dyn LlmProvider> = match parsed.provider.as_str() {
        "openai" => {
            let api_key = credentials.api_key_for(service).map_err(|_| {
                RouterError::MissingCredential {
                    provider: parsed.provider.clone(),
                    key: service.api_key_env.clone(),
                }
            })?;
            let api_url = service
                .api_url
                .clone()
                .unwrap_or_else(|| OPENAI_API_URL.to_owned());
            Arc::new(OpenAiProvider::new(
                service.model.clone(),
                parsed.model.clone(),
                api_url,
                api_key,
            ))
        }
        "ollama" => Arc::new(OllamaProvider::new(
            service.model.clone(),
            parsed.model.clone(),
            service.api_url.clone(),
        )),
        other => {
            return Err(RouterError::UnsupportedProvider {
                provider: other.to_owned(),
            })
        }
    };
    info!(model = %service.model, "generation provider ready");
    Ok(provider)
}
