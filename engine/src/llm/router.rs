//! LLM Router
//!
//! The single entry point for the generation collaborator. The router holds
//! the configured providers, orders them with the configured default first,
//! and for each call:
//!
//! 1. bounds every attempt with the configured timeout,
//! 2. retries a rate-limited provider with a linearly growing delay,
//! 3. fails over to the next provider on any other error,
//! 4. skips providers without structured-output support for schema requests.

use super::{
    GenerationRequest, LLMError, LLMProvider, LLMResponse, Message, OutputSchema, Result,
};
use crate::config::LLMConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// LLM Router that calls providers with timeout, retry and failover
pub struct LLMRouter {
    /// Available LLM providers
    providers: Vec<Box<dyn LLMProvider>>,

    /// LLM configuration
    config: Arc<LLMConfig>,
}

impl LLMRouter {
    /// Create a new LLM router
    ///
    /// # Arguments
    /// * `providers` - List of available LLM providers
    /// * `config` - LLM configuration
    pub fn new(providers: Vec<Box<dyn LLMProvider>>, config: Arc<LLMConfig>) -> Self {
        Self { providers, config }
    }

    /// Timeout of a single provider attempt
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Delay before retry number `attempt` (1-based) of a rate-limited call
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_base_delay_ms.saturating_mul(attempt as u64))
    }

    /// Worst-case wall time of one `call`: every provider used up to
    /// `max_retries + 1` times at the full timeout, plus every backoff delay
    pub fn call_budget(&self) -> Duration {
        let providers = self.providers.len().max(1) as u32;
        let attempts = self.config.max_retries.saturating_add(1);
        let backoff: Duration = (1..=self.config.max_retries)
            .map(|attempt| self.retry_delay(attempt))
            .sum();

        self.timeout()
            .saturating_mul(attempts)
            .saturating_add(backoff)
            .saturating_mul(providers)
    }

    /// Order providers for a request: the configured default first, the rest
    /// in registration order. Schema requests only see providers that
    /// support structured output.
    pub fn rank_providers(&self, structured: bool) -> Vec<&dyn LLMProvider> {
        let mut providers: Vec<&dyn LLMProvider> = self
            .providers
            .iter()
            .map(|b| b.as_ref())
            .filter(|p| !structured || p.supports_structured_output())
            .collect();

        let default_provider = self.config.default_provider.as_str();
        providers.sort_by_key(|p| p.name() != default_provider);

        providers
    }

    /// Call LLM providers with automatic retry and failover
    ///
    /// Returns the response together with the name of the provider that
    /// produced it. When every provider fails, `AllProvidersExhausted` wraps
    /// the last provider error.
    pub async fn call(&self, request: &GenerationRequest) -> Result<(LLMResponse, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No LLM providers configured".to_string(),
            ));
        }

        let structured = request.schema.is_some();
        let ranked_providers = self.rank_providers(structured);

        if ranked_providers.is_empty() {
            return Err(LLMError::StructuredOutputUnsupported(
                "all configured providers".to_string(),
            ));
        }

        let timeout = self.timeout();
        let mut last_error = LLMError::ProviderUnavailable("All LLM providers failed".to_string());

        for provider in ranked_providers {
            let mut attempt: u32 = 0;

            loop {
                attempt += 1;
                debug!(
                    "Attempting provider: {} (attempt {}, timeout: {}s)",
                    provider.name(),
                    attempt,
                    timeout.as_secs()
                );

                let result = tokio::time::timeout(timeout, provider.generate(request)).await;

                match result {
                    Ok(Ok(response)) => {
                        info!("Provider {} succeeded", provider.name());
                        return Ok((response, provider.name().to_string()));
                    }
                    Ok(Err(LLMError::RateLimitExceeded)) if attempt <= self.config.max_retries => {
                        let delay = self.retry_delay(attempt);
                        warn!(
                            "Provider {} rate limited, retrying in {}ms ({}/{})",
                            provider.name(),
                            delay.as_millis(),
                            attempt,
                            self.config.max_retries
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Ok(Err(e)) => {
                        warn!("Provider {} failed: {}", provider.name(), e);
                        last_error = e;
                        break;
                    }
                    Err(_) => {
                        warn!(
                            "Provider {} timed out after {}s",
                            provider.name(),
                            timeout.as_secs()
                        );
                        last_error = LLMError::Timeout;
                        break;
                    }
                }
            }
        }

        error!("All LLM providers exhausted: {}", last_error);
        Err(LLMError::AllProvidersExhausted(Box::new(last_error)))
    }

    /// Free-text generation
    pub async fn generate_text(&self, messages: Vec<Message>) -> Result<String> {
        let (response, _provider) = self.call(&GenerationRequest::text(messages)).await?;
        Ok(response.into_text())
    }

    /// Structured generation validated against `schema`
    ///
    /// Providers that ignore the schema and answer in text are still accepted
    /// when the text parses as JSON.
    pub async fn generate_structured(
        &self,
        messages: Vec<Message>,
        schema: OutputSchema,
    ) -> Result<serde_json::Value> {
        let (response, provider) = self
            .call(&GenerationRequest::structured(messages, schema))
            .await?;

        match response {
            LLMResponse::Structured(value) => Ok(value),
            LLMResponse::Text(text) => super::parse_json_lenient(&text).ok_or_else(|| {
                LLMError::ParseError(format!("{} returned non-JSON structured output", provider))
            }),
        }
    }

    /// Check the health of all registered providers
    /// Returns a list of (provider_name, is_healthy)
    pub async fn check_health(&self) -> Vec<(&str, bool)> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let is_healthy = provider.check_health().await;
            results.push((provider.name(), is_healthy));
        }
        results
    }
}
