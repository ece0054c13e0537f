use std::sync::Arc;

use super::{
    anthropic::AnthropicProvider, base::Provider, configs::ProviderConfig, sse::SseProvider,
};
use crate::errors::ProviderResult;

/// Build the provider once at startup; callers share it for the process lifetime.
pub fn get_provider(config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
    match config {
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::Sse(sse_config) => Ok(Arc::new(SseProvider::new(sse_config)?)),
    }
}
