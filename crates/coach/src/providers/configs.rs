/// Unified enum to wrap the supported upstream adapters
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    /// Native structured event stream (`event:` + `data:` blocks).
    Anthropic(AnthropicProviderConfig),
    /// Raw `data: <json>` line framing terminated by `[DONE]`.
    Sse(AnthropicProviderConfig),
}

#[derive(Debug, Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl ProviderConfig {
    pub fn upstream(&self) -> &AnthropicProviderConfig {
        match self {
            ProviderConfig::Anthropic(config) | ProviderConfig::Sse(config) => config,
        }
    }
}
