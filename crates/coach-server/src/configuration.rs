use crate::error::{to_env_var, ConfigError};
use coach::knowledge;
use coach::providers::configs::{AnthropicProviderConfig, ProviderConfig};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    Anthropic {
        #[serde(default = "default_anthropic_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
        #[serde(default)]
        temperature: Option<f32>,
    },
    Sse {
        #[serde(default = "default_anthropic_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
        #[serde(default)]
        temperature: Option<f32>,
    },
}

impl ProviderSettings {
    // Convert to the coach ProviderConfig
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::Anthropic {
                host,
                api_key,
                model,
                max_tokens,
                temperature,
            } => ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key,
                model,
                max_tokens,
                temperature,
            }),
            ProviderSettings::Sse {
                host,
                api_key,
                model,
                max_tokens,
                temperature,
            } => ProviderConfig::Sse(AnthropicProviderConfig {
                host,
                api_key,
                model,
                max_tokens,
                temperature,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RelaySettings {
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    /// Replacement system prompt template; the bundled one is used when unset.
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            assistant_name: default_assistant_name(),
            prompt_file: None,
        }
    }
}

impl RelaySettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn system_prompt(&self) -> Result<String, ConfigError> {
        let prompt = match &self.prompt_file {
            Some(path) => knowledge::system_prompt_from_file(path, &self.assistant_name)?,
            None => knowledge::system_prompt(&self.assistant_name)?,
        };
        Ok(prompt)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub relay: RelaySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.type", "anthropic")?
            .set_default("provider.host", default_anthropic_host())?
            .set_default("provider.model", default_model())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("COACH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // Handle both NotFound and missing field message variants
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `api_key`", possibly followed by the key it was under
                    let field = error_str.split('`').nth(1).unwrap_or_default();
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "claude-haiku-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    1200
}

fn default_anthropic_host() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    120
}

fn default_assistant_name() -> String {
    knowledge::DEFAULT_ASSISTANT_NAME.to_string()
}
