use coach::prompt_template::PromptError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid system prompt template: {0}")]
    Prompt(#[from] PromptError),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a configuration key to the environment variable that sets it.
///
/// Bare field names come from serde's "missing field" errors, which only ever fire
/// for the provider table since every other section has defaults.
pub fn to_env_var(field: &str) -> String {
    let key = if field.contains('.') {
        field.to_string()
    } else {
        format!("provider.{}", field)
    };
    format!("COACH_{}", key.replace('.', "__").to_uppercase())
}
