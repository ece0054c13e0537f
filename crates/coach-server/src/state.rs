use coach::providers::base::Provider;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared application state. Everything here is built once at startup and is
/// read-only afterwards; each relay owns its own buffers.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub system_prompt: Arc<str>,
    pub idle_timeout: Duration,
    /// Cancelled on shutdown; every relay runs under a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn Provider>,
        system_prompt: impl Into<Arc<str>>,
        idle_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            idle_timeout,
            shutdown,
        }
    }
}
