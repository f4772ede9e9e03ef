use anyhow::{Context, Result};
use std::time::Duration;

// --- Endpoint configuration ---

// Fallback webhooks from the original deployment; override via environment.
const DEFAULT_TEXT_ENDPOINT: &str =
    "https://n8n.vtriadi.site/webhook/b2a306fa-3a35-4c34-8009-1ee5b4130761";
const DEFAULT_IMAGE_ENDPOINT: &str =
    "https://n8n.vtriadi.site/webhook/b4cba643-d1b2-46dd-a467-e08b19eb0b5e";

pub const TEXT_ENDPOINT_VAR: &str = "FRAUDGUARD_TEXT_WEBHOOK_URL";
pub const IMAGE_ENDPOINT_VAR: &str = "FRAUDGUARD_IMAGE_WEBHOOK_URL";
pub const TIMEOUT_VAR: &str = "FRAUDGUARD_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the relay sends its two request shapes. The URLs are opaque; the
/// client assumes nothing about the backend beyond the response contract.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub text_endpoint: String,
    pub image_endpoint: String,
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            text_endpoint: DEFAULT_TEXT_ENDPOINT.to_string(),
            image_endpoint: DEFAULT_IMAGE_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RelayConfig {
    /// Builds a config from environment variables, falling back to the
    /// defaults above. A present-but-unparsable timeout is an error rather
    /// than a silent fallback.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(TEXT_ENDPOINT_VAR) {
            log::debug!("Using text endpoint from {}", TEXT_ENDPOINT_VAR);
            config.text_endpoint = url;
        }
        if let Ok(url) = std::env::var(IMAGE_ENDPOINT_VAR) {
            log::debug!("Using image endpoint from {}", IMAGE_ENDPOINT_VAR);
            config.image_endpoint = url;
        }
        if let Ok(secs) = std::env::var(TIMEOUT_VAR) {
            let secs: u64 = secs.parse().context(format!(
                "Failed to parse '{}' as a whole number of seconds",
                TIMEOUT_VAR
            ))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_known_webhooks() {
        let config = RelayConfig::default();
        assert!(config.text_endpoint.starts_with("https://"));
        assert_ne!(config.text_endpoint, config.image_endpoint);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }
}
