//! Client configuration.

use crate::error::{CloudError, CloudResult};
use sealshare_crypto::{KekParams, RSA_MODULUS_BITS};
use serde::{Deserialize, Serialize};

/// Configuration for the SealShare client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Base URL for the metadata API (e.g., "https://api.sealshare.app/api").
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// KEK derivation parameters. Changing these makes previously published
    /// private keys unrecoverable.
    pub kek: KekParams,

    /// Modulus size for newly generated identity keys.
    pub rsa_modulus_bits: usize,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 30,
            kek: KekParams::default(),
            rsa_modulus_bits: RSA_MODULUS_BITS,
        }
    }
}

impl CloudConfig {
    /// Creates a config pointing at a local test server.
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Rejects settings the client cannot run with.
    pub fn validate(&self) -> CloudResult<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(CloudError::Config(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(CloudError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.rsa_modulus_bits < RSA_MODULUS_BITS {
            return Err(CloudError::Config(format!(
                "rsa_modulus_bits must be at least {RSA_MODULUS_BITS}, got {}",
                self.rsa_modulus_bits
            )));
        }
        self.kek
            .validate()
            .map_err(|e| CloudError::Config(e.to_string()))
    }

    /// Base URL with any trailing slash removed.
    pub(crate) fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
