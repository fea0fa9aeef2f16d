//! Flat, serialisable policy configuration.
//!
//! Hosts that load settings from a file or pass them across a binding layer describe the
//! policy with plain integers and names; [`PolicyConfig`] converts into a validated
//! [`EnginePolicy`] through the builder. All curves are exponential.
//!
//! With the `serde` feature:
//! ```rust,ignore
//! let cfg: PolicyConfig = serde_json::from_str(r#"{ "jitter": "equal" }"#)?;
//! let policy = EnginePolicy::try_from(cfg)?;
//! ```

use crate::classify::StatusMapping;
use crate::policy::{BuildError, EnginePolicy};
use crate::Backoff;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PolicyConfig {
    pub network_base_ms: u64,
    pub network_ceiling_ms: u64,
    pub timeout_base_ms: u64,
    pub timeout_ceiling_ms: u64,
    pub rate_limit_base_ms: u64,
    pub rate_limit_ceiling_ms: u64,
    /// `none`, `full`, or `equal`.
    pub jitter: String,
    pub max_retry_after_ms: u64,
    /// Reclassify raw `HttpStatus(429)` as a rate limit.
    pub reclassify_http_status: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            network_base_ms: 200,
            network_ceiling_ms: 30_000,
            timeout_base_ms: 500,
            timeout_ceiling_ms: 30_000,
            rate_limit_base_ms: 1_500,
            rate_limit_ceiling_ms: 120_000,
            jitter: "none".to_string(),
            max_retry_after_ms: 120_000,
            reclassify_http_status: false,
        }
    }
}

fn curve(base_ms: u64, ceiling_ms: u64) -> Result<Backoff, BuildError> {
    Ok(Backoff::exponential(Duration::from_millis(base_ms))
        .with_ceiling(Duration::from_millis(ceiling_ms))?)
}

impl TryFrom<PolicyConfig> for EnginePolicy {
    type Error = BuildError;

    fn try_from(cfg: PolicyConfig) -> Result<Self, Self::Error> {
        let mapping = if cfg.reclassify_http_status {
            StatusMapping::Inspect
        } else {
            StatusMapping::PreClassified
        };
        EnginePolicy::builder()
            .network_backoff(curve(cfg.network_base_ms, cfg.network_ceiling_ms)?)
            .timeout_backoff(curve(cfg.timeout_base_ms, cfg.timeout_ceiling_ms)?)
            .rate_limit_backoff(curve(cfg.rate_limit_base_ms, cfg.rate_limit_ceiling_ms)?)
            .with_jitter(cfg.jitter.parse()?)
            .max_retry_after(Duration::from_millis(cfg.max_retry_after_ms))
            .status_mapping(mapping)
            .build()
    }
}
