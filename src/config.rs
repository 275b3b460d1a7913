use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    decoder::{DecodeRule, DEFAULT_XOR_KEY},
    errors::{ResolveError, ResolveResult},
    extractor::DEFAULT_SCRIPT_MARKER,
    utils::{self, DEFAULT_TIMEOUT},
};

pub const EMBED_URL: &str = "https://vidsrc-embed.ru";
pub const RELAY_URL: &str = "https://cloudnestra.com";

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub primary: DecodeRule,
    pub fallback: Option<DecodeRule>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            primary: DecodeRule::StrideBase64,
            fallback: Some(DecodeRule::hex_xor(DEFAULT_XOR_KEY)),
        }
    }
}

impl DecoderConfig {
    pub fn rules(&self) -> impl Iterator<Item = &DecodeRule> {
        std::iter::once(&self.primary).chain(self.fallback.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Host serving the entry embed pages.
    pub embed_base: String,
    /// Host the player iframe points at; its scheme completes scheme-relative urls.
    pub relay_base: String,
    /// Per request timeout, in seconds. Zero falls back to the default.
    pub timeout_secs: u64,
    /// Path segment identifying the player decoder script on the stage-2 page.
    pub script_marker: String,
    /// Upper bound for fetching and persisting the decoder script, in
    /// milliseconds. Never longer than the request timeout.
    pub script_timeout_ms: u64,
    pub decoder: DecoderConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            embed_base: EMBED_URL.into(),
            relay_base: RELAY_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            script_marker: DEFAULT_SCRIPT_MARKER.into(),
            script_timeout_ms: SCRIPT_TIMEOUT.as_millis() as u64,
            decoder: DecoderConfig::default(),
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            warn!("[resolver] zero request timeout configured, using {DEFAULT_TIMEOUT:?}");
            return DEFAULT_TIMEOUT;
        }
        Duration::from_secs(self.timeout_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        let bound = match self.script_timeout_ms {
            0 => SCRIPT_TIMEOUT,
            ms => Duration::from_millis(ms),
        };
        bound.min(self.timeout())
    }

    pub fn embed_url(&self) -> ResolveResult<Url> {
        parse_base("embed_base", &self.embed_base)
    }

    pub fn relay_url(&self) -> ResolveResult<Url> {
        parse_base("relay_base", &self.relay_base)
    }
}

/// Configured hosts must be absolute http(s) urls.
pub fn parse_base(field: &'static str, value: &str) -> ResolveResult<Url> {
    if !utils::text::is_absolute_http_url(value) {
        return Err(ResolveError::invalid_config(field, value));
    }

    Url::parse(value.trim()).map_err(|_| ResolveError::invalid_config(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_ten_second_timeout() {
        let config = ResolverConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.embed_base, EMBED_URL);
    }

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let config: ResolverConfig = serde_json::from_str(
            r#"{"embed_base":"https://vidsrc.net","decoder":{"fallback":null}}"#,
        )
        .unwrap();

        assert_eq!(config.embed_base, "https://vidsrc.net");
        assert_eq!(config.relay_base, RELAY_URL);
        assert_eq!(config.decoder.primary, DecodeRule::StrideBase64);
        assert_eq!(config.decoder.fallback, None);
        assert_eq!(config.decoder.rules().count(), 1);
    }

    #[test]
    fn should_replace_zero_timeouts() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"timeout_secs":0,"script_timeout_ms":0}"#).unwrap();

        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.script_timeout(), SCRIPT_TIMEOUT);
    }

    #[test]
    fn should_cap_script_timeout_at_request_timeout() {
        let config = ResolverConfig {
            timeout_secs: 1,
            script_timeout_ms: 60_000,
            ..Default::default()
        };
        assert_eq!(config.script_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn should_reject_invalid_bases_as_input_errors() {
        let config = ResolverConfig {
            embed_base: "vidsrc-embed.ru".into(),
            relay_base: "ftp://cloudnestra.com".into(),
            ..Default::default()
        };

        let err = config.embed_url().unwrap_err();
        assert_eq!(
            err,
            ResolveError::InvalidConfig {
                field: "embed_base",
                value: "vidsrc-embed.ru".into()
            }
        );
        assert_eq!(err.kind(), crate::errors::ErrorKind::InvalidInput);
        assert!(!err.is_shape_change());

        assert!(matches!(
            config.relay_url(),
            Err(ResolveError::InvalidConfig {
                field: "relay_base",
                ..
            })
        ));
        assert_eq!(
            ResolverConfig::default().relay_url().unwrap().as_str(),
            "https://cloudnestra.com/"
        );
    }

    #[test]
    fn should_try_primary_first() {
        let rules: Vec<_> = DecoderConfig::default().rules().cloned().collect();
        assert_eq!(
            rules,
            vec![DecodeRule::StrideBase64, DecodeRule::hex_xor(DEFAULT_XOR_KEY)]
        );
    }
}
