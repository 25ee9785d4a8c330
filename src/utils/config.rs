//! Configuration and constants for the tracer.

use super::error::ConfigError;
use log::{debug, warn};

/// Environment variable that enables recording (integer > 0 enables)
pub const ENABLE_ENV_VAR: &str = "SPIKE_TRACE";

/// Environment variable overriding the number of roots reported per metric
pub const TOP_K_ENV_VAR: &str = "SPIKE_TRACE_TOP_K";

/// Number of roots reported per metric when nothing else is configured
pub const DEFAULT_TOP_K: usize = 10;
pub const MAX_TOP_K: usize = 1000;

// Report layout
pub const SPACER_COL: usize = 60; // stat column starts here
pub const BANNER_WIDTH: usize = 80;
pub const ROOT_CHILD_INDENT_UNITS: usize = 3; // children of a root sit three indents in

/// Tracer settings, normally read once from the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracerConfig {
    /// Record spans; when false every scope is a no-op
    pub enabled: bool,

    /// Number of distinct roots reported per metric
    pub top_k: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl TracerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    ///
    /// Unset variables keep their defaults. The enable toggle accepts any
    /// integer; values greater than zero turn recording on. An unusable
    /// top-k is reported and replaced by the default without touching the
    /// toggle; only an unreadable toggle is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENABLE_ENV_VAR) {
            let level: i64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: ENABLE_ENV_VAR,
                value: raw.clone(),
            })?;
            config.enabled = level > 0;
        }

        if let Some(raw) = lookup(TOP_K_ENV_VAR) {
            match parse_top_k(&raw) {
                Ok(top_k) => config.top_k = top_k,
                Err(e) => {
                    warn!("Ignoring {}: {}; using {}", TOP_K_ENV_VAR, e, config.top_k);
                    if config.enabled {
                        eprintln!(
                            "spike-trace: ignoring {}: {}; reporting top {}",
                            TOP_K_ENV_VAR, e, config.top_k
                        );
                    }
                }
            }
        }

        debug!("Loaded tracer config: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }

        if self.top_k > MAX_TOP_K {
            return Err(ConfigError::TopKTooLarge(self.top_k));
        }

        Ok(())
    }
}

fn parse_top_k(raw: &str) -> Result<usize, ConfigError> {
    let top_k = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: TOP_K_ENV_VAR,
        value: raw.to_string(),
    })?;
    TracerConfig::new().with_top_k(top_k).validate()?;
    Ok(top_k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = TracerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, TracerConfig::default());
        assert!(!config.enabled);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
    }

    #[test]
    fn test_enable_toggle_levels() {
        let on = TracerConfig::from_lookup(lookup_from(&[(ENABLE_ENV_VAR, "2")])).unwrap();
        assert!(on.enabled);

        let off = TracerConfig::from_lookup(lookup_from(&[(ENABLE_ENV_VAR, "0")])).unwrap();
        assert!(!off.enabled);

        let negative = TracerConfig::from_lookup(lookup_from(&[(ENABLE_ENV_VAR, "-1")])).unwrap();
        assert!(!negative.enabled);
    }

    #[test]
    fn test_invalid_toggle() {
        let err = TracerConfig::from_lookup(lookup_from(&[(ENABLE_ENV_VAR, "yes")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: ENABLE_ENV_VAR,
                value: "yes".to_string()
            }
        );
    }

    #[test]
    fn test_top_k_override() {
        let config = TracerConfig::from_lookup(lookup_from(&[
            (ENABLE_ENV_VAR, "1"),
            (TOP_K_ENV_VAR, " 3 "),
        ]))
        .unwrap();
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_top_k_bounds() {
        assert_eq!(parse_top_k("0").unwrap_err(), ConfigError::ZeroTopK);
        assert_eq!(
            parse_top_k("5000").unwrap_err(),
            ConfigError::TopKTooLarge(5000)
        );

        let huge = TracerConfig::new().with_top_k(MAX_TOP_K + 1).validate();
        assert_eq!(huge.unwrap_err(), ConfigError::TopKTooLarge(MAX_TOP_K + 1));
    }

    #[test]
    fn test_bad_top_k_keeps_enable_flag() {
        for bad in ["5000", "abc", "0"] {
            let config = TracerConfig::from_lookup(lookup_from(&[
                (ENABLE_ENV_VAR, "1"),
                (TOP_K_ENV_VAR, bad),
            ]))
            .unwrap();
            assert!(config.enabled, "top_k={:?} disabled tracing", bad);
            assert_eq!(config.top_k, DEFAULT_TOP_K);
        }
    }
}
