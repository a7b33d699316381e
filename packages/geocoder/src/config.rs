//! Geocoder configuration.
//!
//! Loaded once at startup and shared read-only afterwards. Three sources
//! are supported, checked in order by [`GeocoderConfig::from_env`]:
//!
//! 1. `GEOCODER_CONFIG`: path to a TOML file with the same layout as the
//!    embedded `config/default.toml`.
//! 2. `GEOCODER_PARAMS` + `GEOCODER_STRATEGIES`: a comma-separated field
//!    list and a JSON strategy list (`[{"name", "func", "params"}]`). All
//!    other settings come from the built-in defaults.
//! 3. The built-in configuration embedded at compile time.
//!
//! Any error is fatal to startup.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use solr_geocoder_models::StrategyDefinition;
use thiserror::Error;

/// Built-in configuration, embedded at compile time.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Keys the normalized result envelope already uses.
const RESERVED_NAMES: &[&str] = &["id", "quality", "distance_km", "solr_score", "score"];

/// Field and index names must be plain identifiers so they can be
/// interpolated into query syntax.
static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Errors from loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML config did not parse.
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// `GEOCODER_STRATEGIES` did not parse.
    #[error("Invalid GEOCODER_STRATEGIES JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The config parsed but is inconsistent.
    #[error("Invalid geocoder config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// Edismax tuning for the fuzzy query builder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FuzzyTuning {
    /// Phrase slop (`ps`).
    pub phrase_slop: u32,
    /// Minimum-should-match expression (`mm`).
    pub minimum_match: String,
    /// Tie-breaker weight (`tie`).
    pub tie_breaker: f64,
}

impl Default for FuzzyTuning {
    fn default() -> Self {
        Self {
            phrase_slop: 2,
            minimum_match: "2<75%".to_string(),
            tie_breaker: 0.1,
        }
    }
}

/// Row limits for forward geocoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ForwardLimits {
    /// Rows requested when the caller does not say.
    pub default_rows: u32,
    /// Upper bound on rows per request.
    pub max_rows: u32,
}

impl Default for ForwardLimits {
    fn default() -> Self {
        Self {
            default_rows: 10,
            max_rows: 10,
        }
    }
}

impl ForwardLimits {
    /// Clamps a caller-supplied row count into `1..=max_rows`.
    #[must_use]
    pub fn clamp(&self, requested: Option<i64>) -> u32 {
        requested.map_or(self.default_rows, |n| clamp_i64(n, 1, self.max_rows))
    }
}

/// Limits and index settings for reverse geocoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReverseLimits {
    /// Rows requested when the caller does not say.
    pub default_rows: u32,
    /// Lower bound on rows per request.
    pub min_rows: u32,
    /// Upper bound on rows per request.
    pub max_rows: u32,
    /// Radius used when the caller does not say, in kilometres.
    pub default_radius_km: f64,
    /// Name of the location field in the index.
    pub spatial_field: String,
}

impl Default for ReverseLimits {
    fn default() -> Self {
        Self {
            default_rows: 5,
            min_rows: 1,
            max_rows: 10,
            default_radius_km: 1000.0,
            spatial_field: "koordinate".to_string(),
        }
    }
}

impl ReverseLimits {
    /// Clamps a caller-supplied row count into `min_rows..=max_rows`.
    #[must_use]
    pub fn clamp(&self, requested: Option<i64>) -> u32 {
        requested.map_or(self.default_rows, |n| {
            clamp_i64(n, self.min_rows, self.max_rows)
        })
    }
}

fn clamp_i64(value: i64, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(i64::from(min), i64::from(max));
    u32::try_from(clamped).unwrap_or(min)
}

fn default_anchors() -> Vec<String> {
    vec!["plz".to_string(), "ort".to_string()]
}

/// Immutable geocoder configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocoderConfig {
    /// Recognized address fields, in query order.
    pub params: Vec<String>,
    /// Fields of which at least one must be present.
    #[serde(default = "default_anchors")]
    pub anchors: Vec<String>,
    /// Cascade strategies, tried in order.
    pub strategies: Vec<StrategyDefinition>,
    /// Fuzzy query tuning.
    #[serde(default)]
    pub fuzzy: FuzzyTuning,
    /// Forward row limits.
    #[serde(default)]
    pub forward: ForwardLimits,
    /// Reverse limits and spatial field.
    #[serde(default)]
    pub reverse: ReverseLimits,
}

impl GeocoderConfig {
    /// The configuration embedded at compile time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded TOML is invalid.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the TOML does not parse or
    /// [`ConfigError::Invalid`] if it is inconsistent.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`GeocoderConfig::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Builds a configuration from the comma-separated parameter list and
    /// JSON strategy list used by the `GEOCODER_PARAMS` and
    /// `GEOCODER_STRATEGIES` environment variables.
    ///
    /// Anchors are the built-in anchors that appear in `params`; every other
    /// setting comes from the built-in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the strategies do not parse or
    /// [`ConfigError::Invalid`] if the result is inconsistent.
    pub fn from_params_and_strategies(
        params_raw: &str,
        strategies_raw: &str,
    ) -> Result<Self, ConfigError> {
        let params: Vec<String> = params_raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        let strategies: Vec<StrategyDefinition> = serde_json::from_str(strategies_raw)?;

        let builtin = Self::builtin()?;
        let anchors = builtin
            .anchors
            .into_iter()
            .filter(|a| params.contains(a))
            .collect();

        let config = Self {
            params,
            anchors,
            strategies,
            ..builtin
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from the environment (see the module docs).
    ///
    /// # Errors
    ///
    /// See [`GeocoderConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from variables resolved by `lookup`.
    ///
    /// `GEOCODER_CONFIG` wins over the `GEOCODER_PARAMS`/`GEOCODER_STRATEGIES`
    /// pair, which wins over the built-in set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the selected source is unreadable or
    /// invalid, or if only one of `GEOCODER_PARAMS`/`GEOCODER_STRATEGIES`
    /// is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(path) = lookup("GEOCODER_CONFIG") {
            log::info!("Loading geocoder config from {path}");
            return Self::from_file(Path::new(&path));
        }

        match (lookup("GEOCODER_PARAMS"), lookup("GEOCODER_STRATEGIES")) {
            (Some(params), Some(strategies)) => {
                log::info!("Loading geocoder config from GEOCODER_PARAMS/GEOCODER_STRATEGIES");
                Self::from_params_and_strategies(&params, &strategies)
            }
            (Some(_), None) => Err(invalid(
                "GEOCODER_PARAMS is set but GEOCODER_STRATEGIES is not",
            )),
            (None, Some(_)) => Err(invalid(
                "GEOCODER_STRATEGIES is set but GEOCODER_PARAMS is not",
            )),
            (None, None) => {
                log::info!("Using built-in geocoder config");
                Self::builtin()
            }
        }
    }

    /// Checks every cross-field invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_params()?;
        self.validate_strategies()?;
        self.validate_limits()
    }

    fn validate_params(&self) -> Result<(), ConfigError> {
        if self.params.is_empty() {
            return Err(invalid("params must not be empty"));
        }

        let mut seen = BTreeSet::new();
        for param in &self.params {
            if !IDENTIFIER_RE.is_match(param) {
                return Err(invalid(format!("param {param:?} is not a valid field name")));
            }
            if RESERVED_NAMES.contains(&param.as_str()) {
                return Err(invalid(format!("param {param:?} is a reserved name")));
            }
            if !seen.insert(param.as_str()) {
                return Err(invalid(format!("duplicate param {param:?}")));
            }
        }

        if self.anchors.is_empty() {
            return Err(invalid("at least one anchor field is required"));
        }
        if let Some(anchor) = self.anchors.iter().find(|a| !self.params.contains(a)) {
            return Err(invalid(format!("anchor {anchor:?} is not a configured param")));
        }

        Ok(())
    }

    fn validate_strategies(&self) -> Result<(), ConfigError> {
        if self.strategies.is_empty() {
            return Err(invalid("at least one strategy is required"));
        }

        let mut names = BTreeSet::new();
        for strategy in &self.strategies {
            let name = strategy.name.trim();
            if name.is_empty() {
                return Err(invalid("strategy name must not be empty"));
            }
            if !names.insert(name) {
                return Err(invalid(format!("duplicate strategy {name:?}")));
            }
            if strategy.fields.is_empty() {
                return Err(invalid(format!("strategy {name:?} uses no fields")));
            }
            if let Some(field) = strategy.fields.iter().find(|f| !self.params.contains(f)) {
                return Err(invalid(format!(
                    "strategy {name:?} uses unknown field {field:?}"
                )));
            }
            if strategy.row_limit == Some(0) {
                return Err(invalid(format!("strategy {name:?} has a zero row_limit")));
            }
        }

        Ok(())
    }

    fn validate_limits(&self) -> Result<(), ConfigError> {
        let fuzzy = &self.fuzzy;
        if fuzzy.minimum_match.trim().is_empty() {
            return Err(invalid("fuzzy.minimum_match must not be empty"));
        }
        if !(0.0..=1.0).contains(&fuzzy.tie_breaker) {
            return Err(invalid("fuzzy.tie_breaker must be between 0 and 1"));
        }

        let forward = self.forward;
        if forward.default_rows < 1 || forward.default_rows > forward.max_rows {
            return Err(invalid(
                "forward limits must satisfy 1 <= default_rows <= max_rows",
            ));
        }

        let reverse = &self.reverse;
        if reverse.min_rows < 1
            || reverse.min_rows > reverse.default_rows
            || reverse.default_rows > reverse.max_rows
        {
            return Err(invalid(
                "reverse limits must satisfy 1 <= min_rows <= default_rows <= max_rows",
            ));
        }
        if !(reverse.default_radius_km.is_finite() && reverse.default_radius_km > 0.0) {
            return Err(invalid("reverse.default_radius_km must be positive"));
        }
        if !IDENTIFIER_RE.is_match(&reverse.spatial_field) {
            return Err(invalid(format!(
                "reverse.spatial_field {:?} is not a valid field name",
                reverse.spatial_field
            )));
        }

        Ok(())
    }
}
