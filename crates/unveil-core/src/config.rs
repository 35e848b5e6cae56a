#![forbid(unsafe_code)]

//! Engine configuration (deterministic, env-overridable).
//!
//! [`EngineConfig`] holds the tunables shared by every component. Values come
//! from defaults, then environment variables (or any key/value lookup, such
//! as element data attributes), then optionally a JSON/TOML document with the
//! `policy-config` feature. Invalid values never abort loading: the default
//! is kept and a [`ConfigError`] is recorded.
//!
//! # Environment Variables
//! - `UNVEIL_REVEAL_THRESHOLD` (f64 in `[0, 1]`)
//! - `UNVEIL_REVEAL_ROOT_MARGIN` (CSS margin shorthand, e.g. `0px 0px -25% 0px`)
//! - `UNVEIL_DESKTOP_MIN_WIDTH` (u32 logical pixels)
//! - `UNVEIL_MEDIA_MAX_WAIT_MS` (u64)
//! - `UNVEIL_AUTOPLAY_THRESHOLD` (f64 in `[0, 1]`)
//! - `UNVEIL_MOTION_POLICY` = desktop|prefers-reduced|either|never

use std::env;
use std::fmt;
use std::time::Duration;

use crate::geometry::RootMargin;
use crate::media_query::Breakpoint;

/// Default fraction of a section that must be visible before it reveals.
pub const DEFAULT_REVEAL_THRESHOLD: f64 = 0.25;
/// Default bound on how long a reveal waits for its media.
pub const DEFAULT_MEDIA_MAX_WAIT: Duration = Duration::from_millis(2000);
/// Default fraction of a gallery item that must be visible to autoplay.
pub const DEFAULT_AUTOPLAY_THRESHOLD: f64 = 0.6;

const ENV_REVEAL_THRESHOLD: &str = "UNVEIL_REVEAL_THRESHOLD";
const ENV_REVEAL_ROOT_MARGIN: &str = "UNVEIL_REVEAL_ROOT_MARGIN";
const ENV_DESKTOP_MIN_WIDTH: &str = "UNVEIL_DESKTOP_MIN_WIDTH";
const ENV_MEDIA_MAX_WAIT_MS: &str = "UNVEIL_MEDIA_MAX_WAIT_MS";
const ENV_AUTOPLAY_THRESHOLD: &str = "UNVEIL_AUTOPLAY_THRESHOLD";
const ENV_MOTION_POLICY: &str = "UNVEIL_MOTION_POLICY";

/// Which environment signal turns entrance animations off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPolicy {
    /// Skip animations on desktop-class viewports.
    #[default]
    Desktop,
    /// Skip animations when the user asks for reduced motion.
    PrefersReduced,
    /// Skip animations when either signal is set.
    Either,
    /// Always animate.
    Never,
}

impl MotionPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "desktop" => Some(Self::Desktop),
            "prefers-reduced" | "prefers_reduced" | "reduced" => Some(Self::PrefersReduced),
            "either" | "any" => Some(Self::Either),
            "never" | "off" => Some(Self::Never),
            _ => None,
        }
    }

    /// Combine the two environment signals under this policy.
    #[must_use]
    pub fn reduce_motion(self, is_desktop: bool, prefers_reduced: bool) -> bool {
        match self {
            Self::Desktop => is_desktop,
            Self::PrefersReduced => prefers_reduced,
            Self::Either => is_desktop || prefers_reduced,
            Self::Never => false,
        }
    }
}

impl fmt::Display for MotionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Desktop => "desktop",
            Self::PrefersReduced => "prefers-reduced",
            Self::Either => "either",
            Self::Never => "never",
        })
    }
}

/// Per-subscription reveal parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealConfig {
    /// Fraction of the element that must intersect the viewport.
    pub threshold: f64,
    /// Viewport adjustment for early/late triggering.
    pub root_margin: RootMargin,
    /// Reveal immediately without observing.
    pub reduce_motion: bool,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REVEAL_THRESHOLD,
            root_margin: RootMargin::default(),
            reduce_motion: false,
        }
    }
}

impl RevealConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the visibility threshold, clamped to `[0, 1]`.
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn root_margin(mut self, margin: RootMargin) -> Self {
        self.root_margin = margin;
        self
    }

    #[must_use]
    pub fn reduce_motion(mut self, reduce: bool) -> Self {
        self.reduce_motion = reduce;
        self
    }
}

/// Engine-wide tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub reveal_threshold: f64,
    pub reveal_root_margin: RootMargin,
    pub desktop_breakpoint: Breakpoint,
    pub media_max_wait: Duration,
    pub autoplay_threshold: f64,
    pub motion_policy: MotionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reveal_threshold: DEFAULT_REVEAL_THRESHOLD,
            reveal_root_margin: RootMargin::default(),
            desktop_breakpoint: Breakpoint::DESKTOP,
            media_max_wait: DEFAULT_MEDIA_MAX_WAIT,
            autoplay_threshold: DEFAULT_AUTOPLAY_THRESHOLD,
            motion_policy: MotionPolicy::Desktop,
        }
    }
}

/// Configuration parse diagnostics.
#[derive(Debug, Clone)]
pub struct EngineConfigParse {
    pub config: EngineConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> EngineConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> EngineConfigParse {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse config from an arbitrary lookup keyed by the env variable names.
    pub fn from_lookup<F>(mut get: F) -> EngineConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();
        let mut errors = Vec::new();
        for (key, field) in [
            (ENV_REVEAL_THRESHOLD, Field::RevealThreshold),
            (ENV_REVEAL_ROOT_MARGIN, Field::RevealRootMargin),
            (ENV_DESKTOP_MIN_WIDTH, Field::DesktopMinWidth),
            (ENV_MEDIA_MAX_WAIT_MS, Field::MediaMaxWaitMs),
            (ENV_AUTOPLAY_THRESHOLD, Field::AutoplayThreshold),
            (ENV_MOTION_POLICY, Field::MotionPolicy),
        ] {
            if let Some(value) = get(key) {
                config.apply(field, &value, &mut errors);
            }
        }
        EngineConfigParse { config, errors }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        validate_fraction("reveal_threshold", self.reveal_threshold, &mut errors);
        validate_fraction("autoplay_threshold", self.autoplay_threshold, &mut errors);
        if self.desktop_breakpoint.0 == 0 {
            errors.push(ConfigError::new(
                "desktop_min_width",
                "0",
                "expected positive integer",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reveal parameters derived from the engine defaults.
    #[must_use]
    pub fn reveal(&self) -> RevealConfig {
        RevealConfig {
            threshold: self.reveal_threshold,
            root_margin: self.reveal_root_margin,
            reduce_motion: false,
        }
    }

    /// Short human-readable summary for debug overlays and logs.
    #[must_use]
    pub fn summary_short(&self) -> String {
        format!(
            "reveal>={} · desktop>={}px · wait {}ms · autoplay>={} · motion {}",
            self.reveal_threshold,
            self.desktop_breakpoint.0,
            self.media_max_wait.as_millis(),
            self.autoplay_threshold,
            self.motion_policy
        )
    }

    fn apply(&mut self, field: Field, value: &str, errors: &mut Vec<ConfigError>) {
        match field {
            Field::RevealThreshold => match parse_fraction(value) {
                Some(parsed) => self.reveal_threshold = parsed,
                None => errors.push(ConfigError::new(
                    "reveal_threshold",
                    value,
                    "expected number in [0, 1]",
                )),
            },
            Field::RevealRootMargin => match value.parse::<RootMargin>() {
                Ok(parsed) => self.reveal_root_margin = parsed,
                Err(err) => errors.push(ConfigError::new(
                    "reveal_root_margin",
                    value,
                    err.to_string(),
                )),
            },
            Field::DesktopMinWidth => match value.trim().parse::<u32>() {
                Ok(parsed) if parsed > 0 => self.desktop_breakpoint = Breakpoint(parsed),
                _ => errors.push(ConfigError::new(
                    "desktop_min_width",
                    value,
                    "expected positive integer",
                )),
            },
            Field::MediaMaxWaitMs => match value.trim().parse::<u64>() {
                Ok(parsed) => self.media_max_wait = Duration::from_millis(parsed),
                Err(_) => errors.push(ConfigError::new(
                    "media_max_wait_ms",
                    value,
                    "expected non-negative integer",
                )),
            },
            Field::AutoplayThreshold => match parse_fraction(value) {
                Some(parsed) => self.autoplay_threshold = parsed,
                None => errors.push(ConfigError::new(
                    "autoplay_threshold",
                    value,
                    "expected number in [0, 1]",
                )),
            },
            Field::MotionPolicy => match MotionPolicy::parse(value) {
                Some(parsed) => self.motion_policy = parsed,
                None => errors.push(ConfigError::new(
                    "motion_policy",
                    value,
                    "expected desktop|prefers-reduced|either|never",
                )),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    RevealThreshold,
    RevealRootMargin,
    DesktopMinWidth,
    MediaMaxWaitMs,
    AutoplayThreshold,
    MotionPolicy,
}

fn parse_fraction(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
}

fn validate_fraction(field: &'static str, value: f64, errors: &mut Vec<ConfigError>) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::new(
            field,
            value.to_string(),
            "expected number in [0, 1]",
        ));
    }
}

// ---------------------------------------------------------------------------
// Config documents
// ---------------------------------------------------------------------------

#[cfg(feature = "policy-config")]
mod document {
    use super::{ConfigError, EngineConfig, EngineConfigParse, Field};
    use serde::Deserialize;

    /// On-disk shape. Every field is optional and overrides the default.
    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct ConfigDocument {
        reveal_threshold: Option<f64>,
        reveal_root_margin: Option<String>,
        desktop_min_width: Option<u32>,
        media_max_wait_ms: Option<u64>,
        autoplay_threshold: Option<f64>,
        motion_policy: Option<String>,
    }

    impl ConfigDocument {
        fn into_parse(self) -> EngineConfigParse {
            let mut config = EngineConfig::default();
            let mut errors = Vec::new();
            let fields = [
                (Field::RevealThreshold, self.reveal_threshold.map(|v| v.to_string())),
                (Field::RevealRootMargin, self.reveal_root_margin),
                (Field::DesktopMinWidth, self.desktop_min_width.map(|v| v.to_string())),
                (Field::MediaMaxWaitMs, self.media_max_wait_ms.map(|v| v.to_string())),
                (Field::AutoplayThreshold, self.autoplay_threshold.map(|v| v.to_string())),
                (Field::MotionPolicy, self.motion_policy),
            ];
            for (field, value) in fields {
                if let Some(value) = value {
                    config.apply(field, &value, &mut errors);
                }
            }
            EngineConfigParse { config, errors }
        }
    }

    impl EngineConfig {
        /// Parse a JSON config document.
        pub fn from_json_str(text: &str) -> Result<EngineConfigParse, ConfigError> {
            serde_json::from_str::<ConfigDocument>(text)
                .map(ConfigDocument::into_parse)
                .map_err(|err| ConfigError::new("document", "json", err.to_string()))
        }

        /// Parse a TOML config document.
        pub fn from_toml_str(text: &str) -> Result<EngineConfigParse, ConfigError> {
            toml::from_str::<ConfigDocument>(text)
                .map(ConfigDocument::into_parse)
                .map_err(|err| ConfigError::new("document", "toml", err.to_string()))
        }
    }

}
