//! Rune motion configuration system
//!
//! This crate provides centralized configuration management for the motion
//! engine, loading settings from `rune.toml` with environment variable
//! overrides layered on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "rune.toml";

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuneConfig {
    /// Transition engine settings
    pub motion: MotionConfig,
    /// Headless demo settings
    pub demo: DemoConfig,
}

/// Per-element transition configuration.
///
/// Every field is optional in TOML; missing fields take the values from
/// [`MotionConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Master switch; when off no phase ever starts and visibility snaps.
    pub enabled: bool,
    /// Run the Appear phase when an element is first shown.
    pub appear: bool,
    /// Run the Enter phase when a mounted element becomes visible.
    pub enter: bool,
    /// Run the Exit phase when an element becomes hidden.
    pub exit: bool,
    /// Allow Exit even if the element was never mounted visible.
    pub exit_immediately: bool,
    /// Fallback completion deadline in milliseconds (`<= 0` disables it).
    pub deadline_ms: f32,
    /// Paint frames to wait between two cues.
    pub frames_per_cue: u32,
    /// Stop rendering the element once it has exited.
    pub remove_on_exit: bool,
    /// Keep a `display: none` placeholder for hidden, never-rendered elements.
    pub force_render: bool,
    /// Class applied to an exited element when `remove_on_exit` is off.
    pub exited_class_name: Option<String>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            appear: true,
            enter: true,
            exit: true,
            exit_immediately: false,
            deadline_ms: 0.0,
            frames_per_cue: 2,
            remove_on_exit: true,
            force_render: false,
            exited_class_name: None,
        }
    }
}

impl MotionConfig {
    /// Set the completion deadline.
    pub fn with_deadline_ms(mut self, deadline_ms: f32) -> Self {
        self.deadline_ms = deadline_ms;
        self
    }

    /// Set the number of frames between cues.
    pub fn with_frames_per_cue(mut self, frames: u32) -> Self {
        self.frames_per_cue = frames;
        self
    }

    /// Toggle the Appear, Enter and Exit phases at once.
    pub fn with_phases(mut self, appear: bool, enter: bool, exit: bool) -> Self {
        self.appear = appear;
        self.enter = enter;
        self.exit = exit;
        self
    }

    /// Allow Exit before the element has ever mounted.
    pub fn with_exit_immediately(mut self, exit_immediately: bool) -> Self {
        self.exit_immediately = exit_immediately;
        self
    }

    /// Whether the deadline fallback is armed at all.
    pub fn has_deadline(&self) -> bool {
        self.deadline_ms > 0.0
    }
}

/// Headless demo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Simulated paint interval in milliseconds
    pub frame_ms: f32,
    /// Simulated CSS transition duration before the host fires `transitionend`
    pub transition_ms: f32,
    /// Upper bound of frames simulated per step
    pub max_frames: u32,
    /// Key lists applied one after another
    pub steps: Vec<Vec<String>>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frame_ms: 16.0,
            transition_ms: 300.0,
            max_frames: 240,
            steps: vec![
                vec!["a".into(), "b".into(), "c".into()],
                vec!["a".into(), "c".into()],
                vec!["c".into(), "a".into(), "d".into()],
            ],
        }
    }
}

impl RuneConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from the default location (rune.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        Self::load_from_file(path).unwrap_or_else(|err| {
            warn!(%err, "falling back to default configuration");
            Self::default()
        })
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Some(flag) = env_flag("RUNE_MOTION_ENABLED") {
            self.motion.enabled = flag;
        }
        if let Some(flag) = env_flag("RUNE_MOTION_APPEAR") {
            self.motion.appear = flag;
        }
        if let Some(flag) = env_flag("RUNE_MOTION_ENTER") {
            self.motion.enter = flag;
        }
        if let Some(flag) = env_flag("RUNE_MOTION_EXIT") {
            self.motion.exit = flag;
        }
        if let Some(flag) = env_flag("RUNE_MOTION_EXIT_IMMEDIATELY") {
            self.motion.exit_immediately = flag;
        }
        if let Some(ms) = env_parse::<f32>("RUNE_MOTION_DEADLINE_MS") {
            self.motion.deadline_ms = ms;
        }
        if let Some(frames) = env_parse::<u32>("RUNE_MOTION_FRAMES_PER_CUE") {
            self.motion.frames_per_cue = frames;
        }

        if let Some(ms) = env_parse::<f32>("RUNE_DEMO_FRAME_MS") {
            self.demo.frame_ms = ms;
        }
        if let Some(ms) = env_parse::<f32>("RUNE_DEMO_TRANSITION_MS") {
            self.demo.transition_ms = ms;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from rune.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|val| val == "1" || val.eq_ignore_ascii_case("true"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let val = std::env::var(name).ok()?;
    match val.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(name, value = %val, "ignoring unparsable environment override");
            None
        }
    }
}
