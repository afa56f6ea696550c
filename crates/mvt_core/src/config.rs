//! Scene and logging configuration.
//!
//! # Responsibility
//! - Describe every tunable of the scene (function, interval, slider range,
//!   display groups) and of logging, with defaults matching the shipped scene.
//! - Validate configuration before any object is created.
//!
//! # Invariants
//! - Every field has a default; unknown fields are rejected.
//! - A validated `SceneConfig` declares every group the scene registers into.

use crate::model::color::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Largest division count a slider may reach or a build accepts.
pub const MAX_DIVISIONS: u32 = 64;

pub const GROUP_FUNCTION: &str = "function";
pub const GROUP_DERIVATIVE: &str = "derivative";
pub const GROUP_QUADRATURE: &str = "quadrature";
pub const GROUP_IRREGULAR: &str = "irregular";
pub const GROUP_DIVISION: &str = "division";
pub const GROUP_DIVISION_SECANT: &str = "division_secant";
pub const GROUP_INTERVAL_SECANT: &str = "interval_secant";
pub const GROUP_DIVISION_TANGENT: &str = "division_tangent";
pub const GROUP_LEVEL_TERM_TANGENT: &str = "level_term_tangent";
pub const GROUP_LEVEL_TERM: &str = "level_term";
pub const GROUP_MU_ABSCISSAS: &str = "mu_abscissas";
pub const GROUP_MU_ORDINATES: &str = "mu_ordinates";
pub const GROUP_INTERVAL_BOUNDS: &str = "interval_bounds";

const SCENE_GROUPS: &[&str] = &[
    GROUP_FUNCTION,
    GROUP_DERIVATIVE,
    GROUP_QUADRATURE,
    GROUP_IRREGULAR,
    GROUP_DIVISION,
    GROUP_DIVISION_SECANT,
    GROUP_INTERVAL_SECANT,
    GROUP_DIVISION_TANGENT,
    GROUP_LEVEL_TERM_TANGENT,
    GROUP_LEVEL_TERM,
    GROUP_MU_ABSCISSAS,
    GROUP_MU_ORDINATES,
    GROUP_INTERVAL_BOUNDS,
];

/// Group keys the scene registers objects into.
pub fn scene_group_keys() -> &'static [&'static str] {
    SCENE_GROUPS
}

/// Top-level configuration file shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub scene: SceneConfig,
}

impl AppConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.scene.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }
}

/// Logging backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    pub log_dir: Option<String>,
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            max_file_size_bytes: 10 * 1024 * 1024,
            max_files: 5,
        }
    }
}

/// Closed interval `[start, end]` the theorem is demonstrated on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntervalConfig {
    pub start: f64,
    pub end: f64,
}

/// Range of the division-count slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliderConfig {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

/// One display group: color, layer and toggle title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub key: String,
    pub title: String,
    pub color: Color,
    pub label_text_color: Color,
    pub layer: u8,
}

impl GroupSpec {
    pub fn new(key: &str, title: &str, color: Color, label_text_color: Color, layer: u8) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            color,
            label_text_color,
            layer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Right-hand side of `f(x) = …`.
    pub function_definition: String,
    pub interval: IntervalConfig,
    pub divisions: SliderConfig,
    /// Length of every drawn tangent segment.
    pub tangent_length: f64,
    /// Fill opacity of the quadrature polygon and the integral area.
    pub area_filling: f64,
    /// Vertical position of the first toggle row, in screen pixels.
    pub control_y_offset: u32,
    pub control_row_height: u32,
    /// Groups in toggle order.
    pub groups: Vec<GroupSpec>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let black = Color::BLACK;
        let white = Color::WHITE;
        let magenta = Color::rgb(0xFF, 0x00, 0xFF);
        let violet = Color::rgb(0x80, 0x00, 0xFF);
        let red = Color::rgb(0xFF, 0x00, 0x00);
        let cyan = Color::rgb(0x00, 0xD8, 0xF5);
        let green = Color::rgb(0x00, 0xFF, 0x00);
        let amber = Color::rgb(0xF8, 0xBA, 0x2A);
        let blue = Color::rgb(0x1E, 0x00, 0xFF);
        Self {
            function_definition: "1/4 * x^3 + 1".to_string(),
            interval: IntervalConfig {
                start: -1.0,
                end: 1.0,
            },
            divisions: SliderConfig {
                min: 1,
                max: 6,
                step: 1,
            },
            tangent_length: 0.5,
            area_filling: 0.3,
            control_y_offset: 80,
            control_row_height: 32,
            groups: vec![
                GroupSpec::new(GROUP_FUNCTION, "Function", cyan, black, 0),
                GroupSpec::new(GROUP_DERIVATIVE, "Derivative", red, black, 0),
                GroupSpec::new(GROUP_QUADRATURE, "Quadrature Area", green, black, 3),
                GroupSpec::new(GROUP_IRREGULAR, "Irregular Area", red, black, 2),
                GroupSpec::new(GROUP_DIVISION, "Column Dividers", amber, black, 4),
                GroupSpec::new(GROUP_DIVISION_SECANT, "Division Secant", black, white, 4),
                GroupSpec::new(GROUP_INTERVAL_SECANT, "Interval Secant", blue, white, 4),
                GroupSpec::new(GROUP_DIVISION_TANGENT, "Division Tangent", magenta, white, 4),
                GroupSpec::new(GROUP_LEVEL_TERM_TANGENT, "Level Term Tangent", violet, white, 4),
                GroupSpec::new(GROUP_LEVEL_TERM, "Level Term Ordinate", violet, white, 4),
                GroupSpec::new(GROUP_MU_ABSCISSAS, "μ Abscissas", magenta, white, 4),
                GroupSpec::new(GROUP_MU_ORDINATES, "μ Ordinates", magenta, white, 4),
                GroupSpec::new(GROUP_INTERVAL_BOUNDS, "Interval Bounds", black, white, 5),
            ],
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let definition = self.function_definition.trim();
        if definition.is_empty() {
            return Err(ConfigValidationError::EmptyFunction);
        }
        if definition.contains(['\n', '\r']) {
            return Err(ConfigValidationError::MultiLineFunction);
        }

        let IntervalConfig { start, end } = self.interval;
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(ConfigValidationError::InvalidInterval { start, end });
        }

        let SliderConfig { min, max, step } = self.divisions;
        if min == 0 || min > max || max > MAX_DIVISIONS || step == 0 {
            return Err(ConfigValidationError::InvalidSlider { min, max, step });
        }

        if !(self.tangent_length.is_finite() && self.tangent_length > 0.0) {
            return Err(ConfigValidationError::InvalidTangentLength(
                self.tangent_length,
            ));
        }
        if !(0.0..=1.0).contains(&self.area_filling) {
            return Err(ConfigValidationError::InvalidFilling(self.area_filling));
        }
        if self.control_row_height == 0 {
            return Err(ConfigValidationError::InvalidRowHeight);
        }

        let mut keys = BTreeSet::new();
        for group in &self.groups {
            let key = group.key.trim();
            if key.is_empty() {
                return Err(ConfigValidationError::EmptyGroupKey);
            }
            if !keys.insert(key) {
                return Err(ConfigValidationError::DuplicateGroup(key.to_string()));
            }
        }
        for required in scene_group_keys() {
            if !keys.contains(required) {
                return Err(ConfigValidationError::MissingGroup(required));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    EmptyFunction,
    MultiLineFunction,
    InvalidInterval { start: f64, end: f64 },
    InvalidSlider { min: u32, max: u32, step: u32 },
    InvalidTangentLength(f64),
    InvalidFilling(f64),
    InvalidRowHeight,
    EmptyGroupKey,
    DuplicateGroup(String),
    MissingGroup(&'static str),
}

impl Display for ConfigValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFunction => write!(f, "function definition must not be blank"),
            Self::MultiLineFunction => write!(f, "function definition must be a single line"),
            Self::InvalidInterval { start, end } => {
                write!(f, "interval start {start} must be finite and below end {end}")
            }
            Self::InvalidSlider { min, max, step } => write!(
                f,
                "division slider requires 1 <= min <= max <= {MAX_DIVISIONS} and step >= 1, \
                 got min={min} max={max} step={step}"
            ),
            Self::InvalidTangentLength(value) => {
                write!(f, "tangent length must be positive, got {value}")
            }
            Self::InvalidFilling(value) => {
                write!(f, "area filling must be within [0, 1], got {value}")
            }
            Self::InvalidRowHeight => write!(f, "control row height must be positive"),
            Self::EmptyGroupKey => write!(f, "group key must not be blank"),
            Self::DuplicateGroup(key) => write!(f, "group declared twice: {key}"),
            Self::MissingGroup(key) => write!(f, "scene group missing from config: {key}"),
        }
    }
}

impl Error for ConfigValidationError {}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(ConfigValidationError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(err) => Some(err),
        }
    }
}

impl From<ConfigValidationError> for ConfigError {
    fn from(value: ConfigValidationError) -> Self {
        Self::Invalid(value)
    }
}
