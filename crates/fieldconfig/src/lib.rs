use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Construction-time options for a mounted field surface.
///
/// Every section is optional in the TOML file; missing values take the
/// defaults below so an empty document is a valid configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldConfig {
    pub version: u32,
    pub effect: EffectSettings,
    pub palette: PaletteSettings,
    pub autopilot: AutopilotSettings,
    pub surface: SurfaceSettings,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            version: 1,
            effect: EffectSettings::default(),
            palette: PaletteSettings::default(),
            autopilot: AutopilotSettings::default(),
            surface: SurfaceSettings::default(),
        }
    }
}

/// Tuning scalars consumed by the fragment shader every frame.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Strength of the pointer influence term; 0 disables it entirely.
    pub force: f32,
    /// Spatial falloff radius of the pointer influence, in normalized units.
    pub cursor_radius: f32,
    /// Enables the damping blend toward the neutral field midpoint.
    pub viscous: bool,
    /// Blend weight used when `viscous` is set (0..=1).
    pub viscosity: f32,
    /// Amplitude of the noise term around the field midpoint.
    pub wave_amplitude: f32,
    /// Base spatial frequency of the noise field.
    pub wave_frequency: f32,
    /// Time scale applied to the noise animation.
    pub wave_speed: f32,
    /// Number of discrete palette bands the field is quantized into.
    pub color_levels: u32,
}

impl EffectSettings {
    /// Viscosity actually fed to the shader: the flag gates the value.
    pub fn effective_viscosity(&self) -> f32 {
        if self.viscous {
            self.viscosity
        } else {
            0.0
        }
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            force: 0.6,
            cursor_radius: 0.25,
            viscous: false,
            viscosity: 0.5,
            wave_amplitude: 0.35,
            wave_frequency: 3.0,
            wave_speed: 0.25,
            color_levels: 6,
        }
    }
}

/// Ordered color stops defining the lookup palette.
///
/// Stops are kept as raw `#rrggbb` strings here; the renderer parses them and
/// substitutes a safe default for malformed or empty lists instead of
/// erroring, so palette content is deliberately not part of `validate`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaletteSettings {
    pub stops: Vec<String>,
}

impl Default for PaletteSettings {
    fn default() -> Self {
        Self {
            stops: DEFAULT_STOPS.iter().map(|stop| stop.to_string()).collect(),
        }
    }
}

/// Deep-blue-to-foam ramp used when the caller does not configure stops.
pub const DEFAULT_STOPS: [&str; 5] = ["#0b1026", "#1b3a6b", "#2d6ea8", "#68a0c8", "#f2f5f7"];

/// Parses a single `#rrggbb` color stop. Returns `None` for anything else;
/// the caller decides whether that means fallback or skip.
pub fn parse_color_stop(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Idle-motion controller settings: orbit geometry and takeover timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AutopilotSettings {
    /// Whether the autonomous driver may ever run.
    pub enabled: bool,
    /// Multiplier on the base orbital angular speed.
    pub speed: f32,
    /// Orbit radius around the surface midpoint, in normalized units.
    pub orbit_radius: f32,
    /// How long a single pointer sample suppresses the autopilot.
    #[serde(deserialize_with = "deserialize_duration")]
    pub takeover: Duration,
    /// Additional idle delay before the autopilot resumes.
    #[serde(deserialize_with = "deserialize_duration")]
    pub resume_delay: Duration,
}

impl Default for AutopilotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 1.0,
            orbit_radius: 0.30,
            takeover: Duration::from_millis(250),
            resume_delay: Duration::from_secs(3),
        }
    }
}

/// Presentation options for the backing store and render loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Fraction of device pixels used for the backing store (0..=1].
    pub resolution_scale: f32,
    /// Optional FPS cap; absent or 0 means render every refresh.
    pub fps: Option<f32>,
    /// Optional fixed simulation step; absent means wall-clock delta time.
    #[serde(deserialize_with = "deserialize_duration_opt")]
    pub time_step: Option<Duration>,
    /// Anti-aliasing policy for the render pipeline.
    #[serde(deserialize_with = "deserialize_antialias")]
    pub antialias: AntialiasSetting,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            resolution_scale: 1.0,
            fps: None,
            time_step: None,
            antialias: AntialiasSetting::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    pub fn sample_count(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration_opt(deserializer)?
        .ok_or_else(|| de::Error::custom("expected a duration, found none"))
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_antialias<'de, D>(deserializer: D) -> Result<AntialiasSetting, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper = Helper::deserialize(deserializer)?;
    let raw = match helper {
        Helper::Str(value) => value,
        Helper::Num(value) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            value.to_string()
        }
    };
    parse_antialias(&raw).map_err(de::Error::custom)
}

impl FieldConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FieldConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let effect = &self.effect;
        require_finite("effect.force", effect.force)?;
        if effect.force < 0.0 {
            return Err(ConfigError::Invalid("effect.force must be >= 0".into()));
        }
        require_finite("effect.cursor_radius", effect.cursor_radius)?;
        if effect.cursor_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "effect.cursor_radius must be greater than zero".into(),
            ));
        }
        require_finite("effect.viscosity", effect.viscosity)?;
        if !(0.0..=1.0).contains(&effect.viscosity) {
            return Err(ConfigError::Invalid(
                "effect.viscosity must lie within 0..=1".into(),
            ));
        }
        require_finite("effect.wave_amplitude", effect.wave_amplitude)?;
        if effect.wave_amplitude < 0.0 {
            return Err(ConfigError::Invalid(
                "effect.wave_amplitude must be >= 0".into(),
            ));
        }
        require_finite("effect.wave_frequency", effect.wave_frequency)?;
        if effect.wave_frequency <= 0.0 {
            return Err(ConfigError::Invalid(
                "effect.wave_frequency must be greater than zero".into(),
            ));
        }
        require_finite("effect.wave_speed", effect.wave_speed)?;
        if effect.wave_speed < 0.0 {
            return Err(ConfigError::Invalid("effect.wave_speed must be >= 0".into()));
        }
        if effect.color_levels == 0 {
            return Err(ConfigError::Invalid(
                "effect.color_levels must be at least 1".into(),
            ));
        }

        let autopilot = &self.autopilot;
        require_finite("autopilot.speed", autopilot.speed)?;
        if autopilot.speed < 0.0 {
            return Err(ConfigError::Invalid("autopilot.speed must be >= 0".into()));
        }
        require_finite("autopilot.orbit_radius", autopilot.orbit_radius)?;
        if autopilot.orbit_radius <= 0.0 || autopilot.orbit_radius > 0.5 {
            return Err(ConfigError::Invalid(
                "autopilot.orbit_radius must lie within (0, 0.5]".into(),
            ));
        }

        let surface = &self.surface;
        require_finite("surface.resolution_scale", surface.resolution_scale)?;
        if surface.resolution_scale <= 0.0 || surface.resolution_scale > 1.0 {
            return Err(ConfigError::Invalid(
                "surface.resolution_scale must lie within (0, 1]".into(),
            ));
        }
        if let Some(fps) = surface.fps {
            require_finite("surface.fps", fps)?;
            if fps < 0.0 {
                return Err(ConfigError::Invalid("surface.fps must be >= 0".into()));
            }
        }
        if let Some(step) = surface.time_step {
            if step.is_zero() {
                return Err(ConfigError::Invalid(
                    "surface.time_step must be greater than zero".into(),
                ));
            }
        }

        Ok(())
    }
}

fn require_finite(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be a finite number")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[effect]
force = 0.8
cursor_radius = 0.2
viscous = true
viscosity = 0.4
color_levels = 8

[palette]
stops = ["#102030", "#405060", "#ffffff"]

[autopilot]
enabled = true
speed = 1.5
takeover = "250ms"
resume_delay = "3s"

[surface]
resolution_scale = 0.75
fps = 60
time_step = "16ms"
antialias = 4
"##;

    #[test]
    fn parses_sample_config() {
        let config = FieldConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.effect.color_levels, 8);
        assert_eq!(config.palette.stops.len(), 3);
        assert_eq!(config.autopilot.takeover, Duration::from_millis(250));
        assert_eq!(config.autopilot.resume_delay, Duration::from_secs(3));
        assert_eq!(config.surface.time_step, Some(Duration::from_millis(16)));
        assert_eq!(config.surface.antialias, AntialiasSetting::Samples4);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = FieldConfig::from_toml_str("").expect("defaults");
        assert_eq!(config.effect.force, 0.6);
        assert!(config.autopilot.enabled);
        assert_eq!(config.palette.stops.len(), DEFAULT_STOPS.len());
        assert_eq!(config.surface.resolution_scale, 1.0);
        config.validate().expect("defaults validate");
    }

    #[test]
    fn viscosity_is_gated_by_flag() {
        let mut effect = EffectSettings::default();
        effect.viscosity = 0.7;
        assert_eq!(effect.effective_viscosity(), 0.0);
        effect.viscous = true;
        assert_eq!(effect.effective_viscosity(), 0.7);
    }

    #[test]
    fn rejects_out_of_range_scale() {
        let err = FieldConfig::from_toml_str(
            r#"
[surface]
resolution_scale = 1.5
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_color_levels() {
        let err = FieldConfig::from_toml_str(
            r#"
[effect]
color_levels = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_oversized_orbit() {
        let err = FieldConfig::from_toml_str(
            r#"
[autopilot]
orbit_radius = 0.75
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn durations_accept_bare_seconds() {
        let config = FieldConfig::from_toml_str(
            r#"
[autopilot]
takeover = 1
resume_delay = 2.5
"#,
        )
        .expect("numeric durations");
        assert_eq!(config.autopilot.takeover, Duration::from_secs(1));
        assert_eq!(config.autopilot.resume_delay, Duration::from_secs_f64(2.5));
    }

    #[test]
    fn parses_color_stops() {
        assert_eq!(parse_color_stop("#ffffff"), Some([255, 255, 255]));
        assert_eq!(parse_color_stop(" #0b1026 "), Some([11, 16, 38]));
        assert_eq!(parse_color_stop("0b1026"), None);
        assert_eq!(parse_color_stop("#0b102"), None);
        assert_eq!(parse_color_stop("#zzzzzz"), None);
    }

    #[test]
    fn antialias_accepts_numbers_and_names() {
        assert_eq!(parse_antialias("auto"), Ok(AntialiasSetting::Auto));
        assert_eq!(parse_antialias("off"), Ok(AntialiasSetting::Off));
        assert_eq!(parse_antialias("8"), Ok(AntialiasSetting::Samples8));
        assert!(parse_antialias("3").is_err());
    }
}
