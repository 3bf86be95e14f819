use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fieldconfig::AntialiasSetting;

#[derive(Parser, Debug)]
#[command(
    name = "driftfield",
    author,
    version,
    about = "Interactive shader-driven color field surface",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// TOML configuration file; every flag below overrides its values.
    #[arg(long, value_name = "FILE", env = "DRIFTFIELD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Strength of the pointer influence on the field (0 disables it).
    #[arg(long, value_name = "FORCE")]
    pub force: Option<f32>,

    /// Spatial falloff radius of the pointer influence, normalized units.
    #[arg(long, value_name = "RADIUS")]
    pub cursor_radius: Option<f32>,

    /// Enable the viscous damping blend toward the neutral field.
    #[arg(long)]
    pub viscous: bool,

    /// Damping blend weight used with --viscous (0-1).
    #[arg(long, value_name = "WEIGHT")]
    pub viscosity: Option<f32>,

    /// Amplitude of the noise term around the field midpoint.
    #[arg(long, value_name = "AMPLITUDE")]
    pub wave_amplitude: Option<f32>,

    /// Base spatial frequency of the noise field.
    #[arg(long, value_name = "FREQUENCY")]
    pub wave_frequency: Option<f32>,

    /// Time scale applied to the noise animation.
    #[arg(long, value_name = "SPEED")]
    pub wave_speed: Option<f32>,

    /// Number of discrete palette bands.
    #[arg(long, value_name = "LEVELS")]
    pub color_levels: Option<u32>,

    /// Comma-separated `#rrggbb` palette stops.
    #[arg(long, value_name = "STOPS", value_delimiter = ',')]
    pub stops: Vec<String>,

    /// Disable the idle autopilot entirely.
    #[arg(long)]
    pub no_autopilot: bool,

    /// Angular speed multiplier for the idle orbit.
    #[arg(long, value_name = "SPEED")]
    pub auto_speed: Option<f32>,

    /// Idle orbit radius around the surface midpoint, normalized units.
    #[arg(long, value_name = "RADIUS")]
    pub orbit_radius: Option<f32>,

    /// How long a pointer sample suppresses the autopilot (e.g. `250ms`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub takeover: Option<Duration>,

    /// Additional idle delay before the autopilot resumes (e.g. `3s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub resume_delay: Option<Duration>,

    /// Fraction of device pixels used for the backing store (0-1].
    #[arg(long, value_name = "SCALE")]
    pub resolution_scale: Option<f32>,

    /// Optional FPS cap (0 = uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Fixed simulation step (e.g. `16ms`) instead of wall-clock delta time.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub time_step: Option<Duration>,

    /// Anti-aliasing policy: `auto`, `off`, or an MSAA sample count.
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    /// Override the window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Title of the surface window.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Keep the surface window hidden (useful for smoke runs).
    #[arg(long)]
    pub hidden: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load, validate, and print the resolved configuration, then exit.
    Check,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Accepts humantime strings (`250ms`, `3s`) or bare seconds (`0.25`).
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("duration '{trimmed}' must be a non-negative number"));
        }
        return Ok(Duration::from_secs_f64(seconds));
    }

    humantime::parse_duration(trimmed)
        .map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    fieldconfig::parse_antialias(value)
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in surface size".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in surface size".to_string())?;
    if width == 0 || height == 0 {
        return Err("surface size must be greater than zero".into());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_size_variants() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size("1920X1080").unwrap(), (1920, 1080));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x720").is_err());
    }

    #[test]
    fn parses_duration_variants() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0.25").unwrap(), Duration::from_secs_f64(0.25));
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn stops_flag_splits_on_commas() {
        let cli = Cli::try_parse_from([
            "driftfield",
            "--stops",
            "#102030,#405060,#708090",
        ])
        .unwrap();
        assert_eq!(cli.run.stops.len(), 3);
        assert_eq!(cli.run.stops[1], "#405060");
    }
}
