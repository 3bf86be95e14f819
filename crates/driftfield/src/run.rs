use std::fs;

use anyhow::{anyhow, Context, Result};
use fieldconfig::FieldConfig;
use renderer::{Renderer, SurfaceConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{parse_surface_size, RunArgs};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let surface = surface_config(&args, &config)?;
    tracing::info!(
        stops = config.palette.stops.len(),
        autopilot = config.autopilot.enabled,
        fps = ?surface.target_fps,
        "starting driftfield surface"
    );

    let mut renderer = Renderer::new(surface);
    renderer.run()
}

/// Prints the resolved configuration without mounting a surface, so config
/// files can be vetted on machines (and CI runners) without a display.
pub fn check(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let effect = &config.effect;
    let autopilot = &config.autopilot;
    let surface = &config.surface;

    println!("Resolved configuration:");
    println!(
        "  effect:     force={:.2} cursor_radius={:.2} viscous={} viscosity={:.2}",
        effect.force, effect.cursor_radius, effect.viscous, effect.viscosity
    );
    println!(
        "  wave:       amplitude={:.2} frequency={:.2} speed={:.2} color_levels={}",
        effect.wave_amplitude, effect.wave_frequency, effect.wave_speed, effect.color_levels
    );
    println!("  palette:    {} stops", config.palette.stops.len());
    println!(
        "  autopilot:  enabled={} speed={:.2} orbit_radius={:.2} takeover={} resume_delay={}",
        autopilot.enabled,
        autopilot.speed,
        autopilot.orbit_radius,
        humantime::format_duration(autopilot.takeover),
        humantime::format_duration(autopilot.resume_delay)
    );
    match surface.fps {
        Some(fps) if fps > 0.0 => println!(
            "  surface:    resolution_scale={:.2} fps={fps:.1} antialias={:?}",
            surface.resolution_scale, surface.antialias
        ),
        _ => println!(
            "  surface:    resolution_scale={:.2} fps=uncapped antialias={:?}",
            surface.resolution_scale, surface.antialias
        ),
    }
    match surface.time_step {
        Some(step) => println!("  time:       fixed step {}", humantime::format_duration(step)),
        None => println!("  time:       wall-clock delta"),
    }

    Ok(())
}

fn resolve_config(args: &RunArgs) -> Result<FieldConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            FieldConfig::from_toml_str(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))?
        }
        None => FieldConfig::default(),
    };

    apply_overrides(&mut config, args);
    config
        .validate()
        .context("configuration rejected after applying CLI overrides")?;
    Ok(config)
}

fn apply_overrides(config: &mut FieldConfig, args: &RunArgs) {
    if let Some(force) = args.force {
        config.effect.force = force;
    }
    if let Some(radius) = args.cursor_radius {
        config.effect.cursor_radius = radius;
    }
    if args.viscous {
        config.effect.viscous = true;
    }
    if let Some(viscosity) = args.viscosity {
        config.effect.viscosity = viscosity;
    }
    if let Some(amplitude) = args.wave_amplitude {
        config.effect.wave_amplitude = amplitude;
    }
    if let Some(frequency) = args.wave_frequency {
        config.effect.wave_frequency = frequency;
    }
    if let Some(speed) = args.wave_speed {
        config.effect.wave_speed = speed;
    }
    if let Some(levels) = args.color_levels {
        config.effect.color_levels = levels;
    }
    if !args.stops.is_empty() {
        config.palette.stops = args.stops.clone();
    }
    if args.no_autopilot {
        config.autopilot.enabled = false;
    }
    if let Some(speed) = args.auto_speed {
        config.autopilot.speed = speed;
    }
    if let Some(radius) = args.orbit_radius {
        config.autopilot.orbit_radius = radius;
    }
    if let Some(takeover) = args.takeover {
        config.autopilot.takeover = takeover;
    }
    if let Some(resume_delay) = args.resume_delay {
        config.autopilot.resume_delay = resume_delay;
    }
    if let Some(scale) = args.resolution_scale {
        config.surface.resolution_scale = scale;
    }
    if let Some(fps) = args.fps {
        config.surface.fps = Some(fps);
    }
    if let Some(step) = args.time_step {
        config.surface.time_step = Some(step);
    }
    if let Some(antialias) = args.antialias {
        config.surface.antialias = antialias;
    }
}

fn surface_config(args: &RunArgs, config: &FieldConfig) -> Result<SurfaceConfig> {
    let mut surface = SurfaceConfig::from_field_config(config);
    if let Some(size) = &args.size {
        surface.surface_size = parse_surface_size(size).map_err(|err| anyhow!(err))?;
    }
    if let Some(title) = &args.title {
        surface.title = title.clone();
    }
    if args.hidden {
        surface.visible = false;
    }
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn args_from(argv: &[&str]) -> RunArgs {
        Cli::try_parse_from(argv).expect("cli parses").run
    }

    #[test]
    fn cli_overrides_replace_file_values() {
        let args = args_from(&[
            "driftfield",
            "--force",
            "1.5",
            "--no-autopilot",
            "--color-levels",
            "12",
        ]);
        let config = resolve_config(&args).expect("valid config");
        assert_eq!(config.effect.force, 1.5);
        assert_eq!(config.effect.color_levels, 12);
        assert!(!config.autopilot.enabled);
    }

    #[test]
    fn invalid_override_is_rejected_after_merge() {
        let args = args_from(&["driftfield", "--resolution-scale", "4.0"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn surface_overrides_apply() {
        let args = args_from(&["driftfield", "--size", "640x480", "--hidden"]);
        let config = resolve_config(&args).expect("valid config");
        let surface = surface_config(&args, &config).expect("surface config");
        assert_eq!(surface.surface_size, (640, 480));
        assert!(!surface.visible);
    }

    #[test]
    fn zero_fps_maps_to_uncapped() {
        let args = args_from(&["driftfield", "--fps", "0"]);
        let config = resolve_config(&args).expect("valid config");
        let surface = surface_config(&args, &config).expect("surface config");
        assert_eq!(surface.target_fps, None, "fps=0 should map to uncapped");
    }
}
