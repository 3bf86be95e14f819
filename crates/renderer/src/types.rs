use std::time::Duration;

use fieldconfig::{AntialiasSetting, AutopilotSettings, EffectSettings, FieldConfig};
use winit::dpi::PhysicalSize;

/// Device-pixel-ratio ceiling applied to the backing store to bound cost on
/// very dense displays.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Auto
    }
}

impl From<AntialiasSetting> for Antialiasing {
    fn from(setting: AntialiasSetting) -> Self {
        match setting.sample_count() {
            None => Antialiasing::Auto,
            Some(1) => Antialiasing::Off,
            Some(samples) => Antialiasing::Samples(samples),
        }
    }
}

/// Declares how the compositor should treat the swapchain alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAlpha {
    /// Frames fully cover the surface without transparency.
    Opaque,
    /// Frames carry transparency and should be blended by the compositor,
    /// letting the field sit under other page content.
    Transparent,
}

impl Default for SurfaceAlpha {
    fn default() -> Self {
        Self::Transparent
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `SurfaceConfig` mirrors the CLI flags and the TOML sections: effect
/// tuning, palette stops, autopilot timing, and presentation knobs for the
/// window that hosts the surface.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Title of the hosting window.
    pub title: String,
    /// Whether the hosting window is shown (hidden is useful for smoke runs).
    pub visible: bool,
    /// Per-frame shader tuning scalars.
    pub effect: EffectSettings,
    /// Raw palette stops; malformed input falls back inside the palette
    /// generator rather than failing construction.
    pub palette_stops: Vec<String>,
    /// Idle-motion controller settings.
    pub autopilot: AutopilotSettings,
    /// Fraction of device pixels used for the backing store.
    pub resolution_scale: f32,
    /// Optional FPS cap; `None` renders every refresh.
    pub target_fps: Option<f32>,
    /// Optional fixed simulation step instead of wall-clock delta time.
    pub time_step: Option<Duration>,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Alpha behaviour of the swapchain.
    pub surface_alpha: SurfaceAlpha,
}

impl SurfaceConfig {
    /// Builds a renderer configuration from a validated [`FieldConfig`].
    pub fn from_field_config(config: &FieldConfig) -> Self {
        let fps = config.surface.fps.filter(|fps| *fps > 0.0);
        Self {
            effect: config.effect.clone(),
            palette_stops: config.palette.stops.clone(),
            autopilot: config.autopilot.clone(),
            resolution_scale: config.surface.resolution_scale,
            target_fps: fps,
            time_step: config.surface.time_step,
            antialiasing: config.surface.antialias.into(),
            ..Self::default()
        }
    }
}

impl Default for SurfaceConfig {
    /// Provides a 1280x720 visible surface with the default effect.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "Driftfield".to_string(),
            visible: true,
            effect: EffectSettings::default(),
            palette_stops: fieldconfig::PaletteSettings::default().stops,
            autopilot: AutopilotSettings::default(),
            resolution_scale: 1.0,
            target_fps: None,
            time_step: None,
            antialiasing: Antialiasing::default(),
            surface_alpha: SurfaceAlpha::default(),
        }
    }
}

/// Computes the backing-store extent for a container of the given physical
/// size: device pixel ratio capped at [`MAX_PIXEL_RATIO`], then the
/// configured resolution fraction, never collapsing to zero.
///
/// `container` is already in physical pixels (winit reports scaled sizes), so
/// the cap is applied as a reduction factor for ratios beyond the ceiling.
pub fn backing_dimensions(
    container: PhysicalSize<u32>,
    scale_factor: f64,
    resolution_scale: f32,
) -> PhysicalSize<u32> {
    let ratio = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    let cap = ratio.min(MAX_PIXEL_RATIO) / ratio;
    let fraction = f64::from(resolution_scale.clamp(f32::EPSILON, 1.0));
    let scale = cap * fraction;

    PhysicalSize::new(
        ((f64::from(container.width) * scale).round() as u32).max(1),
        ((f64::from(container.height) * scale).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_matches_container_at_unit_scale() {
        let size = backing_dimensions(PhysicalSize::new(1920, 1080), 1.0, 1.0);
        assert_eq!((size.width, size.height), (1920, 1080));
    }

    #[test]
    fn backing_caps_dense_displays_at_two_x() {
        // A 3x display reporting 3000 physical pixels for a 1000px container
        // is clamped to the 2x budget: 2000 pixels.
        let size = backing_dimensions(PhysicalSize::new(3000, 1500), 3.0, 1.0);
        assert_eq!((size.width, size.height), (2000, 1000));
    }

    #[test]
    fn backing_applies_resolution_fraction() {
        let size = backing_dimensions(PhysicalSize::new(1000, 500), 1.0, 0.5);
        assert_eq!((size.width, size.height), (500, 250));

        let capped = backing_dimensions(PhysicalSize::new(3000, 1500), 3.0, 0.5);
        assert_eq!((capped.width, capped.height), (1000, 500));
    }

    #[test]
    fn backing_never_collapses_to_zero() {
        let size = backing_dimensions(PhysicalSize::new(1, 1), 4.0, 0.1);
        assert!(size.width >= 1 && size.height >= 1);
    }

    #[test]
    fn antialias_setting_maps_onto_policy() {
        assert_eq!(
            Antialiasing::from(AntialiasSetting::Auto),
            Antialiasing::Auto
        );
        assert_eq!(Antialiasing::from(AntialiasSetting::Off), Antialiasing::Off);
        assert_eq!(
            Antialiasing::from(AntialiasSetting::Samples8),
            Antialiasing::Samples(8)
        );
    }
}
