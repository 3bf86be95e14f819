use bytemuck::{Pod, Zeroable};
use fieldconfig::EffectSettings;

use crate::runtime::TimeSample;

/// CPU-side mirror of the field uniform block.
///
/// The layout matches the `FieldParams` block declared in the fragment GLSL
/// and therefore must observe std140 alignment rules; five vec4 slots keep
/// that trivially true. The fourth component of `resolution` mirrors the
/// elapsed time so a front-end that collapses padding still sees an
/// animating value.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct FieldUniforms {
    /// Width, height, aspect (w/h), mirrored time.
    pub resolution: [f32; 4],
    /// Normalized cursor position in xy; zw unused.
    pub mouse: [f32; 4],
    /// Elapsed time, delta time, force magnitude, cursor radius.
    pub timing: [f32; 4],
    /// Wave amplitude, frequency, speed, effective viscosity.
    pub wave: [f32; 4],
    /// Color level count; yzw unused.
    pub shape: [f32; 4],
}

unsafe impl Zeroable for FieldUniforms {}
unsafe impl Pod for FieldUniforms {}

impl FieldUniforms {
    /// Prepares a uniform block sized to the current surface with the mouse
    /// parked on the surface midpoint.
    pub fn new(width: u32, height: u32, effect: &EffectSettings) -> Self {
        let mut uniforms = Self {
            resolution: [0.0; 4],
            mouse: [0.5, 0.5, 0.0, 0.0],
            timing: [0.0, 0.0, effect.force, effect.cursor_radius],
            wave: [
                effect.wave_amplitude,
                effect.wave_frequency,
                effect.wave_speed,
                effect.effective_viscosity(),
            ],
            shape: [effect.color_levels as f32, 0.0, 0.0, 0.0],
        };
        uniforms.set_resolution(width as f32, height as f32);
        uniforms
    }

    /// Writes the current backing-store dimensions and derived aspect ratio.
    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution[0] = width;
        self.resolution[1] = height;
        self.resolution[2] = width / height.max(1.0);
    }

    pub fn set_mouse(&mut self, position: [f32; 2]) {
        self.mouse[0] = position[0];
        self.mouse[1] = position[1];
    }

    pub fn update_time(&mut self, sample: TimeSample) {
        self.timing[0] = sample.seconds;
        self.timing[1] = sample.delta_seconds;
        self.resolution[3] = sample.seconds;
    }
}
