//! CPU reference of the field computed by the fragment shader.
//!
//! The GLSL in [`crate::shader`] mirrors these functions term for term; keep
//! the two in sync when tuning the effect. The reference exists so the
//! numeric contract (vanishing influence at zero force, lattice continuity,
//! quantization band count) can be asserted without a GPU device.

use fieldconfig::EffectSettings;

/// Number of noise octaves summed by [`fbm`].
pub const OCTAVES: usize = 5;

fn fract(value: f32) -> f32 {
    value - value.floor()
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Pseudo-random scalar for an integer lattice point.
pub fn hash(p: [f32; 2]) -> f32 {
    fract((p[0] * 12.9898 + p[1] * 78.233).sin() * 43758.5453123)
}

/// Continuous 2-D value noise: random corner values blended with a Hermite
/// curve, so adjacent lattice cells share their boundary values.
pub fn value_noise(p: [f32; 2]) -> f32 {
    let ix = p[0].floor();
    let iy = p[1].floor();
    let fx = fract(p[0]);
    let fy = fract(p[1]);

    let a = hash([ix, iy]);
    let b = hash([ix + 1.0, iy]);
    let c = hash([ix, iy + 1.0]);
    let d = hash([ix + 1.0, iy + 1.0]);

    let ux = fx * fx * (3.0 - 2.0 * fx);
    let uy = fy * fy * (3.0 - 2.0 * fy);

    mix(mix(a, b, ux), mix(c, d, ux), uy)
}

/// Fractal sum of [`OCTAVES`] noise octaves, amplitude halving and frequency
/// doubling per octave, with a per-octave rotation to reduce axial bias.
pub fn fbm(p: [f32; 2]) -> f32 {
    let (sin_r, cos_r) = 0.5f32.sin_cos();
    let mut point = p;
    let mut value = 0.0;
    let mut amplitude = 0.5;
    for _ in 0..OCTAVES {
        value += amplitude * value_noise(point);
        point = [
            (cos_r * point[0] - sin_r * point[1]) * 2.0 + 100.0,
            (sin_r * point[0] + cos_r * point[1]) * 2.0 + 100.0,
        ];
        amplitude *= 0.5;
    }
    value
}

/// Localized pointer influence: a smooth falloff from `force` at the cursor
/// to exactly zero at `radius` and beyond. With `force == 0` the term is
/// exactly zero everywhere, leaving no residual bias.
pub fn influence(p: [f32; 2], mouse: [f32; 2], force: f32, radius: f32) -> f32 {
    let dx = p[0] - mouse[0];
    let dy = p[1] - mouse[1];
    let dist = (dx * dx + dy * dy).sqrt();
    force * (1.0 - smoothstep(0.0, radius, dist))
}

/// The scalar field before palette lookup, for a pixel at normalized `uv`.
///
/// `aspect` is width/height; both the pixel and the mouse position are
/// aspect-corrected on the x axis so the influence falloff stays circular on
/// non-square viewports.
pub fn field_value(
    uv: [f32; 2],
    mouse: [f32; 2],
    time: f32,
    aspect: f32,
    effect: &EffectSettings,
) -> f32 {
    let p = [uv[0] * aspect, uv[1]];
    let m = [mouse[0] * aspect, mouse[1]];

    let drift = time * effect.wave_speed;
    let noise = fbm([
        p[0] * effect.wave_frequency + drift,
        p[1] * effect.wave_frequency + drift * 0.7,
    ]);

    let mut field = 0.5 + effect.wave_amplitude * (noise - 0.5);
    field += influence(p, m, effect.force, effect.cursor_radius);
    field = mix(field, 0.5, effect.effective_viscosity());
    field.clamp(0.0, 1.0)
}

/// Quantizes a field value into `levels` discrete bands and returns the
/// palette lookup coordinate for the band center.
pub fn quantize(value: f32, levels: u32) -> f32 {
    let levels = levels.max(1) as f32;
    let band = (value.clamp(0.0, 1.0) * levels).floor().min(levels - 1.0);
    (band + 0.5) / levels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect() -> EffectSettings {
        EffectSettings::default()
    }

    #[test]
    fn field_is_deterministic() {
        let a = field_value([0.3, 0.7], [0.5, 0.5], 1.25, 16.0 / 9.0, &effect());
        let b = field_value([0.3, 0.7], [0.5, 0.5], 1.25, 16.0 / 9.0, &effect());
        assert_eq!(a, b);
    }

    #[test]
    fn zero_force_makes_field_independent_of_mouse() {
        let mut settings = effect();
        settings.force = 0.0;
        for uv in [[0.1, 0.1], [0.5, 0.5], [0.92, 0.37]] {
            let near = field_value(uv, uv, 2.0, 1.6, &settings);
            let far = field_value(uv, [1.0 - uv[0], 1.0 - uv[1]], 2.0, 1.6, &settings);
            assert_eq!(near, far);
        }
    }

    #[test]
    fn influence_is_zero_at_and_beyond_the_radius() {
        assert_eq!(influence([0.8, 0.5], [0.2, 0.5], 1.0, 0.25), 0.0);
        assert_eq!(influence([0.45, 0.5], [0.2, 0.5], 1.0, 0.25), 0.0);
        assert!(influence([0.3, 0.5], [0.2, 0.5], 1.0, 0.25) > 0.0);
    }

    #[test]
    fn influence_peaks_at_the_cursor() {
        let at_cursor = influence([0.4, 0.6], [0.4, 0.6], 0.8, 0.25);
        assert!((at_cursor - 0.8).abs() < 1e-6);
        let nearby = influence([0.45, 0.6], [0.4, 0.6], 0.8, 0.25);
        assert!(nearby < at_cursor && nearby > 0.0);
    }

    #[test]
    fn noise_is_continuous_across_lattice_boundaries() {
        for y in [0.25, 1.5, 7.75] {
            let below = value_noise([1.0 - 1e-3, y]);
            let above = value_noise([1.0 + 1e-3, y]);
            assert!((below - above).abs() < 1e-2, "seam at y={y}");
        }
        let below = fbm([3.0 - 1e-3, 0.4]);
        let above = fbm([3.0 + 1e-3, 0.4]);
        assert!((below - above).abs() < 5e-2);
    }

    #[test]
    fn noise_stays_within_the_fractal_envelope() {
        // Amplitudes 0.5 + 0.25 + ... bound the octave sum just under 1.
        for i in 0..64 {
            let p = [i as f32 * 0.37, i as f32 * 0.59];
            let value = fbm(p);
            assert!((0.0..1.0).contains(&value), "fbm({p:?}) = {value}");
        }
    }

    #[test]
    fn field_animates_over_time() {
        let early = field_value([0.4, 0.4], [0.5, 0.5], 0.0, 1.0, &effect());
        let late = field_value([0.4, 0.4], [0.5, 0.5], 5.0, 1.0, &effect());
        assert_ne!(early, late);
    }

    #[test]
    fn full_viscosity_pins_the_field_to_the_midpoint() {
        let mut settings = effect();
        settings.viscous = true;
        settings.viscosity = 1.0;
        let value = field_value([0.2, 0.9], [0.6, 0.3], 3.0, 1.4, &settings);
        assert!((value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn quantize_produces_exactly_the_requested_bands() {
        let levels = 6;
        let mut seen = std::collections::BTreeSet::new();
        for i in 0..=1000 {
            let coord = quantize(i as f32 / 1000.0, levels);
            assert!(coord > 0.0 && coord < 1.0);
            seen.insert((coord * 1e6) as i64);
        }
        assert_eq!(seen.len(), levels as usize);
    }
}
