//! Embedded GLSL for the field effect.
//!
//! Both stages are static Vulkan-profile GLSL compiled through wgpu's naga
//! frontend. The fragment stage is the GPU twin of [`crate::field`]; the
//! noise, influence, and quantization terms must stay in lockstep with the
//! CPU reference there.

use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

/// Compiles the field fragment shader.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("field fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(FRAGMENT_SHADER_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Minimal full-screen triangle vertex shader. `v_uv` lands in [0,1] with a
/// bottom-left origin, matching the normalized pointer-sample space.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Field fragment shader. The uniform block layout must match
/// `FieldUniforms` in `gpu/uniforms.rs` (std140).
const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform FieldParams {
    vec4 _resolution;   // width, height, aspect, mirrored time
    vec4 _mouse;        // normalized cursor x/y; zw unused
    vec4 _timing;       // time, delta, force, cursor radius
    vec4 _wave;         // amplitude, frequency, speed, viscosity
    vec4 _shape;        // color levels; yzw unused
} ubo;

layout(set = 1, binding = 0) uniform texture2D palette_texture;
layout(set = 1, binding = 1) uniform sampler palette_sampler;

// Fixed output alpha for compositing the surface under page content.
const float FIELD_ALPHA = 0.9;

float hash21(vec2 p) {
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453123);
}

float valueNoise(vec2 p) {
    vec2 i = floor(p);
    vec2 f = fract(p);

    float a = hash21(i);
    float b = hash21(i + vec2(1.0, 0.0));
    float c = hash21(i + vec2(0.0, 1.0));
    float d = hash21(i + vec2(1.0, 1.0));

    vec2 u = f * f * (3.0 - 2.0 * f);
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

float fbm(vec2 p) {
    float c = cos(0.5);
    float s = sin(0.5);
    mat2 rot = mat2(c, s, -s, c);
    float value = 0.0;
    float amplitude = 0.5;
    for (int octave = 0; octave < 5; octave++) {
        value += amplitude * valueNoise(p);
        p = rot * p * 2.0 + vec2(100.0, 100.0);
        amplitude *= 0.5;
    }
    return value;
}

void main() {
    float aspect = ubo._resolution.z;
    vec2 p = vec2(v_uv.x * aspect, v_uv.y);
    vec2 m = vec2(ubo._mouse.x * aspect, ubo._mouse.y);

    float drift = ubo._timing.x * ubo._wave.z;
    float n = fbm(p * ubo._wave.y + vec2(drift, drift * 0.7));

    float field = 0.5 + ubo._wave.x * (n - 0.5);
    float dist = distance(p, m);
    field += ubo._timing.z * (1.0 - smoothstep(0.0, ubo._timing.w, dist));
    field = mix(field, 0.5, ubo._wave.w);
    field = clamp(field, 0.0, 1.0);

    float levels = max(ubo._shape.x, 1.0);
    float band = (min(floor(field * levels), levels - 1.0) + 0.5) / levels;
    vec3 rgb = texture(sampler2D(palette_texture, palette_sampler), vec2(band, 0.5)).rgb;

    outColor = vec4(rgb * FIELD_ALPHA, FIELD_ALPHA);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_declares_the_uniform_block_fields() {
        for field in ["_resolution", "_mouse", "_timing", "_wave", "_shape"] {
            assert!(FRAGMENT_SHADER_GLSL.contains(field), "missing {field}");
        }
        assert!(FRAGMENT_SHADER_GLSL.contains("std140"));
    }

    #[test]
    fn fragment_mirrors_the_cpu_octave_count() {
        let loop_bound = format!("octave < {}", crate::field::OCTAVES);
        assert!(FRAGMENT_SHADER_GLSL.contains(&loop_bound));
    }
}
