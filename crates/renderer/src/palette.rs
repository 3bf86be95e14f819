//! Palette texture generation.
//!
//! The palette is a 1xN lookup texture: one texel per configured color stop,
//! sampled with linear filtering and clamp-to-edge so the quantized field
//! value maps onto a smooth ramp. Texel generation is pure and deterministic;
//! only [`create_texture`] touches the GPU.

use fieldconfig::parse_color_stop;
use wgpu::util::{DeviceExt, TextureDataOrder};

/// Stop substituted when the configured list is empty or malformed.
pub const FALLBACK_STOP: [u8; 3] = [255, 255, 255];

/// Parses raw `#rrggbb` stops into texel colors.
///
/// An empty list or any malformed entry degrades the whole list to the
/// two-stop opaque-white default; this is a configuration fallback, not an
/// error. A single valid stop is duplicated to satisfy the minimum texture
/// width of two texels.
pub fn resolve_stops(raw: &[String]) -> Vec<[u8; 3]> {
    let parsed: Option<Vec<[u8; 3]>> = raw.iter().map(|stop| parse_color_stop(stop)).collect();

    let mut stops = match parsed {
        Some(stops) if !stops.is_empty() => stops,
        _ => {
            tracing::warn!(
                configured = raw.len(),
                "palette stops empty or malformed; falling back to opaque white"
            );
            vec![FALLBACK_STOP; 2]
        }
    };

    if stops.len() == 1 {
        let only = stops[0];
        stops.push(only);
    }
    stops
}

/// Expands stop colors into the RGBA byte row uploaded to the GPU. Every
/// texel is fully opaque; output alpha is applied in the shader.
pub fn texel_data(stops: &[[u8; 3]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(stops.len() * 4);
    for [r, g, b] in stops {
        data.extend_from_slice(&[*r, *g, *b, 255]);
    }
    data
}

/// GPU-resident palette: texture, view, and sampler share the lifetime of the
/// render context that created them.
pub(crate) struct PaletteTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Uploads the palette row. No mipmaps; linear filtering; clamp-to-edge.
pub(crate) fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    stops: &[[u8; 3]],
) -> PaletteTexture {
    let data = texel_data(stops);
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("palette texture"),
            size: wgpu::Extent3d {
                width: stops.len().max(1) as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &data,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    PaletteTexture {
        _texture: texture,
        view,
        sampler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(stops: &[&str]) -> Vec<String> {
        stops.iter().map(|stop| stop.to_string()).collect()
    }

    #[test]
    fn identical_stop_lists_produce_identical_texels() {
        let stops = raw(&["#0b1026", "#2d6ea8", "#f2f5f7"]);
        let first = texel_data(&resolve_stops(&stops));
        let second = texel_data(&resolve_stops(&stops));
        assert_eq!(first, second);
        assert_eq!(first.len(), 12);
    }

    #[test]
    fn single_stop_is_duplicated() {
        let stops = resolve_stops(&raw(&["#336699"]));
        assert_eq!(stops, vec![[0x33, 0x66, 0x99], [0x33, 0x66, 0x99]]);
        let data = texel_data(&stops);
        assert_eq!(data, vec![0x33, 0x66, 0x99, 255, 0x33, 0x66, 0x99, 255]);
    }

    #[test]
    fn empty_list_falls_back_to_white() {
        let stops = resolve_stops(&[]);
        assert_eq!(stops, vec![FALLBACK_STOP, FALLBACK_STOP]);
    }

    #[test]
    fn malformed_entry_degrades_the_whole_list() {
        let stops = resolve_stops(&raw(&["#0b1026", "teal", "#f2f5f7"]));
        assert_eq!(stops, vec![FALLBACK_STOP, FALLBACK_STOP]);
    }

    #[test]
    fn texels_are_fully_opaque() {
        let data = texel_data(&resolve_stops(&raw(&["#010203", "#040506"])));
        for texel in data.chunks(4) {
            assert_eq!(texel[3], 255);
        }
    }
}
