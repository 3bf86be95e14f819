//! GPU orchestration for the field surface.
//!
//! - `context` owns wgpu instance/device/surface wiring and knows how to
//!   rebuild swapchain state when the backing store resizes.
//! - `pipeline` compiles the embedded GLSL into the render pipeline with the
//!   uniform and palette bind group layouts.
//! - `uniforms` mirrors the std140 uniform block and writes changes straight
//!   through the queue each frame.
//! - `state` glues everything together and exposes the `GpuState` API used
//!   by the view loop.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
