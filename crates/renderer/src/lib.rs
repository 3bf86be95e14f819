//! Renderer crate for Driftfield, the interactive shader-driven field
//! surface.
//!
//! The crate glues the winit window, the `wgpu` pipeline, and the autonomous
//! drive controller together. The overall flow is:
//!
//! ```text
//!   CLI / embedder
//!          │ SurfaceConfig
//!          ▼
//!   Renderer::run ──▶ view loop ──▶ frame()
//!          ▲              │            │
//!          │       pointer events      ├─▶ DriveController ─▶ mouse uniform
//!          │        (SampleSlot)       └─▶ GpuState ─▶ uniforms ─▶ draw
//! ```
//!
//! `GpuState` owns all GPU resources (surface, device, pipeline, palette,
//! uniforms) while `Renderer` and [`ViewRuntime`] are the thin entry points:
//! the former drives the loop on the calling thread, the latter mounts it on
//! a dedicated thread and hands back an idempotent shutdown handle. The
//! fragment shader computes a multi-octave noise field perturbed by the
//! mouse uniform and maps it through a palette lookup texture; its CPU twin
//! lives in [`field`] so the numeric contract stays testable.

pub mod field;
mod gpu;
pub mod palette;
pub mod runtime;
mod shader;
mod types;
mod view;

use anyhow::Result;

pub use runtime::{
    time_source_for_step, BoxedTimeSource, FixedStepTimeSource, FrameClock, SystemTimeSource,
    TimeSample, TimeSource,
};
pub use types::{backing_dimensions, Antialiasing, SurfaceAlpha, SurfaceConfig, MAX_PIXEL_RATIO};
pub use view::ViewRuntime;

/// High-level entry point that owns the chosen configuration.
///
/// The heavy lifting lives inside the view loop; `Renderer` simply forwards
/// the request and blocks until the surface is closed.
pub struct Renderer {
    config: SurfaceConfig,
}

impl Renderer {
    /// Builds a renderer for the supplied configuration.
    pub fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }

    /// Opens the surface window and drives the render loop on the calling
    /// thread. Returns an error if GPU acquisition or shader compilation
    /// fails; the loop is never entered in that case.
    pub fn run(&mut self) -> Result<()> {
        view::run_blocking(&self.config)
    }
}
