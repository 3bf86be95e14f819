use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use autodrive::{DriveController, PointerSample, SampleSlot};
use crossbeam_channel::{bounded, Sender};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::runtime::{time_source_for_step, FrameClock, TimeSample};
use crate::types::{backing_dimensions, SurfaceAlpha, SurfaceConfig};

/// Commands delivered to a running view loop through its event-loop proxy.
#[derive(Debug, Clone)]
pub(crate) enum ViewCommand {
    Shutdown,
}

/// Per-mount state shared between the event handlers and the frame step.
///
/// Owns the GPU resources, the latest-sample mailbox, and the drive
/// controller; everything is touched from the loop thread only, so the
/// uniform set has exactly one writer.
struct ViewState {
    window: Arc<Window>,
    gpu: GpuState,
    slot: SampleSlot,
    controller: DriveController,
    resolution_scale: f32,
    scale_factor: f64,
}

impl ViewState {
    fn new(window: Arc<Window>, config: &SurfaceConfig) -> Result<Self> {
        let scale_factor = window.scale_factor();
        let backing =
            backing_dimensions(window.inner_size(), scale_factor, config.resolution_scale);
        let gpu = GpuState::new(window.as_ref(), backing, config)?;
        let controller = DriveController::new(&config.autopilot)?;

        Ok(Self {
            window,
            gpu,
            slot: SampleSlot::new(),
            controller,
            resolution_scale: config.resolution_scale,
            scale_factor,
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    /// Converts a cursor event into a normalized sample and parks it in the
    /// mailbox; GPU state is never touched from the event callback.
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        let size = self.window.inner_size();
        self.slot.offer(PointerSample::from_physical(
            (position.x, position.y),
            (size.width, size.height),
            Instant::now(),
        ));
    }

    /// Reacts to container resizes by re-deriving the backing store. The
    /// resolution uniform is updated in the same call, before the next frame.
    fn resize(&mut self, container: PhysicalSize<u32>) {
        self.gpu
            .resize(backing_dimensions(container, self.scale_factor, self.resolution_scale));
    }

    fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    /// Same-size swapchain rebuild after a lost or outdated surface.
    fn reconfigure(&mut self) {
        self.gpu.resize(self.gpu.size());
    }

    /// One simulation step: route the mouse uniform, then draw.
    fn frame(&mut self, sample: TimeSample) -> Result<(), wgpu::SurfaceError> {
        if let Some(pointer) = self.slot.take() {
            let uniform = self.controller.observe(pointer);
            self.gpu.set_mouse(uniform);
        } else if let Some(orbit) = self
            .controller
            .advance(Instant::now(), Duration::from_secs_f32(sample.delta_seconds))
        {
            self.gpu.set_mouse(orbit);
        }
        self.gpu.render(sample)
    }
}

/// Runs the view loop on the calling thread until the window closes.
pub(crate) fn run_blocking(config: &SurfaceConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::<ViewCommand>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    drive_view(event_loop, config.clone(), None)
}

/// Handle to a view loop running on its own thread.
///
/// `spawn` is the mount operation; `shutdown` (or dropping the handle) is the
/// unmount. Teardown is idempotent: the join handle is taken exactly once, so
/// repeated shutdowns and the `Drop` backstop are no-ops after the first.
pub struct ViewRuntime {
    proxy: EventLoopProxy<ViewCommand>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl ViewRuntime {
    /// Mounts the surface on a dedicated thread and blocks until its GPU
    /// state is ready, so acquisition failures surface here rather than
    /// asynchronously.
    pub fn spawn(config: SurfaceConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("driftfield-view".into())
            .spawn(move || run_view_thread(config, ready_tx))
            .map_err(|err| anyhow!("failed to spawn view thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("view thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            join_handle: Some(handle),
        })
    }

    /// Stops scheduling frames and joins the loop thread. Safe to call at
    /// any point, including mid-frame; the in-flight frame completes and no
    /// further steps run.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.join_handle.take() else {
            return Ok(());
        };
        let _ = self.proxy.send_event(ViewCommand::Shutdown);
        handle
            .join()
            .map_err(|err| anyhow!("view thread panicked: {err:?}"))?
    }
}

impl Drop for ViewRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(ViewCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run_view_thread(
    config: SurfaceConfig,
    ready_tx: Sender<Result<EventLoopProxy<ViewCommand>>>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<ViewCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }
    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let wrapped = anyhow!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(wrapped.to_string())));
            return Err(wrapped);
        }
    };

    drive_view(event_loop, config, Some(ready_tx))
}

/// Builds the window and state, then drives the event loop to completion.
///
/// When `ready_tx` is present the caller is blocked on the handshake; it
/// receives either the loop proxy (after GPU init succeeded) or the single
/// diagnostic describing why the mount was aborted.
fn drive_view(
    event_loop: EventLoop<ViewCommand>,
    config: SurfaceConfig,
    ready_tx: Option<Sender<Result<EventLoopProxy<ViewCommand>>>>,
) -> Result<()> {
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let mut builder = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(window_size)
        .with_transparent(config.surface_alpha == SurfaceAlpha::Transparent);
    if !config.visible {
        builder = builder.with_visible(false);
    }
    let window = match builder.build(&event_loop) {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let wrapped = anyhow!("failed to create surface window: {err}");
            if let Some(tx) = &ready_tx {
                let _ = tx.send(Err(anyhow!(wrapped.to_string())));
            }
            return Err(wrapped);
        }
    };

    let mut state = match ViewState::new(window, &config) {
        Ok(state) => state,
        Err(err) => {
            let wrapped = err.context("failed to initialise field surface");
            if let Some(tx) = &ready_tx {
                let _ = tx.send(Err(anyhow!(wrapped.to_string())));
            }
            return Err(wrapped);
        }
    };

    if let Some(tx) = &ready_tx {
        let _ = tx.send(Ok(proxy));
    }

    let mut clock = FrameClock::new(config.target_fps);
    let mut time_source = time_source_for_step(config.time_step);
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| {
            match event {
                Event::UserEvent(ViewCommand::Shutdown) => {
                    elwt.exit();
                }
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            elwt.exit();
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            state.handle_cursor_moved(position);
                        }
                        WindowEvent::Resized(new_size) => {
                            state.resize(new_size);
                        }
                        WindowEvent::ScaleFactorChanged {
                            scale_factor,
                            mut inner_size_writer,
                        } => {
                            state.set_scale_factor(scale_factor);
                            let current = state.window().inner_size();
                            let _ = inner_size_writer.request_inner_size(current);
                            state.resize(current);
                        }
                        WindowEvent::RedrawRequested => {
                            match state.frame(time_source.sample()) {
                                Ok(()) => {}
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    state.reconfigure();
                                }
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    tracing::error!("surface out of memory; exiting view loop");
                                    elwt.exit();
                                }
                                Err(wgpu::SurfaceError::Timeout) => {
                                    tracing::warn!("surface timeout; retrying next frame");
                                }
                                Err(other) => {
                                    tracing::warn!(error = ?other, "surface error; retrying next frame");
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    let now = Instant::now();
                    if clock.ready(now) {
                        state.window().request_redraw();
                        elwt.set_control_flow(ControlFlow::Wait);
                    } else if let Some(deadline) = clock.next_deadline(now) {
                        elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                    } else {
                        elwt.set_control_flow(ControlFlow::Wait);
                    }
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}
