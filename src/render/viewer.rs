//! The display loop: one window, one canvas texture, one input event per tick.

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use tracing::{debug, error, info, warn};
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key as WinitKey, NamedKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::Configuration;
use crate::error::Error;
use crate::events::{Flow, InputEvent, Key, PointerButton, ScrollDirection};
use crate::input::{self, InputQueue};
use crate::processing::composite::{CompositeFrame, composite};
use crate::processing::layout::{
    LetterboxRect, fold_into_image, letterbox, ndc_scale, window_to_canvas,
};
use crate::source::SourceImage;
use crate::state::EditState;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD: [Vertex; 4] = [
    //   NDC pos         UV
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    }, // bottom-left
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    }, // bottom-right
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    }, // top-left
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    }, // top-right
];

const VERTEX_ATTRS: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

/// Open the window and run until the user quits.
///
/// The window and GPU resources are dropped on every exit path.
///
/// # Errors
/// Returns [`Error::Render`] if the event loop, window or GPU cannot be
/// set up, or if presenting a frame fails.
pub fn run(cfg: &Configuration, source: SourceImage, state: EditState) -> Result<(), Error> {
    let event_loop = EventLoop::new()
        .context("failed to build viewer event loop")
        .map_err(Error::Render)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(cfg.window_title.clone(), source, state);
    event_loop
        .run_app(&mut app)
        .context("viewer event loop failed")
        .map_err(Error::Render)?;

    match app.fatal.take() {
        Some(err) => Err(Error::Render(err)),
        None => {
            info!("viewer closed");
            Ok(())
        }
    }
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vbuf: wgpu::Buffer,
    params: wgpu::Buffer,
    canvas: wgpu::Texture,
    canvas_size: (u32, u32),
    letterbox: LetterboxRect,
}

impl Gpu {
    fn new(window: Arc<Window>, canvas_size: (u32, u32)) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let limits = adapter.limits();
        ensure!(
            canvas_size.0 <= limits.max_texture_dimension_2d
                && canvas_size.1 <= limits.max_texture_dimension_2d,
            "canvas {}x{} exceeds the GPU texture limit of {}",
            canvas_size.0,
            canvas_size.1,
            limits.max_texture_dimension_2d
        );
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("spot-light-device"),
            required_limits: limits,
            ..Default::default()
        }))
        .context("failed to acquire GPU device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let PhysicalSize { width, height } = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let canvas = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("canvas"),
            size: extent(canvas_size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let canvas_view = canvas.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("canvas-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // [sx, sy, 0, 0]
        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("canvas-params"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("canvas-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/canvas.wgsl").into()),
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("canvas-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("canvas-bind-group"),
            layout: &bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&canvas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("canvas-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("canvas-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRS,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let mut gpu = Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            bind_group,
            vbuf,
            params,
            canvas,
            canvas_size,
            letterbox: letterbox(canvas_size.0, canvas_size.1, width, height),
        };
        gpu.update_params();
        Ok(gpu)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.update_params();
        debug!(
            width = size.width,
            height = size.height,
            "viewer surface resized"
        );
    }

    fn update_params(&mut self) {
        let (cw, ch) = self.canvas_size;
        self.letterbox = letterbox(cw, ch, self.config.width, self.config.height);
        let scale = ndc_scale(&self.letterbox, self.config.width, self.config.height);
        self.queue
            .write_buffer(&self.params, 0, bytemuck::bytes_of(&scale));
    }

    fn render(&mut self, frame: &CompositeFrame) -> Result<()> {
        let rgba = frame.to_rgba8();
        let (w, h) = rgba.dimensions();
        ensure!(
            (w, h) == self.canvas_size,
            "frame {w}x{h} does not match canvas {}x{}",
            self.canvas_size.0,
            self.canvas_size.1
        );
        self.queue.write_texture(
            self.canvas.as_image_copy(),
            rgba.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            extent((w, h)),
        );

        let target = match self.surface.get_current_texture() {
            Ok(target) => target,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                warn!("viewer surface lost; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                return Ok(());
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context("failed to acquire surface texture"));
            }
        };
        let view = target
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("canvas-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                ..Default::default()
            });
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.vbuf.slice(..));
            rpass.draw(0..4, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        target.present();
        Ok(())
    }
}

fn extent((width, height): (u32, u32)) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

struct ViewerApp {
    initial_title: String,
    source: SourceImage,
    state: EditState,
    pending: InputQueue,
    scroll: ScrollAccumulator,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    shown_title: String,
    fatal: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(initial_title: String, source: SourceImage, state: EditState) -> Self {
        Self {
            initial_title,
            source,
            state,
            pending: InputQueue::new(),
            scroll: ScrollAccumulator::default(),
            window: None,
            gpu: None,
            shown_title: String::new(),
            fatal: None,
        }
    }

    fn canvas_size(&self) -> (u32, u32) {
        (self.source.width() * 2, self.source.height() * 2)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!(error = ?err, "viewer failed; exiting");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (cw, ch) = self.canvas_size();
        let attrs = WindowAttributes::default()
            .with_title(self.initial_title.clone())
            .with_inner_size(PhysicalSize::new(cw, ch));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create viewer window")?,
        );
        self.window = Some(window.clone());
        self.gpu = Some(Gpu::new(window, (cw, ch))?);
        Ok(())
    }

    /// normalize → composite → render → title → one input event.
    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        self.state.normalize();
        let frame = composite(&self.source, &self.state);
        if let Some(gpu) = self.gpu.as_mut()
            && let Err(err) = gpu.render(&frame)
        {
            self.fail(event_loop, err);
            return;
        }
        self.update_title();

        if let Some(event) = self.pending.pop() {
            debug!(?event, "applying input event");
            if input::apply(&mut self.state, event) == Flow::Quit {
                info!("quit requested");
                event_loop.exit();
            }
        }
    }

    fn update_title(&mut self) {
        let title = self.state.title();
        if title == self.shown_title {
            return;
        }
        if let Some(window) = self.window.as_ref() {
            window.set_title(&title);
        }
        self.shown_title = title;
    }

    fn pointer_to_image(&self, pos: PhysicalPosition<f64>) -> Option<(i32, i32)> {
        let gpu = self.gpu.as_ref()?;
        let (cw, ch) = gpu.canvas_size;
        let canvas = window_to_canvas(&gpu.letterbox, cw, ch, (pos.x, pos.y));
        Some(fold_into_image(
            canvas,
            self.source.width(),
            self.source.height(),
        ))
    }
}

fn translate_key(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Named(NamedKey::Escape) => Some(Key::Escape),
        WinitKey::Named(NamedKey::Tab) => Some(Key::Tab),
        WinitKey::Character(text) => text.chars().next().map(Key::Char),
        _ => None,
    }
}

/// Pixel distance that counts as one wheel notch.
const PIXELS_PER_LINE: f64 = 40.0;

/// Turns wheel and trackpad deltas into whole scroll steps.
///
/// Pixel deltas accumulate until a full line has been scrolled; the
/// remainder carries over. Reversing direction drops the remainder.
#[derive(Debug, Default)]
struct ScrollAccumulator {
    pending: f64,
}

impl ScrollAccumulator {
    fn feed(&mut self, delta: MouseScrollDelta) -> Option<(ScrollDirection, u32)> {
        let dy = match delta {
            MouseScrollDelta::LineDelta(_, y) => f64::from(y) * PIXELS_PER_LINE,
            MouseScrollDelta::PixelDelta(pos) => pos.y,
        };
        if !dy.is_finite() || dy == 0.0 {
            return None;
        }
        if self.pending != 0.0 && self.pending.signum() != dy.signum() {
            self.pending = 0.0;
        }
        self.pending += dy;

        let steps = (self.pending.abs() / PIXELS_PER_LINE).floor();
        if steps < 1.0 {
            return None;
        }
        let sign = self.pending.signum();
        self.pending -= sign * steps * PIXELS_PER_LINE;
        let direction = if sign > 0.0 {
            ScrollDirection::Up
        } else {
            ScrollDirection::Down
        };
        Some((direction, steps as u32))
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
            return;
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((x, y)) = self.pointer_to_image(position) {
                    self.pending.push(InputEvent::PointerMoved { x, y });
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => {
                let button = match button {
                    MouseButton::Left => Some(PointerButton::Primary),
                    MouseButton::Right => Some(PointerButton::Secondary),
                    _ => None,
                };
                if let Some(button) = button {
                    self.pending.push(InputEvent::PointerPressed(button));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some((direction, steps)) = self.scroll.feed(delta) {
                    for _ in 0..steps {
                        self.pending.push(InputEvent::Scrolled(direction));
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && let Some(key) = translate_key(&event.logical_key)
                {
                    self.pending.push(InputEvent::KeyPressed(key));
                }
            }
            WindowEvent::RedrawRequested => self.tick(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels(y: f64) -> MouseScrollDelta {
        MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, y))
    }

    fn total_steps(
        acc: &mut ScrollAccumulator,
        deltas: impl IntoIterator<Item = MouseScrollDelta>,
    ) -> Vec<(ScrollDirection, u32)> {
        deltas.into_iter().filter_map(|d| acc.feed(d)).collect()
    }

    #[test]
    fn small_trackpad_swipe_is_below_one_step() {
        let mut acc = ScrollAccumulator::default();
        let steps = total_steps(&mut acc, std::iter::repeat_n(pixels(0.5), 20));
        assert!(steps.is_empty(), "{steps:?}");

        // The swipe leaves the edit value alone.
        let mut state = EditState::new(800);
        for (direction, n) in steps {
            for _ in 0..n {
                input::apply(&mut state, InputEvent::Scrolled(direction));
            }
        }
        assert_eq!(state.active_value(), 122);
    }

    #[test]
    fn pixel_deltas_accumulate_into_whole_lines() {
        let mut acc = ScrollAccumulator::default();
        // 100 x 2 px = 200 px = 5 lines, emitted as they complete.
        let steps = total_steps(&mut acc, std::iter::repeat_n(pixels(2.0), 100));
        assert!(steps.iter().all(|(d, _)| *d == ScrollDirection::Up));
        assert_eq!(steps.iter().map(|(_, n)| n).sum::<u32>(), 5);

        // A partial line stays pending until a later delta completes it.
        assert_eq!(acc.feed(pixels(-35.0)), None);
        assert_eq!(acc.feed(pixels(-10.0)), Some((ScrollDirection::Down, 1)));
    }

    #[test]
    fn large_pixel_delta_yields_several_steps() {
        let mut acc = ScrollAccumulator::default();
        assert_eq!(acc.feed(pixels(-130.0)), Some((ScrollDirection::Down, 3)));
        assert_eq!(acc.feed(pixels(-30.0)), Some((ScrollDirection::Down, 1)));
    }

    #[test]
    fn wheel_lines_map_to_steps() {
        let mut acc = ScrollAccumulator::default();
        assert_eq!(
            acc.feed(MouseScrollDelta::LineDelta(0.0, 1.0)),
            Some((ScrollDirection::Up, 1))
        );
        assert_eq!(
            acc.feed(MouseScrollDelta::LineDelta(0.0, -2.0)),
            Some((ScrollDirection::Down, 2))
        );
        assert_eq!(acc.feed(MouseScrollDelta::LineDelta(0.0, 0.0)), None);
    }
}
