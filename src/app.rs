use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, NotCurrentGlContextSurfaceAccessor,
    PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, WindowSurface};

use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use log::{error, info};

use std::ffi::CString;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;

use thiserror::Error;

use winit::dpi::{PhysicalPosition, PhysicalSize, Size};
use winit::event::{Event, WindowEvent};
use winit::error::OsError;
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use gl_wrapper::NativeGl;

use raytracing::{
    FrameTarget, PresentError, RenderSurface, SurfaceConfig, SurfaceError, SurfaceEvent,
    SurfaceStatus,
};

pub struct App {
    event_loop: EventLoop<()>,
    surface: RenderSurface<NativeGl, GlTarget>,
}

impl App {
    pub fn new(config: &SurfaceConfig) -> Result<Self, AppError> {
        let event_loop = EventLoop::new();
        let window_builder = WindowBuilder::new()
            .with_inner_size(Size::Physical(PhysicalSize::new(config.width, config.height)))
            .with_min_inner_size(Size::Physical(PhysicalSize::new(32, 32)))
            .with_title(config.title.as_str());
        let template = ConfigTemplateBuilder::new().build();

        let gl_display = create_display(&event_loop)?;
        let gl_config = first_config(unsafe { gl_display.find_configs(template)? })?;

        let window = glutin_winit::finalize_window(&event_loop, window_builder, &gl_config)?;
        center_window(&window);

        let handle = Some(window.raw_window_handle());

        let (major, minor) = config.gl_version;
        let context_attr = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .build(handle);

        let gl_window = GlWindow::new(window, &gl_display, &gl_config)?;

        let gl_context = unsafe { gl_display.create_context(&gl_config, &context_attr)? }
            .make_current(&gl_window.surface)?;

        let backend = Rc::new(NativeGl::load_with(|s| match CString::new(s) {
            Ok(s) => gl_display.get_proc_address(s.as_c_str()).cast(),
            Err(_) => std::ptr::null(),
        }));

        info!(
            "Created {}x{} window with OpenGL {major}.{minor} context",
            config.width, config.height
        );

        let target = GlTarget {
            window: gl_window,
            context: gl_context,
        };

        let mut surface = RenderSurface::new(backend, target, config);
        surface.handle(SurfaceEvent::Load)?;

        let size = surface.target().window.window.inner_size();
        surface.handle(SurfaceEvent::Resize(size.width, size.height))?;

        Ok(Self {
            event_loop,
            surface,
        })
    }

    pub fn run(self) -> ! {
        let Self {
            event_loop,
            mut surface,
        } = self;

        let mut last_frame = Instant::now();

        event_loop.run(move |event, _window_target, control_flow| {
            control_flow.set_poll();
            match event {
                Event::MainEventsCleared => {
                    if surface.status() == SurfaceStatus::Loaded {
                        surface.target().window.window.request_redraw();
                    }
                }
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::Resized(size) => {
                        report(surface.handle(SurfaceEvent::Resize(size.width, size.height)));
                    }
                    WindowEvent::CloseRequested => {
                        report(surface.handle(SurfaceEvent::Close));
                        control_flow.set_exit();
                    }
                    _ => (),
                },
                Event::RedrawRequested(_) => {
                    if surface.status() != SurfaceStatus::Loaded {
                        return;
                    }

                    let now = Instant::now();
                    let delta = now.duration_since(last_frame).as_secs_f32();
                    last_frame = now;

                    report(frame(&mut surface, delta));
                }
                _ => (),
            }
        })
    }
}

/// Update always goes before the render of the same frame.
fn frame(surface: &mut RenderSurface<NativeGl, GlTarget>, delta: f32) -> Result<(), SurfaceError> {
    surface.handle(SurfaceEvent::Update(delta))?;
    surface.handle(SurfaceEvent::Render)
}

fn report(res: Result<(), SurfaceError>) {
    if let Err(e) = res {
        error!("{e}");
    }
}

/// Same API order as `glutin_winit::DisplayBuilder`, without its infallible config picker.
fn create_display(event_loop: &EventLoop<()>) -> Result<Display, AppError> {
    #[cfg(all(unix, not(target_os = "macos"), not(target_os = "android")))]
    let preference = DisplayApiPreference::EglThenGlx(Box::new(
        winit::platform::unix::register_xlib_error_hook,
    ));

    #[cfg(windows)]
    let preference = DisplayApiPreference::WglThenEgl(None);

    #[cfg(target_os = "macos")]
    let preference = DisplayApiPreference::Cgl;

    Ok(unsafe { Display::new(event_loop.raw_display_handle(), preference)? })
}

/// EGL may answer a config query with nothing at all.
fn first_config<C>(mut configs: impl Iterator<Item = C>) -> Result<C, AppError> {
    configs.next().ok_or(AppError::NoConfig)
}

fn center_window(window: &Window) {
    let monitor = match window.current_monitor() {
        Some(monitor) => monitor,
        None => return,
    };

    let screen = monitor.size();
    let origin = monitor.position();
    let size = window.outer_size();

    let x = origin.x + (screen.width as i32 - size.width as i32) / 2;
    let y = origin.y + (screen.height as i32 - size.height as i32) / 2;

    window.set_outer_position(PhysicalPosition::new(x, y));
}

pub struct GlTarget {
    pub window: GlWindow,
    pub context: PossiblyCurrentContext,
}

impl FrameTarget for GlTarget {
    fn present(&self) -> Result<(), PresentError> {
        self.window
            .surface
            .swap_buffers(&self.context)
            .map_err(|e| PresentError(e.to_string()))
    }

    fn resize(&self, width: NonZeroU32, height: NonZeroU32) {
        self.window.surface.resize(&self.context, width, height);
    }
}

pub struct GlWindow {
    // XXX the surface must be dropped before the window.
    pub surface: Surface<WindowSurface>,
    pub window: Window,
}

impl GlWindow {
    pub fn new(window: Window, display: &Display, config: &Config) -> Result<Self, AppError> {
        let (width, height): (u32, u32) = window.inner_size().into();
        let raw_window_handle = window.raw_window_handle();
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            NonZeroU32::new(width).ok_or(AppError::ZeroSize)?,
            NonZeroU32::new(height).ok_or(AppError::ZeroSize)?,
        );

        let surface = unsafe { display.create_window_surface(config, &attrs)? };

        Ok(Self { window, surface })
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Display offers no matching GL config")]
    NoConfig,
    #[error("Could not create window: {0}")]
    Window(#[from] OsError),
    #[error("Window has zero size")]
    ZeroSize,
    #[error(transparent)]
    Gl(#[from] glutin::error::Error),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
