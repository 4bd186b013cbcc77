use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use gl_wrapper::geometry::{GBError, Geometry, GeometryBuilder, VertexAttribute};
use gl_wrapper::program::{Program, ProgramBuilder, ProgramError, UniformLocation};
use gl_wrapper::renderer::GlRenderer;
use gl_wrapper::{GlBackend, ShaderStage, QUAD_INDICES, QUAD_VERTICES};

use crate::config::SurfaceConfig;
use crate::target::{FrameTarget, PresentError};

/// Uniform carrying the seconds elapsed since load.
pub const TIME_UNIFORM: &str = "uTime";

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SurfaceEvent {
    Load,
    Resize(u32, u32),
    /// Seconds since the previous update.
    Update(f32),
    Render,
    Close,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SurfaceStatus {
    Uninitialized,
    Loaded,
    Closed,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Could not upload geometry: {0}")]
    Geometry(#[from] GBError),
    #[error("Could not create shader program: {0}")]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Present(#[from] PresentError),
    #[error("Surface is not loaded")]
    NotLoaded,
    #[error("Surface is already loaded")]
    AlreadyLoaded,
    #[error("Surface is closed")]
    Closed,
    #[error("Frame rendered before its update")]
    RenderBeforeUpdate,
    #[error("Invalid time delta {0}")]
    InvalidDelta(f32),
}

struct Scene<B: GlBackend> {
    geometry: Geometry<B>,
    program: Program<B>,
    time_location: UniformLocation,
}

enum SurfaceState<B: GlBackend> {
    Uninitialized,
    Loaded(Scene<B>),
    Closed,
}

/// Owns the quad and its program and drives them frame by frame.
///
/// Events go `load`, then any mix of `resize`, `update` and `render`, then
/// `close`. Every frame needs an `update` before its `render`.
pub struct RenderSurface<B: GlBackend, T: FrameTarget> {
    // XXX GPU objects must be dropped before the target owning the context.
    state: SurfaceState<B>,
    renderer: GlRenderer<B>,
    backend: Rc<B>,
    target: T,
    vertex_shader: PathBuf,
    fragment_shader: PathBuf,
    clear_color: [f32; 4],
    width: u32,
    height: u32,
    time: f32,
    updated: bool,
}

impl<B: GlBackend, T: FrameTarget> RenderSurface<B, T> {
    pub fn new(backend: Rc<B>, target: T, config: &SurfaceConfig) -> Self {
        Self {
            state: SurfaceState::Uninitialized,
            renderer: GlRenderer::new(Rc::clone(&backend)),
            backend,
            target,
            vertex_shader: config.vertex_shader.clone(),
            fragment_shader: config.fragment_shader.clone(),
            clear_color: config.clear_color,
            width: config.width,
            height: config.height,
            time: 0.0,
            updated: false,
        }
    }

    pub fn handle(&mut self, event: SurfaceEvent) -> Result<(), SurfaceError> {
        match event {
            SurfaceEvent::Load => self.load(),
            SurfaceEvent::Resize(width, height) => self.resize(width, height),
            SurfaceEvent::Update(delta) => self.update(delta),
            SurfaceEvent::Render => self.render(),
            SurfaceEvent::Close => self.close(),
        }
    }

    /// Uploads the quad and builds the program. Only allocation failures are errors,
    /// broken shaders leave an unlinked program behind.
    pub fn load(&mut self) -> Result<(), SurfaceError> {
        match self.state {
            SurfaceState::Uninitialized => {}
            SurfaceState::Loaded(_) => return Err(SurfaceError::AlreadyLoaded),
            SurfaceState::Closed => return Err(SurfaceError::Closed),
        }

        let geometry = GeometryBuilder::new(Rc::clone(&self.backend), &QUAD_VERTICES)
            .with_attribute(VertexAttribute::Vec3)
            .with_indices(&QUAD_INDICES)
            .build()?;

        let mut program = ProgramBuilder::new(Rc::clone(&self.backend))
            .with_stage_file(&self.vertex_shader, ShaderStage::Vertex)
            .with_stage_file(&self.fragment_shader, ShaderStage::Fragment)
            .build()?;

        let time_location = program.uniform_location(TIME_UNIFORM);

        info!(
            "Surface loaded: program {} linked: {}, {} at {}",
            program.get_id(),
            program.is_linked(),
            TIME_UNIFORM,
            time_location.get()
        );

        self.time = 0.0;
        self.updated = false;
        self.state = SurfaceState::Loaded(Scene {
            geometry,
            program,
            time_location,
        });

        Ok(())
    }

    /// Zero-sized (minimized) windows are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        if let SurfaceState::Closed = self.state {
            return Err(SurfaceError::Closed);
        }

        let (w, h) = match (NonZeroU32::new(width), NonZeroU32::new(height)) {
            (Some(w), Some(h)) => (w, h),
            _ => {
                debug!("Ignoring resize to {width}x{height}");
                return Ok(());
            }
        };

        self.target.resize(w, h);
        self.renderer.resize(width, height);
        self.width = width;
        self.height = height;

        debug!("Viewport resized to {width}x{height}");

        Ok(())
    }

    pub fn update(&mut self, delta: f32) -> Result<(), SurfaceError> {
        if let SurfaceState::Closed = self.state {
            return Err(SurfaceError::Closed);
        }

        if !delta.is_finite() || delta < 0.0 {
            return Err(SurfaceError::InvalidDelta(delta));
        }

        self.time += delta;
        self.updated = true;

        Ok(())
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let scene = match &self.state {
            SurfaceState::Loaded(scene) => scene,
            SurfaceState::Uninitialized => return Err(SurfaceError::NotLoaded),
            SurfaceState::Closed => return Err(SurfaceError::Closed),
        };

        if !self.updated {
            return Err(SurfaceError::RenderBeforeUpdate);
        }

        self.renderer.clear_color(self.clear_color);
        self.renderer.draw(
            &scene.geometry,
            &scene.program,
            &[(scene.time_location, self.time)],
        );
        // the frame is spent even if presenting it fails
        self.updated = false;

        self.target.present()?;

        Ok(())
    }

    /// Releases the GPU objects, every later event is rejected.
    pub fn close(&mut self) -> Result<(), SurfaceError> {
        if let SurfaceState::Closed = self.state {
            return Err(SurfaceError::Closed);
        }

        self.state = SurfaceState::Closed;
        info!("Surface closed after {:.2}s", self.time);

        Ok(())
    }

    pub fn status(&self) -> SurfaceStatus {
        match self.state {
            SurfaceState::Uninitialized => SurfaceStatus::Uninitialized,
            SurfaceState::Loaded(_) => SurfaceStatus::Loaded,
            SurfaceState::Closed => SurfaceStatus::Closed,
        }
    }

    /// Seconds accumulated since load.
    pub fn elapsed(&self) -> f32 {
        self.time
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// `None` until loaded.
    pub fn is_linked(&self) -> Option<bool> {
        match &self.state {
            SurfaceState::Loaded(scene) => Some(scene.program.is_linked()),
            _ => None,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use gl_wrapper::{GlCall, RecordingGl};

    const VERT: &str = "#version 330 core\n\
        layout (location = 0) in vec3 aPosition;\n\
        void main() { gl_Position = vec4(aPosition, 1.0); }";
    const FRAG: &str = "#version 330 core\n\
        uniform float uTime;\n\
        out vec4 color;\n\
        void main() { color = vec4(fract(uTime)); }";

    #[derive(Default)]
    struct FakeTarget {
        presents: Cell<usize>,
        size: Cell<Option<(u32, u32)>>,
        lost: Cell<bool>,
    }

    impl FrameTarget for FakeTarget {
        fn present(&self) -> Result<(), PresentError> {
            if self.lost.get() {
                return Err(PresentError("context lost".to_string()));
            }
            self.presents.set(self.presents.get() + 1);
            Ok(())
        }

        fn resize(&self, width: NonZeroU32, height: NonZeroU32) {
            self.size.set(Some((width.get(), height.get())));
        }
    }

    struct Shaders {
        dir: TempDir,
    }

    impl Shaders {
        fn write(vert: &str, frag: &str) -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("shader.vert"), vert).unwrap();
            std::fs::write(dir.path().join("shader.frag"), frag).unwrap();

            Self { dir }
        }

        fn config(&self) -> SurfaceConfig {
            config_for(self.dir.path())
        }
    }

    fn config_for(dir: &Path) -> SurfaceConfig {
        SurfaceConfig {
            vertex_shader: dir.join("shader.vert"),
            fragment_shader: dir.join("shader.frag"),
            ..Default::default()
        }
    }

    fn surface(
        config: &SurfaceConfig,
    ) -> (Rc<RecordingGl>, RenderSurface<RecordingGl, FakeTarget>) {
        let gl = Rc::new(RecordingGl::new());
        let surface = RenderSurface::new(Rc::clone(&gl), FakeTarget::default(), config);

        (gl, surface)
    }

    fn index_of(calls: &[GlCall], pred: impl Fn(&GlCall) -> bool) -> usize {
        calls.iter().position(|c| pred(c)).unwrap()
    }

    #[test]
    fn load_links_and_resolves_time() {
        let shaders = Shaders::write(VERT, FRAG);
        let (_gl, mut surface) = surface(&shaders.config());

        surface.load().unwrap();

        assert_eq!(surface.status(), SurfaceStatus::Loaded);
        assert_eq!(surface.is_linked(), Some(true));
        assert_eq!(surface.elapsed(), 0.0);
    }

    #[test]
    fn broken_fragment_still_renders() {
        let shaders = Shaders::write(VERT, "void main() { color = vec4(1.0);");
        let (gl, mut surface) = surface(&shaders.config());

        surface.load().unwrap();
        assert_eq!(surface.is_linked(), Some(false));

        surface.update(0.5).unwrap();
        surface.render().unwrap();

        assert_eq!(gl.draw_counts(), vec![6]);
        assert!(gl.uniform_writes().is_empty());
    }

    #[test]
    fn missing_shader_files_are_not_fatal() {
        let config = config_for(Path::new("no/such/dir"));
        let (_gl, mut surface) = surface(&config);

        surface.load().unwrap();

        assert_eq!(surface.is_linked(), Some(false));
    }

    #[test]
    fn time_accumulates_deltas() {
        let shaders = Shaders::write(VERT, FRAG);
        let (_gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();

        let deltas = [0.016_f32, 0.017, 0.0, 0.033, 0.25];
        let mut expected = 0.0_f32;
        let mut last = 0.0;

        for delta in deltas {
            surface.update(delta).unwrap();
            expected += delta;
            assert!(surface.elapsed() >= last);
            last = surface.elapsed();
        }

        assert_eq!(surface.elapsed(), expected);
    }

    #[test]
    fn invalid_delta_is_rejected() {
        let shaders = Shaders::write(VERT, FRAG);
        let (_gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();
        surface.update(1.0).unwrap();

        assert!(matches!(
            surface.update(-0.5),
            Err(SurfaceError::InvalidDelta(_))
        ));
        assert!(surface.update(f32::NAN).is_err());
        assert_eq!(surface.elapsed(), 1.0);
    }

    #[test]
    fn resize_updates_viewport() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());

        // allowed before load
        surface.resize(320, 200).unwrap();
        surface.load().unwrap();
        gl.clear_calls();

        surface.resize(1024, 768).unwrap();

        assert_eq!(surface.viewport(), (1024, 768));
        assert_eq!(surface.target().size.get(), Some((1024, 768)));
        assert_eq!(gl.calls(), vec![GlCall::Viewport(0, 0, 1024, 768)]);
    }

    #[test]
    fn minimized_window_keeps_viewport() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();
        gl.clear_calls();

        surface.resize(0, 0).unwrap();

        assert_eq!(surface.viewport(), (1280, 720));
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn every_frame_draws_two_triangles() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();

        for _ in 0..3 {
            surface.update(0.016).unwrap();
            surface.render().unwrap();
        }

        assert_eq!(gl.draw_counts(), vec![6, 6, 6]);
        assert_eq!(surface.target().presents.get(), 3);
    }

    #[test]
    fn frame_call_order() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();
        gl.clear_calls();

        surface.update(0.25).unwrap();
        surface.render().unwrap();

        let calls = gl.calls();
        let clear = index_of(&calls, |c| matches!(c, GlCall::ClearColor(..)));
        let bind_program = index_of(&calls, |c| matches!(c, GlCall::UseProgram(_)));
        let bind_geometry = index_of(&calls, |c| matches!(c, GlCall::BindVertexArray(_)));
        let uniform = index_of(&calls, |c| matches!(c, GlCall::Uniform1f(..)));
        let draw = index_of(&calls, |c| matches!(c, GlCall::DrawElements(_)));

        assert!(clear < bind_program);
        assert!(bind_program < bind_geometry);
        assert!(bind_geometry < uniform);
        assert!(uniform < draw);
        assert_eq!(calls[clear], GlCall::ClearColor(0.1, 0.3, 0.8, 0.5));
    }

    #[test]
    fn render_requires_load() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());
        surface.update(0.016).unwrap();

        assert!(matches!(surface.render(), Err(SurfaceError::NotLoaded)));
        assert!(gl.draw_counts().is_empty());
    }

    #[test]
    fn render_requires_update() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();

        assert!(matches!(
            surface.render(),
            Err(SurfaceError::RenderBeforeUpdate)
        ));

        surface.update(0.016).unwrap();
        surface.render().unwrap();
        assert!(matches!(
            surface.render(),
            Err(SurfaceError::RenderBeforeUpdate)
        ));
        assert_eq!(gl.draw_counts(), vec![6]);
    }

    #[test]
    fn failed_present_still_ends_the_frame() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();
        surface.target().lost.set(true);

        surface.update(0.016).unwrap();
        assert!(matches!(surface.render(), Err(SurfaceError::Present(_))));
        assert!(matches!(
            surface.render(),
            Err(SurfaceError::RenderBeforeUpdate)
        ));
        assert_eq!(gl.draw_counts(), vec![6]);

        surface.target().lost.set(false);
        surface.update(0.016).unwrap();
        surface.render().unwrap();
        assert_eq!(gl.draw_counts(), vec![6, 6]);
        assert_eq!(surface.target().presents.get(), 1);
    }

    #[test]
    fn load_only_once() {
        let shaders = Shaders::write(VERT, FRAG);
        let (_gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();

        assert!(matches!(surface.load(), Err(SurfaceError::AlreadyLoaded)));
    }

    #[test]
    fn allocation_failure_stops_load() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());
        gl.fail_allocations(true);

        assert!(matches!(
            surface.load(),
            Err(SurfaceError::Geometry(GBError::Allocation(_)))
        ));
        assert_eq!(surface.status(), SurfaceStatus::Uninitialized);
    }

    #[test]
    fn close_releases_gpu_objects() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());
        surface.load().unwrap();
        assert!(gl.live_objects() > 0);

        surface.handle(SurfaceEvent::Close).unwrap();

        assert_eq!(gl.live_objects(), 0);
        assert_eq!(surface.status(), SurfaceStatus::Closed);
        assert!(matches!(
            surface.handle(SurfaceEvent::Update(0.1)),
            Err(SurfaceError::Closed)
        ));
        assert!(matches!(
            surface.handle(SurfaceEvent::Render),
            Err(SurfaceError::Closed)
        ));
        assert!(matches!(
            surface.handle(SurfaceEvent::Resize(10, 10)),
            Err(SurfaceError::Closed)
        ));
        assert!(matches!(
            surface.handle(SurfaceEvent::Close),
            Err(SurfaceError::Closed)
        ));
    }

    #[test]
    fn first_frame_sees_first_delta() {
        let shaders = Shaders::write(VERT, FRAG);
        let (gl, mut surface) = surface(&shaders.config());

        surface.handle(SurfaceEvent::Load).unwrap();
        assert_eq!(surface.is_linked(), Some(true));

        surface.handle(SurfaceEvent::Update(0.016)).unwrap();
        surface.handle(SurfaceEvent::Render).unwrap();

        let writes = gl.uniform_writes();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].0 >= 0);
        assert!((writes[0].1 - 0.016).abs() < f32::EPSILON);
    }
}
