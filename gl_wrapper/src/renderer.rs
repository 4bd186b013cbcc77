use std::rc::Rc;

use crate::backend::GlBackend;
use crate::geometry::Geometry;
use crate::program::{Program, UniformLocation};

pub struct GlRenderer<B: GlBackend> {
    backend: Rc<B>,
    current_program: u32,
}

impl<B: GlBackend> GlRenderer<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self {
            backend,
            current_program: 0,
        }
    }

    /// Activates `program`, binds `geometry`, writes `uniforms` and issues the draw.
    pub fn draw(
        &mut self,
        geometry: &Geometry<B>,
        program: &Program<B>,
        uniforms: &[(UniformLocation, f32)],
    ) {
        let p_id = program.get_id();
        if self.current_program != p_id {
            self.backend.use_program(p_id);
            self.current_program = p_id;
        }

        geometry.bind();

        for (location, value) in uniforms {
            program.set_uniform_f32(*location, *value);
        }

        geometry.draw();
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.backend.viewport(0, 0, width, height);
    }

    pub fn clear_color(&self, [r, g, b, a]: [f32; 4]) {
        self.backend.clear_color(r, g, b, a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ShaderStage;
    use crate::geometry::{GeometryBuilder, VertexAttribute};
    use crate::program::ProgramBuilder;
    use crate::recording::{GlCall, RecordingGl};
    use crate::{QUAD_INDICES, QUAD_VERTICES};

    #[test]
    fn program_is_bound_once() {
        let gl = Rc::new(RecordingGl::new());
        let quad = GeometryBuilder::new(Rc::clone(&gl), &QUAD_VERTICES)
            .with_attribute(VertexAttribute::Vec3)
            .with_indices(&QUAD_INDICES)
            .build()
            .unwrap();
        let program = ProgramBuilder::new(Rc::clone(&gl))
            .with_stage_source("void main() {}", ShaderStage::Vertex)
            .with_stage_source("void main() {}", ShaderStage::Fragment)
            .build()
            .unwrap();
        let mut renderer = GlRenderer::new(Rc::clone(&gl));
        gl.clear_calls();

        renderer.draw(&quad, &program, &[]);
        renderer.draw(&quad, &program, &[]);

        let binds = gl
            .calls()
            .iter()
            .filter(|c| matches!(c, GlCall::UseProgram(_)))
            .count();
        assert_eq!(binds, 1);
        assert_eq!(gl.draw_counts(), vec![6, 6]);
    }

    #[test]
    fn resize_sets_full_viewport() {
        let gl = Rc::new(RecordingGl::new());
        let renderer = GlRenderer::new(Rc::clone(&gl));

        renderer.resize(640, 480);

        assert_eq!(gl.calls(), vec![GlCall::Viewport(0, 0, 640, 480)]);
    }
}
