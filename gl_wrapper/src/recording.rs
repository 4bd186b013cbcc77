use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::backend::{BufferTarget, GlBackend, ShaderStage};

/// One call issued against a [`RecordingGl`].
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateVertexArray(u32),
    CreateBuffer(u32),
    BindVertexArray(u32),
    BindBuffer(BufferTarget, u32),
    ArrayBufferData(Vec<f32>),
    ElementBufferData(Vec<u32>),
    VertexAttribPointer {
        index: u32,
        size: usize,
        stride: usize,
        offset: usize,
    },
    EnableVertexAttribArray(u32),
    DrawElements(usize),
    DeleteVertexArray(u32),
    DeleteBuffer(u32),
    CreateShader(ShaderStage, u32),
    ShaderSource(u32, String),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader(u32, u32),
    LinkProgram(u32),
    UseProgram(u32),
    DeleteProgram(u32),
    GetUniformLocation(u32, String),
    Uniform1f(i32, f32),
    Viewport(i32, i32, u32, u32),
    ClearColor(f32, f32, f32, f32),
}

#[derive(Default)]
struct ShaderRecord {
    source: String,
    stage: Option<ShaderStage>,
    compiled: bool,
    log: String,
}

#[derive(Default)]
struct ProgramRecord {
    attached: Vec<u32>,
    linked: bool,
    log: String,
    uniforms: Vec<String>,
}

/// Headless backend that records every call.
///
/// Compilation is emulated: a stage compiles when it declares `main` and its
/// braces balance. A program links when it has a compiled vertex and a
/// compiled fragment stage attached. Uniforms declared as
/// `uniform <type> <name>;` get sequential locations in declaration order.
#[derive(Default)]
pub struct RecordingGl {
    calls: RefCell<Vec<GlCall>>,
    next_name: Cell<u32>,
    fail_allocations: Cell<bool>,
    live: RefCell<HashSet<u32>>,
    shaders: RefCell<HashMap<u32, ShaderRecord>>,
    programs: RefCell<HashMap<u32, ProgramRecord>>,
}

impl RecordingGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `create_*` call return `0`.
    pub fn fail_allocations(&self, fail: bool) {
        self.fail_allocations.set(fail);
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Index counts of every indexed draw issued so far.
    pub fn draw_counts(&self) -> Vec<usize> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                GlCall::DrawElements(count) => Some(*count),
                _ => None,
            })
            .collect()
    }

    pub fn uniform_writes(&self) -> Vec<(i32, f32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                GlCall::Uniform1f(loc, value) => Some((*loc, *value)),
                _ => None,
            })
            .collect()
    }

    /// Number of objects created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.live.borrow().len()
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate(&self) -> u32 {
        if self.fail_allocations.get() {
            return 0;
        }

        let name = self.next_name.get() + 1;
        self.next_name.set(name);
        self.live.borrow_mut().insert(name);
        name
    }

    fn release(&self, name: u32) {
        if !self.live.borrow_mut().remove(&name) {
            panic!("object {name} deleted twice or never created");
        }
    }
}

fn balanced_braces(source: &str) -> bool {
    let mut depth = 0_i32;
    for c in source.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }

    depth == 0
}

fn declared_uniforms(source: &str) -> impl Iterator<Item = String> + '_ {
    source.split(';').filter_map(|statement| {
        let mut tokens = statement.split_whitespace();
        tokens.find(|t| *t == "uniform")?;
        let _ty = tokens.next()?;
        let name = tokens.next()?;
        let name = name.split('[').next().unwrap_or(name);

        Some(name.to_string())
    })
}

impl GlBackend for RecordingGl {
    fn create_vertex_array(&self) -> u32 {
        let name = self.allocate();
        self.record(GlCall::CreateVertexArray(name));
        name
    }

    fn create_buffer(&self) -> u32 {
        let name = self.allocate();
        self.record(GlCall::CreateBuffer(name));
        name
    }

    fn bind_vertex_array(&self, vao: u32) {
        self.record(GlCall::BindVertexArray(vao));
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: u32) {
        self.record(GlCall::BindBuffer(target, buffer));
    }

    fn array_buffer_data(&self, data: &[f32]) {
        self.record(GlCall::ArrayBufferData(data.to_vec()));
    }

    fn element_buffer_data(&self, data: &[u32]) {
        self.record(GlCall::ElementBufferData(data.to_vec()));
    }

    fn vertex_attrib_pointer(&self, index: u32, size: usize, stride: usize, offset: usize) {
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn draw_elements(&self, count: usize) {
        self.record(GlCall::DrawElements(count));
    }

    fn delete_vertex_array(&self, vao: u32) {
        self.release(vao);
        self.record(GlCall::DeleteVertexArray(vao));
    }

    fn delete_buffer(&self, buffer: u32) {
        self.release(buffer);
        self.record(GlCall::DeleteBuffer(buffer));
    }

    fn create_shader(&self, stage: ShaderStage) -> u32 {
        let name = self.allocate();
        if name != 0 {
            self.shaders.borrow_mut().insert(
                name,
                ShaderRecord {
                    stage: Some(stage),
                    ..Default::default()
                },
            );
        }
        self.record(GlCall::CreateShader(stage, name));
        name
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(record) = self.shaders.borrow_mut().get_mut(&shader) {
            record.source = source.to_string();
        }
        self.record(GlCall::ShaderSource(shader, source.to_string()));
    }

    fn compile_shader(&self, shader: u32) {
        if let Some(record) = self.shaders.borrow_mut().get_mut(&shader) {
            if !record.source.contains("main") {
                record.compiled = false;
                record.log = "0:1(1): error: no function with name 'main'".to_string();
            } else if !balanced_braces(&record.source) {
                record.compiled = false;
                record.log = "0:1(1): error: syntax error, unexpected end of file".to_string();
            } else {
                record.compiled = true;
                record.log.clear();
            }
        }
        self.record(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.shaders
            .borrow()
            .get(&shader)
            .map(|r| r.compiled)
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.shaders
            .borrow()
            .get(&shader)
            .map(|r| r.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        self.release(shader);
        self.shaders.borrow_mut().remove(&shader);
        self.record(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> u32 {
        let name = self.allocate();
        if name != 0 {
            self.programs
                .borrow_mut()
                .insert(name, ProgramRecord::default());
        }
        self.record(GlCall::CreateProgram(name));
        name
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let Some(record) = self.programs.borrow_mut().get_mut(&program) {
            record.attached.push(shader);
        }
        self.record(GlCall::AttachShader(program, shader));
    }

    fn link_program(&self, program: u32) {
        let shaders = self.shaders.borrow();

        if let Some(record) = self.programs.borrow_mut().get_mut(&program) {
            let attached: Vec<&ShaderRecord> = record
                .attached
                .iter()
                .filter_map(|s| shaders.get(s))
                .collect();

            let has_stage = |stage| attached.iter().any(|s| s.stage == Some(stage));

            if attached.iter().any(|s| !s.compiled) {
                record.linked = false;
                record.log = "error: linking with uncompiled/unspecialized shader".to_string();
            } else if !has_stage(ShaderStage::Vertex) || !has_stage(ShaderStage::Fragment) {
                record.linked = false;
                record.log = "error: program lacks a vertex or fragment stage".to_string();
            } else {
                record.linked = true;
                record.log.clear();
            }

            record.uniforms.clear();
            if record.linked {
                for shader in &attached {
                    for uniform in declared_uniforms(&shader.source) {
                        if !record.uniforms.contains(&uniform) {
                            record.uniforms.push(uniform);
                        }
                    }
                }
            }
        }
        self.record(GlCall::LinkProgram(program));
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.programs
            .borrow()
            .get(&program)
            .map(|r| r.linked)
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.programs
            .borrow()
            .get(&program)
            .map(|r| r.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: u32) {
        self.record(GlCall::UseProgram(program));
    }

    fn delete_program(&self, program: u32) {
        self.release(program);
        self.programs.borrow_mut().remove(&program);
        self.record(GlCall::DeleteProgram(program));
    }

    fn uniform_location(&self, program: u32, name: &str) -> i32 {
        self.record(GlCall::GetUniformLocation(program, name.to_string()));
        self.programs
            .borrow()
            .get(&program)
            .and_then(|r| r.uniforms.iter().position(|u| u == name))
            .map(|i| i as i32)
            .unwrap_or(-1)
    }

    fn uniform_1f(&self, location: i32, value: f32) {
        self.record(GlCall::Uniform1f(location, value));
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.record(GlCall::Viewport(x, y, width, height));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::ClearColor(r, g, b, a));
    }
}
