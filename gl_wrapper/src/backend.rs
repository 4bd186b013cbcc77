use std::ffi::{c_char, c_void, CString};

use gl::types::{GLenum, GLint, GLsizei, GLuint};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    fn gl_enum(&self) -> GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    fn gl_enum(&self) -> GLenum {
        match self {
            BufferTarget::Array => gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
        }
    }
}

/// Subset of the graphics API used by the wrappers in this crate.
///
/// Object names are plain `u32`s and `0` is never a valid object, so every
/// `create_*` method reports allocation failure by returning `0`.
pub trait GlBackend {
    fn create_vertex_array(&self) -> u32;
    fn create_buffer(&self) -> u32;
    fn bind_vertex_array(&self, vao: u32);
    fn bind_buffer(&self, target: BufferTarget, buffer: u32);
    fn array_buffer_data(&self, data: &[f32]);
    fn element_buffer_data(&self, data: &[u32]);
    /// Float attribute at `index`, `size` components, strides and offsets in floats.
    fn vertex_attrib_pointer(&self, index: u32, size: usize, stride: usize, offset: usize);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn draw_elements(&self, count: usize);
    fn delete_vertex_array(&self, vao: u32);
    fn delete_buffer(&self, buffer: u32);

    fn create_shader(&self, stage: ShaderStage) -> u32;
    fn shader_source(&self, shader: u32, source: &str);
    fn compile_shader(&self, shader: u32);
    fn shader_compile_status(&self, shader: u32) -> bool;
    fn shader_info_log(&self, shader: u32) -> String;
    fn delete_shader(&self, shader: u32);

    fn create_program(&self) -> u32;
    fn attach_shader(&self, program: u32, shader: u32);
    fn link_program(&self, program: u32);
    fn program_link_status(&self, program: u32) -> bool;
    fn program_info_log(&self, program: u32) -> String;
    fn use_program(&self, program: u32);
    fn delete_program(&self, program: u32);

    fn uniform_location(&self, program: u32, name: &str) -> i32;
    fn uniform_1f(&self, location: i32, value: f32);

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
}

/// Backend issuing calls through the `gl` function loader.
pub struct NativeGl {
    _loaded: (),
}

impl NativeGl {
    /// Loads the function pointers; the context must already be current.
    pub fn load_with<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);

        Self { _loaded: () }
    }
}

fn trim_log(mut buf: Vec<u8>, written: GLsizei) -> String {
    buf.truncate(written.max(0) as usize);
    if let Some(end) = buf.iter().position(|c| *c == 0) {
        buf.truncate(end);
    }

    String::from_utf8_lossy(&buf).trim_end().to_string()
}

impl GlBackend for NativeGl {
    fn create_vertex_array(&self) -> u32 {
        let mut vao = 0;
        unsafe { gl::GenVertexArrays(1, (&mut vao) as *mut u32) };
        vao
    }

    fn create_buffer(&self) -> u32 {
        let mut buffer = 0;
        unsafe { gl::GenBuffers(1, (&mut buffer) as *mut u32) };
        buffer
    }

    fn bind_vertex_array(&self, vao: u32) {
        unsafe { gl::BindVertexArray(vao) }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: u32) {
        unsafe { gl::BindBuffer(target.gl_enum(), buffer) }
    }

    fn array_buffer_data(&self, data: &[f32]) {
        unsafe {
            gl::BufferData(
                gl::ARRAY_BUFFER,
                std::mem::size_of_val(data) as isize,
                data.as_ptr() as *const c_void,
                gl::STATIC_DRAW,
            );
        }
    }

    fn element_buffer_data(&self, data: &[u32]) {
        unsafe {
            gl::BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                std::mem::size_of_val(data) as isize,
                data.as_ptr() as *const c_void,
                gl::STATIC_DRAW,
            );
        }
    }

    fn vertex_attrib_pointer(&self, index: u32, size: usize, stride: usize, offset: usize) {
        let float = std::mem::size_of::<f32>();

        unsafe {
            gl::VertexAttribPointer(
                index,
                size as GLint,
                gl::FLOAT,
                gl::FALSE,
                (stride * float) as GLsizei,
                (offset * float) as *const c_void,
            );
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { gl::EnableVertexAttribArray(index) }
    }

    fn draw_elements(&self, count: usize) {
        unsafe {
            gl::DrawElements(
                gl::TRIANGLES,
                count as GLsizei,
                gl::UNSIGNED_INT,
                std::ptr::null(),
            );
        }
    }

    fn delete_vertex_array(&self, vao: u32) {
        unsafe { gl::DeleteVertexArrays(1, (&vao) as *const u32) }
    }

    fn delete_buffer(&self, buffer: u32) {
        unsafe { gl::DeleteBuffers(1, (&buffer) as *const u32) }
    }

    fn create_shader(&self, stage: ShaderStage) -> u32 {
        unsafe { gl::CreateShader(stage.gl_enum()) }
    }

    fn shader_source(&self, shader: u32, source: &str) {
        // explicit length, the source does not need a terminating nul
        let ptr = source.as_ptr() as *const c_char;
        let len = source.len() as GLint;

        unsafe {
            gl::ShaderSource(
                shader,
                1,
                (&ptr) as *const *const c_char,
                (&len) as *const GLint,
            );
        }
    }

    fn compile_shader(&self, shader: u32) {
        unsafe { gl::CompileShader(shader) }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        let mut success: GLint = 0;
        unsafe { gl::GetShaderiv(shader, gl::COMPILE_STATUS, (&mut success) as *mut GLint) };
        success == gl::TRUE as GLint
    }

    fn shader_info_log(&self, shader: u32) -> String {
        let mut len: GLint = 0;
        unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, (&mut len) as *mut GLint) };
        if len <= 0 {
            return String::new();
        }

        let mut buf = vec![0_u8; len as usize];
        let mut written: GLsizei = 0;
        unsafe {
            gl::GetShaderInfoLog(
                shader,
                len,
                (&mut written) as *mut GLsizei,
                buf.as_mut_ptr() as *mut c_char,
            );
        }

        trim_log(buf, written)
    }

    fn delete_shader(&self, shader: u32) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn create_program(&self) -> u32 {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn link_program(&self, program: u32) {
        unsafe { gl::LinkProgram(program) }
    }

    fn program_link_status(&self, program: u32) -> bool {
        let mut success: GLint = 0;
        unsafe { gl::GetProgramiv(program, gl::LINK_STATUS, (&mut success) as *mut GLint) };
        success == gl::TRUE as GLint
    }

    fn program_info_log(&self, program: u32) -> String {
        let mut len: GLint = 0;
        unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, (&mut len) as *mut GLint) };
        if len <= 0 {
            return String::new();
        }

        let mut buf = vec![0_u8; len as usize];
        let mut written: GLsizei = 0;
        unsafe {
            gl::GetProgramInfoLog(
                program,
                len,
                (&mut written) as *mut GLsizei,
                buf.as_mut_ptr() as *mut c_char,
            );
        }

        trim_log(buf, written)
    }

    fn use_program(&self, program: u32) {
        unsafe { gl::UseProgram(program) }
    }

    fn delete_program(&self, program: u32) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn uniform_location(&self, program: u32, name: &str) -> i32 {
        // a name with an interior nul can never match a declared uniform
        let name = match CString::new(name) {
            Ok(name) => name,
            Err(_) => return -1,
        };

        unsafe { gl::GetUniformLocation(program as GLuint, name.as_ptr()) }
    }

    fn uniform_1f(&self, location: i32, value: f32) {
        unsafe { gl::Uniform1f(location, value) }
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { gl::Viewport(x, y, width as GLsizei, height as GLsizei) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe {
            gl::ClearColor(r, g, b, a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
    }
}
