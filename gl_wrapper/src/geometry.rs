use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::backend::{BufferTarget, GlBackend};

pub struct GeometryBuilder<'a, B: GlBackend> {
    backend: Rc<B>,
    attributes: Vec<VertexAttribute>,
    data: &'a [f32],
    indices: &'a [u32],
}

impl<'a, B: GlBackend> GeometryBuilder<'a, B> {
    pub fn new(backend: Rc<B>, data: &'a [f32]) -> Self {
        Self {
            backend,
            data,
            attributes: Vec::new(),
            indices: &[],
        }
    }

    pub fn with_attribute(mut self, attr: VertexAttribute) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn with_indices(mut self, indices: &'a [u32]) -> Self {
        self.indices = indices;
        self
    }

    pub fn build(self) -> Result<Geometry<B>, GBError> {
        let total_len: usize = self.attributes.iter().map(|a| a.size()).sum();

        if total_len == 0 || self.data.len() % total_len != 0 {
            return Err(GBError::InvalidDataLength);
        }

        let vertices = self.data.len() / total_len;

        if self.indices.is_empty() {
            return Err(GBError::NoIndices);
        }

        if let Some(index) = self.indices.iter().find(|i| **i as usize >= vertices) {
            return Err(GBError::IndexOutOfRange {
                index: *index,
                vertices,
            });
        }

        let gl = &self.backend;

        let vao = gl.create_vertex_array();
        if vao == 0 {
            return Err(GBError::Allocation("vertex array"));
        }

        // from here on the partially built geometry cleans up after itself
        let mut geometry = Geometry {
            backend: Rc::clone(&self.backend),
            vao,
            vbo: 0,
            ebo: 0,
            indices: self.indices.len(),
        };

        geometry.vbo = gl.create_buffer();
        if geometry.vbo == 0 {
            return Err(GBError::Allocation("vertex buffer"));
        }

        geometry.ebo = gl.create_buffer();
        if geometry.ebo == 0 {
            return Err(GBError::Allocation("index buffer"));
        }

        gl.bind_vertex_array(vao);
        gl.bind_buffer(BufferTarget::Array, geometry.vbo);
        gl.array_buffer_data(self.data);

        let mut offset = 0;

        for (i, attr) in self.attributes.iter().enumerate() {
            gl.vertex_attrib_pointer(i as u32, attr.size(), total_len, offset);
            offset += attr.size();
            gl.enable_vertex_attrib_array(i as u32);
        }

        gl.bind_buffer(BufferTarget::Array, 0);

        gl.bind_buffer(BufferTarget::ElementArray, geometry.ebo);
        gl.element_buffer_data(self.indices);
        gl.bind_buffer(BufferTarget::ElementArray, 0);

        gl.bind_vertex_array(0);

        debug!(
            "Uploaded geometry: {} vertices, {} indices",
            vertices,
            self.indices.len()
        );

        Ok(geometry)
    }
}

#[derive(Debug, Error)]
pub enum GBError {
    #[error("Invalid data length for given attributes")]
    InvalidDataLength,
    #[error("Geometry needs at least one index")]
    NoIndices,
    #[error("Index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
    #[error("Could not allocate {0}")]
    Allocation(&'static str),
}

pub enum VertexAttribute {
    Vec3,
}

impl VertexAttribute {
    pub fn size(&self) -> usize {
        match self {
            VertexAttribute::Vec3 => 3,
        }
    }
}

/// Static indexed triangle list living in GPU buffers.
pub struct Geometry<B: GlBackend> {
    backend: Rc<B>,
    vao: u32,
    vbo: u32,
    ebo: u32,
    indices: usize,
}

impl<B: GlBackend> Geometry<B> {
    pub fn vao(&self) -> u32 {
        self.vao
    }

    pub fn indices(&self) -> usize {
        self.indices
    }

    pub fn bind(&self) {
        self.backend.bind_vertex_array(self.vao);
        self.backend.bind_buffer(BufferTarget::ElementArray, self.ebo);
    }

    /// Draws every uploaded index, geometry has to be bound.
    pub fn draw(&self) {
        self.backend.draw_elements(self.indices);
    }

    pub fn bind_and_draw(&self) {
        self.bind();
        self.draw();
    }
}

impl<B: GlBackend> Drop for Geometry<B> {
    fn drop(&mut self) {
        if self.ebo != 0 {
            self.backend.delete_buffer(self.ebo);
        }
        if self.vbo != 0 {
            self.backend.delete_buffer(self.vbo);
        }
        self.backend.delete_vertex_array(self.vao);
    }
}
