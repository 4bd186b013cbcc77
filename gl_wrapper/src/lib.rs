/// Screen-filling quad in normalized device coordinates.
#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 12] = [
    -1.0, 1.0, -1.0,
    1.0, 1.0, -1.0,
    1.0, -1.0, -1.0,
    -1.0, -1.0, -1.0,
];

/// Two triangles sharing the `0-2` diagonal.
#[rustfmt::skip]
pub const QUAD_INDICES: [u32; 6] = [
    0, 1, 2,
    2, 3, 0,
];

pub mod backend;
pub mod geometry;
pub mod program;
#[cfg(any(test, feature = "recording"))]
pub mod recording;
pub mod renderer;

pub use backend::{BufferTarget, GlBackend, NativeGl, ShaderStage};
#[cfg(any(test, feature = "recording"))]
pub use recording::{GlCall, RecordingGl};
