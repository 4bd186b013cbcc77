pub mod config;
pub mod surface;
pub mod target;

pub use config::SurfaceConfig;
pub use surface::{RenderSurface, SurfaceError, SurfaceEvent, SurfaceStatus};
pub use target::{FrameTarget, PresentError};
