use std::num::NonZeroU32;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("Could not present frame: {0}")]
pub struct PresentError(pub String);

/// Window-side half of the surface: what the frame is drawn into and shown on.
pub trait FrameTarget {
    /// Swaps the back buffer onto the screen.
    fn present(&self) -> Result<(), PresentError>;

    /// Resizes the drawable, called before the viewport is updated.
    fn resize(&self, width: NonZeroU32, height: NonZeroU32);
}
