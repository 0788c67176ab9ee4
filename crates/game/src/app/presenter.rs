use std::sync::Arc;

use atmosphere::{Canvas, Viewport};
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

/// Copies composed frames into the window's pixel buffer.
pub(crate) struct FramePresenter {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    warned_size_mismatch: bool,
}

impl FramePresenter {
    pub(crate) fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport::new(size.width, size.height),
            warned_size_mismatch: false,
        })
    }

    pub(crate) fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport::new(width, height);
        self.warned_size_mismatch = false;
        Ok(())
    }

    pub(crate) fn present(&mut self, canvas: Option<&Canvas>) -> Result<(), Error> {
        let frame = self.pixels.frame_mut();
        match canvas {
            Some(canvas) => {
                let copied = copy_frame(frame, canvas.rgba());
                if !copied && !self.warned_size_mismatch {
                    self.warned_size_mismatch = true;
                    warn!(
                        frame_len = frame.len(),
                        canvas_width = canvas.width(),
                        canvas_height = canvas.height(),
                        "presenter_frame_size_mismatch"
                    );
                }
            }
            None => frame.fill(0),
        }
        self.pixels.render()
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }
}

/// Returns false when the sizes differ; the overlapping prefix is still copied.
fn copy_frame(frame: &mut [u8], rgba: &[u8]) -> bool {
    let len = frame.len().min(rgba.len());
    frame[..len].copy_from_slice(&rgba[..len]);
    frame[len..].fill(0);
    frame.len() == rgba.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_frame_matches_equal_sizes() {
        let mut frame = vec![0u8; 8];
        let rgba = [1u8, 2, 3, 4, 5, 6, 7, 8];
        assert!(copy_frame(&mut frame, &rgba));
        assert_eq!(frame, rgba);
    }

    #[test]
    fn copy_frame_zero_fills_the_remainder() {
        let mut frame = vec![9u8; 8];
        assert!(!copy_frame(&mut frame, &[1, 2, 3, 4]));
        assert_eq!(frame, [1, 2, 3, 4, 0, 0, 0, 0]);
    }
}
