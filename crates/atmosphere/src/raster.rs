use std::path::Path;

use image::{ImageResult, RgbaImage};

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source-over compositing.
    Normal,
    /// Colour contributions accumulate and saturate instead of replacing.
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> i32 {
        self.left.saturating_add(self.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.top.saturating_add(self.height as i32)
    }
}

/// Straight-alpha RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.byte_offset(x, y)?;
        let mut out = [0; 4];
        out.copy_from_slice(&self.rgba[offset..offset + BYTES_PER_PIXEL]);
        Some(out)
    }

    pub fn alpha_at(&self, x: i32, y: i32) -> Option<u8> {
        self.pixel(x, y).map(|pixel| pixel[3])
    }

    pub fn clear(&mut self) {
        self.rgba.fill(0);
    }

    pub fn fill(&mut self, color: [u8; 3], alpha: f32) {
        let value = [color[0], color[1], color[2], alpha_to_u8(alpha)];
        for chunk in self.rgba.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&value);
        }
    }

    /// Overwrites every pixel inside `rect`, clipped to the canvas.
    pub fn fill_rect(&mut self, rect: PixelRect, color: [u8; 3], alpha: f32) {
        let value = [color[0], color[1], color[2], alpha_to_u8(alpha)];
        let left = rect.left.max(0);
        let top = rect.top.max(0);
        let right = rect.right().min(self.width as i32);
        let bottom = rect.bottom().min(self.height as i32);
        if left >= right || top >= bottom {
            return;
        }
        let row_stride = self.width as usize * BYTES_PER_PIXEL;
        for y in top..bottom {
            let row = y as usize * row_stride;
            let start = row + left as usize * BYTES_PER_PIXEL;
            let end = row + right as usize * BYTES_PER_PIXEL;
            for chunk in self.rgba[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                chunk.copy_from_slice(&value);
            }
        }
    }

    /// Source-over fill of every pixel whose centre lies within `radius` of
    /// `(cx, cy)`.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: [u8; 3], alpha: f32) {
        if !(radius.is_finite() && radius > 0.0) || self.is_empty() {
            return;
        }
        let src = [color[0], color[1], color[2], alpha_to_u8(alpha)];
        if src[3] == 0 {
            return;
        }
        let radius_sq = radius * radius;
        let x_start = ((cx - radius).floor() as i32).max(0);
        let x_end = ((cx + radius).ceil() as i32).min(self.width as i32);
        let y_start = ((cy - radius).floor() as i32).max(0);
        let y_end = ((cy + radius).ceil() as i32).min(self.height as i32);
        for y in y_start..y_end {
            let dy = y as f32 + 0.5 - cy;
            for x in x_start..x_end {
                let dx = x as f32 + 0.5 - cx;
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                if let Some(offset) = self.byte_offset(x, y) {
                    blend_pixel(
                        &mut self.rgba[offset..offset + BYTES_PER_PIXEL],
                        src,
                        BlendMode::Normal,
                    );
                }
            }
        }
    }

    /// Draws `src` with its top-left corner at `(left, top)`.
    pub fn composite_at(&mut self, src: &Canvas, left: i32, top: i32, blend: BlendMode) {
        if src.is_empty() || self.is_empty() {
            return;
        }
        let draw_left = left.max(0);
        let draw_top = top.max(0);
        let draw_right = left
            .saturating_add(src.width as i32)
            .min(self.width as i32);
        let draw_bottom = top
            .saturating_add(src.height as i32)
            .min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let dst_stride = self.width as usize * BYTES_PER_PIXEL;
        let src_stride = src.width as usize * BYTES_PER_PIXEL;
        for out_y in draw_top..draw_bottom {
            let src_row = (out_y - top) as usize * src_stride;
            let dst_row = out_y as usize * dst_stride;
            for out_x in draw_left..draw_right {
                let src_offset = src_row + (out_x - left) as usize * BYTES_PER_PIXEL;
                let alpha = src.rgba[src_offset + 3];
                if alpha == 0 {
                    continue;
                }
                let mut pixel = [0; 4];
                pixel.copy_from_slice(&src.rgba[src_offset..src_offset + BYTES_PER_PIXEL]);
                let dst_offset = dst_row + out_x as usize * BYTES_PER_PIXEL;
                blend_pixel(
                    &mut self.rgba[dst_offset..dst_offset + BYTES_PER_PIXEL],
                    pixel,
                    blend,
                );
            }
        }
    }

    pub fn blit_centered(&mut self, src: &Canvas, center_x: i32, center_y: i32, blend: BlendMode) {
        let left = center_x - (src.width as i32 / 2);
        let top = center_y - (src.height as i32 / 2);
        self.composite_at(src, left, top, blend);
    }

    /// Scales destination alpha by the inverse of the stencil's alpha. Alpha
    /// never increases under this operation.
    pub fn erase_centered(&mut self, stencil: &Canvas, center_x: i32, center_y: i32) {
        if stencil.is_empty() || self.is_empty() {
            return;
        }
        let left = center_x - (stencil.width as i32 / 2);
        let top = center_y - (stencil.height as i32 / 2);
        let draw_left = left.max(0);
        let draw_top = top.max(0);
        let draw_right = left
            .saturating_add(stencil.width as i32)
            .min(self.width as i32);
        let draw_bottom = top
            .saturating_add(stencil.height as i32)
            .min(self.height as i32);

        let dst_stride = self.width as usize * BYTES_PER_PIXEL;
        let src_stride = stencil.width as usize * BYTES_PER_PIXEL;
        for out_y in draw_top..draw_bottom {
            let src_row = (out_y - top) as usize * src_stride;
            let dst_row = out_y as usize * dst_stride;
            for out_x in draw_left..draw_right {
                let stencil_alpha = stencil.rgba[src_row + (out_x - left) as usize * BYTES_PER_PIXEL + 3];
                if stencil_alpha == 0 {
                    continue;
                }
                let alpha_index = dst_row + out_x as usize * BYTES_PER_PIXEL + 3;
                let kept = u16::from(self.rgba[alpha_index]) * u16::from(255 - stencil_alpha) / 255;
                self.rgba[alpha_index] = kept as u8;
            }
        }
    }

    pub fn save_png(&self, path: &Path) -> ImageResult<()> {
        let image = RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height));
        image.save(path)
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let pixel = (y as usize).checked_mul(self.width as usize)?.checked_add(x as usize)?;
        pixel.checked_mul(BYTES_PER_PIXEL)
    }
}

pub fn unpack_rgb(packed: u32) -> [u8; 3] {
    [
        ((packed >> 16) & 0xFF) as u8,
        ((packed >> 8) & 0xFF) as u8,
        (packed & 0xFF) as u8,
    ]
}

pub fn alpha_to_u8(alpha: f32) -> u8 {
    if !alpha.is_finite() {
        return 0;
    }
    (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn blend_pixel(dst: &mut [u8], src: [u8; 4], blend: BlendMode) {
    let src_alpha = f32::from(src[3]) / 255.0;
    match blend {
        BlendMode::Normal => {
            let dst_alpha = f32::from(dst[3]) / 255.0;
            let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
            if out_alpha <= f32::EPSILON {
                dst.fill(0);
                return;
            }
            for channel in 0..3 {
                let blended = (f32::from(src[channel]) * src_alpha
                    + f32::from(dst[channel]) * dst_alpha * (1.0 - src_alpha))
                    / out_alpha;
                dst[channel] = blended.round().clamp(0.0, 255.0) as u8;
            }
            dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        BlendMode::Additive => {
            for channel in 0..3 {
                let added = f32::from(dst[channel]) + f32::from(src[channel]) * src_alpha;
                dst[channel] = added.round().min(255.0) as u8;
            }
            dst[3] = dst[3].saturating_add(src[3]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn unpack_rgb_splits_channels() {
        assert_eq!(unpack_rgb(0xFFAA55), [0xFF, 0xAA, 0x55]);
        assert_eq!(unpack_rgb(0x000000), [0, 0, 0]);
    }

    #[test]
    fn alpha_conversion_clamps_and_rejects_nan() {
        assert_eq!(alpha_to_u8(-0.5), 0);
        assert_eq!(alpha_to_u8(1.5), 255);
        assert_eq!(alpha_to_u8(f32::NAN), 0);
        assert_eq!(alpha_to_u8(0.5), 128);
    }

    #[test]
    fn fill_rect_is_clipped_to_canvas() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(PixelRect::new(-2, -2, 4, 4), [255, 0, 0], 1.0);
        assert_eq!(canvas.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(2, 2), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn fill_circle_covers_centre_and_skips_corners() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_circle(5.0, 5.0, 5.0, [255, 255, 255], 1.0);
        assert_eq!(canvas.alpha_at(5, 5), Some(255));
        assert_eq!(canvas.alpha_at(0, 0), Some(0));
        assert_eq!(canvas.alpha_at(9, 9), Some(0));
    }

    #[test]
    fn zero_radius_circle_is_a_no_op() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_circle(2.0, 2.0, 0.0, [255, 255, 255], 1.0);
        assert!(canvas.rgba().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn additive_blend_accumulates_and_saturates() {
        let mut sprite = Canvas::new(1, 1);
        sprite.fill([200, 100, 0], 1.0);
        let mut target = Canvas::new(1, 1);
        target.composite_at(&sprite, 0, 0, BlendMode::Additive);
        target.composite_at(&sprite, 0, 0, BlendMode::Additive);
        assert_eq!(target.pixel(0, 0), Some([255, 200, 0, 255]));
    }

    #[test]
    fn normal_blend_over_opaque_keeps_opacity() {
        let mut target = Canvas::new(1, 1);
        target.fill([0, 0, 0], 1.0);
        let mut sprite = Canvas::new(1, 1);
        sprite.fill([255, 255, 255], 0.5);
        target.composite_at(&sprite, 0, 0, BlendMode::Normal);
        let pixel = target.pixel(0, 0).expect("pixel");
        assert_eq!(pixel[3], 255);
        assert!((127..=129).contains(&pixel[0]));
    }

    #[test]
    fn blit_centered_clips_negative_positions() {
        let mut sprite = Canvas::new(4, 4);
        sprite.fill([255, 255, 255], 1.0);
        let mut target = Canvas::new(8, 8);
        target.blit_centered(&sprite, -1, -1, BlendMode::Normal);
        assert_eq!(target.alpha_at(0, 0), Some(255));
        assert_eq!(target.alpha_at(1, 1), Some(0));
    }

    #[test]
    fn erase_never_raises_alpha() {
        let mut target = Canvas::new(6, 6);
        target.fill([0, 0, 0], 1.0);
        let mut stencil = Canvas::new(2, 2);
        stencil.fill([255, 255, 255], 1.0);
        target.erase_centered(&stencil, 3, 3);
        let before = target.clone();
        target.erase_centered(&stencil, 3, 3);
        target.erase_centered(&stencil, 4, 4);
        for (after, previous) in target
            .rgba()
            .chunks_exact(4)
            .zip(before.rgba().chunks_exact(4))
        {
            assert!(after[3] <= previous[3]);
        }
        assert_eq!(target.alpha_at(2, 2), Some(0));
        assert_eq!(target.alpha_at(0, 0), Some(255));
    }

    #[test]
    fn save_png_writes_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("canvas.png");
        let mut canvas = Canvas::new(3, 2);
        canvas.fill([10, 20, 30], 1.0);
        canvas.save_png(&path).expect("save png");
        assert!(path.is_file());
    }
}
