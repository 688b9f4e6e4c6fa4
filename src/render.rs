use image::{ImageBuffer, Pixel, Rgb, RgbImage};

use crate::builder::QR;
use crate::common::error::RenderError;

/// Pixel layout of a plain symbol image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Pixels per module side
    pub module_size: u32,
    /// Quiet zone width in modules
    pub margin: u32,
    pub dark: Rgb<u8>,
    pub light: Rgb<u8>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { module_size: 8, margin: 4, dark: Rgb([0, 0, 0]), light: Rgb([255, 255, 255]) }
    }
}

impl RenderOptions {
    /// Largest module size for which the symbol and its margin fit in
    /// `target_px`. Colours are left at their defaults.
    pub fn fit(qr: &QR, target_px: u32, margin: u32) -> Result<Self, RenderError> {
        let modules = span(qr, margin);
        let module_size = target_px / modules;
        if module_size == 0 {
            return Err(RenderError::TooSmall { available: target_px, required: modules });
        }
        Ok(Self { module_size, margin, ..Self::default() })
    }

    pub fn with_colors(self, dark: Rgb<u8>, light: Rgb<u8>) -> Self {
        Self { dark, light, ..self }
    }

    /// Side length in pixels of the image `render` produces for `qr`.
    pub fn image_size(&self, qr: &QR) -> Result<u32, RenderError> {
        let modules = span(qr, self.margin);
        if self.module_size == 0 {
            return Err(RenderError::TooSmall { available: 0, required: modules });
        }
        self.margin
            .checked_mul(2)
            .and_then(|m| m.checked_add(qr.width() as u32))
            .and_then(|m| m.checked_mul(self.module_size))
            .ok_or(RenderError::TooLarge { modules, module_size: self.module_size })
    }
}

// Symbol width plus the quiet zone on both sides, in modules. Saturates, so an
// absurd margin fails the size checks instead of wrapping.
pub(crate) fn span(qr: &QR, margin: u32) -> u32 {
    margin.saturating_mul(2).saturating_add(qr.width() as u32)
}

/// Rasterises the symbol. Every pixel is either `dark` or `light`; the margin
/// is `light`.
pub fn render(qr: &QR, options: &RenderOptions) -> Result<RgbImage, RenderError> {
    options.image_size(qr)?;
    Ok(rasterize(qr, options.module_size, options.margin, options.dark, options.light))
}

// Symbol plus `margin` modules of quiet zone, in any pixel type. Callers check
// the side length fits in `u32` first.
pub(crate) fn rasterize<P: Pixel>(
    qr: &QR,
    module_size: u32,
    margin: u32,
    dark: P,
    light: P,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let qz_sz = margin * module_size;
    let qr_sz = qr.width() as u32 * module_size;
    let sz = qz_sz + qr_sz + qz_sz;

    ImageBuffer::from_fn(sz, sz, |x, y| {
        if x < qz_sz || x >= qz_sz + qr_sz || y < qz_sz || y >= qz_sz + qr_sz {
            return light;
        }
        let r = ((y - qz_sz) / module_size) as usize;
        let c = ((x - qz_sz) / module_size) as usize;
        qr.module(r, c).select(light, dark)
    })
}
