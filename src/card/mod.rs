pub mod params;

use std::fmt;

use ab_glyph::{FontArc, PxScale};
use image::{imageops, GrayImage, Luma, Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::debug;

use crate::builder::QR;
use crate::common::error::RenderError;
use crate::render::rasterize;

// Proportions of the shorter canvas side
const EDGE_GAP: f32 = 0.05;
const TITLE_SCALE: f32 = 0.1;
const TITLE_GAP: f32 = 0.04;
const FOOTER_SCALE: f32 = 0.06;
const FOOTER_BOTTOM: f32 = 0.1;
const CIRCLE_OFFSET: f32 = 0.25;
const CIRCLE_RADIUS: f32 = 0.375;

// Share of the canvas width a title may take before it is scaled down
const TITLE_MAX_WIDTH: f32 = 0.85;

const DECORATION_OPACITY: f32 = 0.05;
const FOOTER_OPACITY: f32 = 0.6;

/// Layout and style of a social preview card.
#[derive(Clone)]
pub struct CardOptions {
    pub width: u32,
    pub height: u32,
    pub background: Rgba<u8>,
    pub dark: Rgba<u8>,
    pub light: Rgba<u8>,
    /// Quiet zone in modules, kept light inside the panel
    pub margin: u32,
    /// Panel border around the quiet zone, in pixels
    pub padding: u32,
    /// Clamped to `padding`
    pub corner_radius: u32,
    pub decorations: bool,
    pub title: Option<String>,
    pub footer: Option<String>,
    /// Required when `title` or `footer` is set
    pub font: Option<FontArc>,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            background: Rgba([255, 255, 255, 255]),
            dark: Rgba([0, 0, 0, 255]),
            light: Rgba([255, 255, 255, 255]),
            margin: 2,
            padding: 24,
            corner_radius: 32,
            decorations: true,
            title: None,
            footer: None,
            font: None,
        }
    }
}

impl fmt::Debug for CardOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardOptions")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("background", &self.background)
            .field("dark", &self.dark)
            .field("light", &self.light)
            .field("margin", &self.margin)
            .field("padding", &self.padding)
            .field("corner_radius", &self.corner_radius)
            .field("decorations", &self.decorations)
            .field("title", &self.title)
            .field("footer", &self.footer)
            .field("font", &self.font.as_ref().map(|_| "FontArc"))
            .finish()
    }
}

// Layout
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CardLayout {
    pub module_size: u32,
    pub panel_x: u32,
    pub panel_y: u32,
    pub panel_size: u32,
    pub corner_radius: u32,
    // Top left of the rasterised symbol, quiet zone included
    pub symbol_x: u32,
    pub symbol_y: u32,
    pub symbol_size: u32,
    pub title_y: u32,
    pub footer_y: u32,
}

// Title and panel are stacked and centred in the space above the footer. The
// panel takes the largest module size that fits.
pub(crate) fn compute_layout(
    qr_width: usize,
    options: &CardOptions,
    title_h: u32,
    footer_h: u32,
) -> Result<CardLayout, RenderError> {
    let side = options.width.min(options.height) as f32;
    let edge = (side * EDGE_GAP) as u32;
    let title_block = if title_h > 0 { title_h + (side * TITLE_GAP) as u32 } else { 0 };
    let footer_offset = (side * FOOTER_BOTTOM) as u32;
    let footer_block = if footer_h > 0 { footer_h + footer_offset } else { 0 };

    let region_h = options.height.saturating_sub(2 * edge + footer_block);
    let avail_w = options.width.saturating_sub(2 * edge);
    let avail = avail_w.min(region_h.saturating_sub(title_block));

    // Saturating, so oversized margins or padding end up as `TooSmall`
    let modules = options.margin.saturating_mul(2).saturating_add(qr_width as u32);
    let symbol_avail = avail.saturating_sub(options.padding.saturating_mul(2));
    let module_size = symbol_avail / modules;
    if module_size == 0 {
        return Err(RenderError::TooSmall { available: symbol_avail, required: modules });
    }

    let symbol_size = modules * module_size;
    let panel_size = symbol_size + 2 * options.padding;
    let content_h = title_block + panel_size;
    let top = edge + (region_h - content_h) / 2;
    let panel_x = (options.width - panel_size) / 2;
    let panel_y = top + title_block;

    Ok(CardLayout {
        module_size,
        panel_x,
        panel_y,
        panel_size,
        corner_radius: options.corner_radius.min(options.padding),
        symbol_x: panel_x + options.padding,
        symbol_y: panel_y + options.padding,
        symbol_size,
        title_y: top,
        footer_y: options.height - footer_offset - footer_h,
    })
}

struct TextBox<'a> {
    text: &'a str,
    scale: PxScale,
    width: u32,
    height: u32,
}

// Measures `text` at `px`, shrinking it to `max_width` if wider. The width
// from `text_size` is the rounded up advance plus one pixel.
fn measure<'a>(text: &'a str, font: &FontArc, px: f32, max_width: u32) -> TextBox<'a> {
    let (w, _) = text_size(px, font, text);
    let px = if w > max_width {
        px * max_width.saturating_sub(1) as f32 / (w - 1).max(1) as f32
    } else {
        px
    };
    let (width, height) = text_size(px, font, text);
    TextBox { text, scale: PxScale::from(px), width, height }
}

// Drawing
//------------------------------------------------------------------------------

/// Composes the symbol onto a card: background, decorative circles, optional
/// title, a rounded light panel holding the symbol and its quiet zone, and an
/// optional footer.
pub fn render_card(qr: &QR, options: &CardOptions) -> Result<RgbaImage, RenderError> {
    let title = options.title.as_deref().filter(|t| !t.is_empty());
    let footer = options.footer.as_deref().filter(|t| !t.is_empty());
    let font = match (&options.font, title.is_some() || footer.is_some()) {
        (None, true) => return Err(RenderError::MissingFont),
        (font, _) => font.as_ref(),
    };

    let side = options.width.min(options.height) as f32;
    let max_width = (options.width as f32 * TITLE_MAX_WIDTH) as u32;
    let title = title.zip(font).map(|(t, f)| measure(t, f, side * TITLE_SCALE, max_width));
    let footer = footer.zip(font).map(|(t, f)| measure(t, f, side * FOOTER_SCALE, max_width));

    let layout = compute_layout(
        qr.width(),
        options,
        title.as_ref().map_or(0, |t| t.height),
        footer.as_ref().map_or(0, |t| t.height),
    )?;
    debug!(?layout, "Card layout");

    let mut canvas = RgbaImage::from_pixel(options.width, options.height, options.background);

    if options.decorations {
        draw_decorations(&mut canvas, options.dark);
    }

    draw_rounded_square(
        &mut canvas,
        layout.panel_x,
        layout.panel_y,
        layout.panel_size,
        layout.corner_radius,
        options.light,
    );

    let symbol = rasterize(qr, layout.module_size, options.margin, options.dark, options.light);
    imageops::replace(&mut canvas, &symbol, layout.symbol_x as i64, layout.symbol_y as i64);

    if let (Some(t), Some(f)) = (&title, font) {
        let x = (options.width.saturating_sub(t.width) / 2) as i32;
        draw_text_mut(&mut canvas, options.dark, x, layout.title_y as i32, t.scale, f, t.text);
    }

    if let (Some(t), Some(f)) = (&footer, font) {
        let x = (options.width.saturating_sub(t.width) / 2) as i32;
        let color = mix(options.dark, options.background, FOOTER_OPACITY);
        draw_text_mut(&mut canvas, color, x, layout.footer_y as i32, t.scale, f, t.text);
    }

    Ok(canvas)
}

fn with_opacity(color: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let [r, g, b, a] = color.0;
    Rgba([r, g, b, (a as f32 * opacity).round() as u8])
}

// Opaque `fg` seen at `opacity` over `bg`
fn mix(fg: Rgba<u8>, bg: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let mut out = bg;
    out.blend(&with_opacity(fg, opacity));
    out
}

// Two faint circles bleeding off the top left and bottom right corners
fn draw_decorations(canvas: &mut RgbaImage, dark: Rgba<u8>) {
    let (w, h) = canvas.dimensions();
    let side = w.min(h) as f32;
    let offset = (side * CIRCLE_OFFSET) as i32;
    let radius = (side * CIRCLE_RADIUS) as i32;
    let color = with_opacity(dark, DECORATION_OPACITY);

    // Circle scanlines overlap, so coverage is collected first and each pixel
    // is tinted once
    let mut cover = GrayImage::new(w, h);
    draw_filled_circle_mut(&mut cover, (offset, offset), radius, Luma([255]));
    draw_filled_circle_mut(&mut cover, (w as i32 - offset, h as i32 - offset), radius, Luma([255]));
    for (px, c) in canvas.pixels_mut().zip(cover.pixels()) {
        if c[0] > 0 {
            px.blend(&color);
        }
    }
}

// Two overlapping rectangles form the straight edges, circles fill the corners
fn draw_rounded_square(
    canvas: &mut RgbaImage,
    x: u32,
    y: u32,
    size: u32,
    radius: u32,
    color: Rgba<u8>,
) {
    debug_assert!(2 * radius < size, "Corner radius too large for square: {radius} {size}");

    let (xi, yi, r) = (x as i32, y as i32, radius as i32);
    draw_filled_rect_mut(canvas, Rect::at(xi + r, yi).of_size(size - 2 * radius, size), color);
    draw_filled_rect_mut(canvas, Rect::at(xi, yi + r).of_size(size, size - 2 * radius), color);
    if radius == 0 {
        return;
    }

    let far = size as i32 - 1 - r;
    for (cx, cy) in [(r, r), (far, r), (r, far), (far, far)] {
        draw_filled_circle_mut(canvas, (xi + cx, yi + cy), r, color);
    }
}
