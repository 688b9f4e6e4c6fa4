use ab_glyph::FontArc;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use serde::Deserialize;
use tracing::debug;

use super::{render_card, CardOptions};
use crate::common::{
    error::{QRError, QRResult, RenderError},
    metadata::ECLevel,
};

pub const MIN_CARD_SIZE: u32 = 128;
pub const MAX_CARD_SIZE: u32 = 2048;
pub const DEFAULT_CARD_SIZE: u32 = 400;
pub const DEFAULT_FOOTER: &str = "QRCode Smart";

const DEFAULT_DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const DEFAULT_LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

// Panel padding and corner radius scale with the card
const PADDING_RATIO: f32 = 0.06;
const RADIUS_RATIO: f32 = 0.08;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Whether the caller's styling is honoured. Decided outside this crate,
/// e.g. by an entitlement lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePolicy {
    #[default]
    Custom,
    /// Default colours and no title
    Branded,
}

/// Raw card request, shaped like the query string of an image endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CardParams {
    /// Base64 (standard or URL safe) or plain text
    pub text: Option<String>,
    pub dark: Option<String>,
    pub light: Option<String>,
    pub bg: Option<String>,
    pub title: Option<String>,
    pub size: Option<u32>,
}

/// Validated card request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRequest {
    pub payload: Vec<u8>,
    pub dark: Rgba<u8>,
    pub light: Rgba<u8>,
    pub background: Rgba<u8>,
    pub title: Option<String>,
    pub footer: Option<String>,
    pub size: u32,
}

impl CardParams {
    pub fn resolve(&self, policy: StylePolicy) -> QRResult<CardRequest> {
        let text = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let payload = decode_payload(text.ok_or(QRError::MissingText)?);
        let size = self.size.unwrap_or(DEFAULT_CARD_SIZE).clamp(MIN_CARD_SIZE, MAX_CARD_SIZE);

        let req = match policy {
            StylePolicy::Branded => CardRequest {
                payload,
                dark: DEFAULT_DARK,
                light: DEFAULT_LIGHT,
                background: DEFAULT_BACKGROUND,
                title: None,
                footer: Some(DEFAULT_FOOTER.to_string()),
                size,
            },
            StylePolicy::Custom => CardRequest {
                payload,
                dark: parse_color_or(self.dark.as_deref(), DEFAULT_DARK)?,
                light: parse_color_or(self.light.as_deref(), DEFAULT_LIGHT)?,
                background: parse_color_or(self.bg.as_deref(), DEFAULT_BACKGROUND)?,
                title: self.title.clone().filter(|t| !t.trim().is_empty()),
                footer: Some(DEFAULT_FOOTER.to_string()),
                size,
            },
        };
        debug!(?policy, payload_len = req.payload.len(), size, "Resolved card request");
        Ok(req)
    }
}

impl CardRequest {
    /// Card layout for this request. Title and footer need `font` and are
    /// left out without one.
    pub fn card_options(&self, font: Option<&FontArc>) -> CardOptions {
        let (title, footer) = match font {
            Some(_) => (self.title.clone(), self.footer.clone()),
            None => {
                if self.title.is_some() || self.footer.is_some() {
                    debug!("No font available, dropping card text");
                }
                (None, None)
            }
        };
        let size = self.size as f32;

        CardOptions {
            width: self.size,
            height: self.size,
            background: self.background,
            dark: self.dark,
            light: self.light,
            padding: (size * PADDING_RATIO).round() as u32,
            corner_radius: (size * RADIUS_RATIO).round() as u32,
            title,
            footer,
            font: font.cloned(),
            ..CardOptions::default()
        }
    }
}

/// Resolves `params` and renders the card, encoding at EC level M.
pub fn generate_card(
    params: &CardParams,
    policy: StylePolicy,
    font: Option<&FontArc>,
) -> QRResult<RgbaImage> {
    let req = params.resolve(policy)?;
    let qr = crate::encode(&req.payload, ECLevel::M)?;
    Ok(render_card(&qr, &req.card_options(font))?)
}

pub fn to_png(img: &RgbaImage) -> QRResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

// Base64 text that decodes to UTF-8 is unwrapped, anything else is taken as is
fn decode_payload(text: &str) -> Vec<u8> {
    [STANDARD, URL_SAFE]
        .iter()
        .filter_map(|engine| engine.decode(text).ok())
        .find(|bytes| std::str::from_utf8(bytes).is_ok())
        .unwrap_or_else(|| text.as_bytes().to_vec())
}

fn parse_color_or(input: Option<&str>, default: Rgba<u8>) -> Result<Rgba<u8>, RenderError> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_color(s),
        None => Ok(default),
    }
}

/// Parses `RGB`, `RRGGBB` or `RRGGBBAA` hex, with or without a leading `#`.
pub fn parse_color(input: &str) -> Result<Rgba<u8>, RenderError> {
    let invalid = || RenderError::InvalidColor(input.to_string());
    let hex = input.strip_prefix('#').unwrap_or(input);
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let digits = hex.bytes().map(|b| (b as char).to_digit(16).unwrap_or(0) as u8);
    let channels: Vec<u8> = match hex.len() {
        3 => digits.map(|d| d * 17).collect(),
        6 | 8 => {
            let d = digits.collect::<Vec<_>>();
            d.chunks(2).map(|p| p[0] * 16 + p[1]).collect()
        }
        _ => return Err(invalid()),
    };

    let alpha = channels.get(3).copied().unwrap_or(255);
    Ok(Rgba([channels[0], channels[1], channels[2], alpha]))
}
