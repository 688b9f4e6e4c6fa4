//! # qrcard
//!
//! QR Model 2 symbol generation with Reed-Solomon error correction, plain
//! raster rendering and composition of social preview cards.
//!
//! ## Features
//!
//! - **Encoding**: Numeric, alphanumeric and byte segments chosen per payload,
//!   smallest fitting version, penalty-scored masking
//! - **Rendering**: Module-size or target-size driven images with a quiet zone
//! - **Cards**: Branded preview images with decorations, title and footer
//! - **Requests**: Query-string shaped parameters with base64 payloads, hex
//!   colours and PNG output
//!
//! ## Quick Start
//!
//! ```rust
//! use qrcard::{encode, render, ECLevel, RenderOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = encode(b"HELLO", ECLevel::M)?;
//! assert_eq!(qr.width(), 21);
//!
//! let opts = RenderOptions::fit(&qr, 300, 4)?;
//! let img = render(&qr, &opts)?;
//! assert_eq!(img.width(), 290);
//! # Ok(())
//! # }
//! ```
//!
//! ### Full Configuration
//!
//! ```rust
//! use qrcard::{ECLevel, QRBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new(b"Hello, World!")
//!     .version(2)           // Smallest fitting version if not provided
//!     .ec_level(ECLevel::Q) // Defaults to ECLevel::M
//!     .mask(3)              // Lowest penalty mask if not provided
//!     .build()?;
//!
//! println!("{}", qr.to_str(1));
//! # Ok(())
//! # }
//! ```
//!
//! ### Cards
//!
//! ```rust
//! use qrcard::{generate_card, to_png, CardParams, StylePolicy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = CardParams { text: Some("aGVsbG8".into()), ..Default::default() };
//! let card = generate_card(&params, StylePolicy::Custom, None)?;
//! let png = to_png(&card)?;
//! assert!(!png.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Correction Levels
//! - **L (Low)**: ~7% error correction
//! - **M (Medium)**: ~15% error correction
//! - **Q (Quartile)**: ~25% error correction
//! - **H (High)**: ~30% error correction

#![allow(clippy::items_after_test_module)]

pub mod builder;
pub mod card;
pub(crate) mod common;
pub mod render;

pub use builder::{Module, QRBuilder, QR};
pub use card::params::{
    generate_card, parse_color, to_png, CardParams, CardRequest, StylePolicy, DEFAULT_CARD_SIZE,
    DEFAULT_FOOTER, MAX_CARD_SIZE, MIN_CARD_SIZE,
};
pub use card::{render_card, CardOptions};
pub use common::{
    Color, ECLevel, EncodingError, MaskPattern, QRError, QRResult, RenderError, Version,
};
pub use render::{render, RenderOptions};

/// Encodes `payload` in the smallest version that fits at `ec_level`, with
/// the lowest penalty mask.
pub fn encode(payload: &[u8], ec_level: ECLevel) -> Result<QR, EncodingError> {
    QRBuilder::new(payload).ec_level(ec_level).build()
}
