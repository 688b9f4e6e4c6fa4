pub mod bitstream;
pub mod codec;
pub mod ec;
pub mod error;
pub mod iter;
pub mod mask;
pub mod metadata;
pub(crate) mod tables;

pub use error::{EncodingError, QRError, QRResult, RenderError};
pub use mask::MaskPattern;
pub use metadata::{Color, ECLevel, Version};
