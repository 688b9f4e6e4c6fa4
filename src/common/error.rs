use thiserror::Error;

// Error
//------------------------------------------------------------------------------

/// Failure to turn a payload into a symbol. Deterministic: the same input
/// always fails the same way.
#[derive(Error, Debug, PartialEq, Eq, Copy, Clone)]
pub enum EncodingError {
    #[error("Data too long: {bits} bits exceed capacity of {capacity} bits")]
    DataTooLong { bits: usize, capacity: usize },
    #[error("Invalid version: {0}")]
    InvalidVersion(usize),
    #[error("Invalid masking pattern: {0}")]
    InvalidMaskPattern(u8),
}

/// Failure to lay a symbol out as pixels.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum RenderError {
    #[error("Target too small: {available}px available, at least {required}px required")]
    TooSmall { available: u32, required: u32 },
    #[error("Image too large: {modules} modules of {module_size}px overflow the pixel range")]
    TooLarge { modules: u32, module_size: u32 },
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    #[error("Text requested without a font")]
    MissingFont,
}

#[derive(Error, Debug)]
pub enum QRError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("No content provided")]
    MissingText,
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type QRResult<T> = Result<T, QRError>;
