use thiserror::Error;

pub type Result<T> = std::result::Result<T, QrError>;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("nothing to encode")]
    EmptyContent,
    #[error("size must be between {min} and {max} pixels, got {size}")]
    InvalidSize { size: u32, min: u32, max: u32 },
    #[error("invalid color '{0}': expected #rrggbb or #rgb")]
    InvalidColor(String),
    #[error("invalid error correction level '{0}': expected L, M, Q or H")]
    InvalidErrorCorrection(String),
    #[error("failed to encode qr code: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("logo is {size} bytes, the limit is {max}")]
    LogoTooLarge { size: u64, max: u64 },
    #[error("failed to read logo: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
