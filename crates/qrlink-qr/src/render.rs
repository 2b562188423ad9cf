use crate::color::Color;
use crate::error::{QrError, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use qrcode::{EcLevel, QrCode};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use typed_builder::TypedBuilder;

pub const MIN_SIZE: u32 = 200;
pub const MAX_SIZE: u32 = 800;
pub const DEFAULT_SIZE: u32 = 350;

/// Largest logo file accepted by [`load_logo`].
pub const MAX_LOGO_BYTES: u64 = 5 * 1024 * 1024;

/// Logo edge length relative to the image.
const LOGO_SCALE: f64 = 0.2;
/// Extra radius, in pixels, of the background disc behind the logo.
const LOGO_PADDING: f64 = 10.0;

/// QR error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCorrection {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    #[default]
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery; the best choice when a logo covers the center.
    H,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(value: ErrorCorrection) -> Self {
        match value {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(ErrorCorrection::L),
            "M" => Ok(ErrorCorrection::M),
            "Q" => Ok(ErrorCorrection::Q),
            "H" => Ok(ErrorCorrection::H),
            _ => Err(QrError::InvalidErrorCorrection(s.to_string())),
        }
    }
}

impl Display for ErrorCorrection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            ErrorCorrection::L => "L",
            ErrorCorrection::M => "M",
            ErrorCorrection::Q => "Q",
            ErrorCorrection::H => "H",
        };
        f.write_str(level)
    }
}

/// Rendering options for [`render`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct QrOptions {
    /// Edge length of the square output image, in pixels.
    #[builder(default = DEFAULT_SIZE)]
    pub size: u32,
    #[builder(default)]
    pub ec_level: ErrorCorrection,
    #[builder(default = Color::BLACK)]
    pub foreground: Color,
    #[builder(default = Color::WHITE)]
    pub background: Color,
    /// Quiet zone around the symbol, in modules.
    #[builder(default = 2)]
    pub margin: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl QrOptions {
    fn validate(&self) -> Result<()> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&self.size) {
            return Err(QrError::InvalidSize {
                size: self.size,
                min: MIN_SIZE,
                max: MAX_SIZE,
            });
        }
        Ok(())
    }
}

/// Renders `text` as a QR code of exactly `options.size` pixels square.
///
/// Modules are scaled to fill the image, so module edges may differ by a
/// pixel. When a logo is given it is scaled to a fifth of the image and
/// drawn over a background-colored disc in the center; pair it with a high
/// error correction level so the covered modules can be recovered.
pub fn render(text: &str, options: &QrOptions, logo: Option<&DynamicImage>) -> Result<RgbaImage> {
    if text.trim().is_empty() {
        return Err(QrError::EmptyContent);
    }
    options.validate()?;

    let code = QrCode::with_error_correction_level(text.as_bytes(), options.ec_level.into())?;
    let modules = code.width();
    let colors = code.to_colors();
    let margin = options.margin as usize;
    let total = modules + 2 * margin;
    let size = options.size as usize;

    let foreground = options.foreground.to_rgba();
    let background = options.background.to_rgba();

    let mut image = RgbaImage::from_fn(options.size, options.size, |x, y| {
        let column = x as usize * total / size;
        let row = y as usize * total / size;
        let inside = (margin..margin + modules).contains(&column)
            && (margin..margin + modules).contains(&row);
        if inside && colors[(row - margin) * modules + (column - margin)] == qrcode::Color::Dark {
            foreground
        } else {
            background
        }
    });

    if let Some(logo) = logo {
        overlay_logo(&mut image, logo, background);
    }

    debug!(
        size = options.size,
        modules,
        ec_level = %options.ec_level,
        logo = logo.is_some(),
        "rendered qr code"
    );
    Ok(image)
}

fn overlay_logo(image: &mut RgbaImage, logo: &DynamicImage, background: Rgba<u8>) {
    let size = image.width();
    let logo_size = ((size as f64 * LOGO_SCALE).round() as u32).max(1);

    let center = size as f64 / 2.0;
    let radius = logo_size as f64 / 2.0 + LOGO_PADDING;
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - center;
        let dy = y as f64 + 0.5 - center;
        if dx * dx + dy * dy <= radius * radius {
            *pixel = background;
        }
    }

    let scaled = imageops::resize(&logo.to_rgba8(), logo_size, logo_size, FilterType::Lanczos3);
    let offset = i64::from((size - logo_size) / 2);
    imageops::overlay(image, &scaled, offset, offset);
}

/// Reads a logo image from disk, rejecting files over [`MAX_LOGO_BYTES`]
/// before decoding them.
pub fn load_logo(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)?.len();
    if size > MAX_LOGO_BYTES {
        return Err(QrError::LogoTooLarge {
            size,
            max: MAX_LOGO_BYTES,
        });
    }
    Ok(image::open(path)?)
}

/// Writes `image` as a PNG file.
pub fn save_png(image: &RgbaImage, path: impl AsRef<Path>) -> Result<()> {
    image.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    Ok(())
}
