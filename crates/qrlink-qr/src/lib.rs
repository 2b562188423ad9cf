//! QR code rendering with colors and an optional centered logo.

pub mod color;
pub mod error;
pub mod render;

pub use color::Color;
pub use error::QrError;
pub use render::{load_logo, render, save_png, ErrorCorrection, QrOptions, MAX_LOGO_BYTES};
