pub mod random;

use qrlink_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness against existing codes is the caller's job: the shortener
/// checks the registry and asks for another code on collision.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;
    /// Generates a candidate short code.
    fn generate(&self) -> Self::Output;
}
