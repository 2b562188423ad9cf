use crate::resolution::Resolution;
use async_trait::async_trait;

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to a terminal resolution state.
    ///
    /// Never fails: storage problems surface as [`Resolution::NotFound`].
    async fn resolve(&self, code: &str) -> Resolution;
}
