//! Image editing provider trait.

use crate::error::Result;
use crate::image::types::{EditRequest, GeneratedImage};
use async_trait::async_trait;

/// A generative-image service that edits a source image from an instruction.
///
/// One call to [`ImageEditor::edit`] is exactly one request to the service.
/// Implementations must not retry on their own.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Sends the image and instruction to the service and returns the edited image.
    async fn edit(&self, request: &EditRequest) -> Result<GeneratedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
