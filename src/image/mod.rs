//! Image types and the generation service boundary.

mod provider;
#[cfg(feature = "gemini")]
pub mod providers;
mod types;

pub use provider::ImageEditor;
pub use types::{EditRequest, GeneratedImage, GenerationMetadata, ImageFormat, SourceImage};
