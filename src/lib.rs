#![warn(missing_docs)]
//! Nano Studio - product mockups from a single photo.
//!
//! Load a product image, apply a marketing preset or a free-text edit, and
//! collect the images returned by a generative-image provider.
//!
//! # Quick Start
//!
//! ```no_run
//! use nano_studio::{find_preset, GeminiProvider, SourceImage, Studio, Submission};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let studio = Studio::new(GeminiProvider::builder().build()?);
//!     studio.upload(SourceImage::from_path("product.png")?);
//!
//!     let mug = find_preset("mug").expect("built-in preset");
//!     if let Submission::Generated(result) = studio.submit_preset(mug).await? {
//!         result.save_to_dir(".")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `gemini`: Gemini (Google) image provider
//! - `cli`: `nano-studio` command-line interface

mod error;

pub mod console;
pub mod image;
pub mod studio;

// Re-export error types at crate root
pub use error::{GenerationFailure, Result, StudioError, GENERATION_FAILED_NOTICE};

pub use image::{
    EditRequest, GeneratedImage, GenerationMetadata, ImageEditor, ImageFormat, SourceImage,
};

pub use studio::{
    find_preset, GenerationResult, IgnoreReason, Preset, ResultLedger, SessionState, Studio,
    Submission, CUSTOM_LABEL, MARKETING_PRESETS,
};

#[cfg(feature = "gemini")]
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{GenerationFailure, Result, StudioError};
    pub use crate::image::{GeneratedImage, ImageEditor, SourceImage};
    pub use crate::studio::{find_preset, GenerationResult, Studio, Submission};

    #[cfg(feature = "gemini")]
    pub use crate::image::providers::GeminiProvider;
}
