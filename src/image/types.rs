//! Core image types: the uploaded source, the edit request and the returned image.

use crate::error::{Result, StudioError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Raster formats accepted as source images and returned by providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Maps a MIME type to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// The user-provided product photo.
///
/// Holds the raw bytes plus the MIME type reported at upload time. The core
/// trusts the MIME type it is given; the file and data-URL constructors are
/// the only places that infer one.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    data: Vec<u8>,
    mime_type: String,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

impl SourceImage {
    /// Wraps already-decoded bytes with their MIME type.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Reads an image file, taking the MIME type from its magic bytes and
    /// falling back to the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;

        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or_else(|| {
                StudioError::InvalidRequest(format!(
                    "unsupported image type: {} (expected PNG, JPEG or WebP)",
                    path.display()
                ))
            })?;

        Ok(Self::new(data, format.mime_type()))
    }

    /// Parses a `data:<mime>;base64,<payload>` URL.
    ///
    /// Whitespace inside the payload and missing `=` padding are tolerated.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| StudioError::Decode("not a data URL".into()))?;
        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| StudioError::Decode("data URL is not base64 encoded".into()))?;
        if mime_type.is_empty() {
            return Err(StudioError::Decode("data URL has no MIME type".into()));
        }

        let cleaned: String = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let data = base64::engine::general_purpose::STANDARD
            .decode(&cleaned)
            .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned))
            .map_err(|e| StudioError::Decode(e.to_string()))?;

        Ok(Self::new(data, mime_type))
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// MIME type reported for the image.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size of the image in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Encodes the image bytes as standard base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// A single call to the generation service: one image, one instruction.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Image to edit.
    pub image: Arc<SourceImage>,
    /// Text describing the desired edit.
    pub instruction: String,
}

impl EditRequest {
    /// Creates a request for the given image and instruction.
    pub fn new(image: Arc<SourceImage>, instruction: impl Into<String>) -> Self {
        Self {
            image,
            instruction: instruction.into(),
        }
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// An image returned by a provider.
#[derive(Clone)]
#[must_use = "generated image should be stored or saved"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl std::fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("format", &self.format)
            .field("size", &self.data.len())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(data: Vec<u8>, format: ImageFormat, metadata: GenerationMetadata) -> Self {
        Self {
            data,
            format,
            metadata,
        }
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"short"), None);
    }

    #[test]
    fn test_format_from_mime_type() {
        assert_eq!(
            ImageFormat::from_mime_type("image/png"),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_mime_type("IMAGE/JPEG"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_mime_type("image/gif"), None);
    }

    #[test]
    fn test_source_from_path_uses_magic_bytes() {
        let dir = tempfile::tempdir().unwrap();
        // Wrong extension on purpose; content wins.
        let path = dir.path().join("product.png");
        std::fs::write(&path, JPEG_MAGIC).unwrap();

        let source = SourceImage::from_path(&path).unwrap();
        assert_eq!(source.mime_type(), "image/jpeg");
        assert_eq!(source.size(), 12);
    }

    #[test]
    fn test_source_from_path_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("product.webp");
        std::fs::write(&path, b"tiny").unwrap();

        let source = SourceImage::from_path(&path).unwrap();
        assert_eq!(source.mime_type(), "image/webp");
    }

    #[test]
    fn test_source_from_path_rejects_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = SourceImage::from_path(&path).unwrap_err();
        assert!(matches!(err, StudioError::InvalidRequest(_)));
    }

    #[test]
    fn test_source_data_url_round_trip() {
        let source = SourceImage::new(PNG_MAGIC.to_vec(), "image/png");
        let url = source.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let parsed = SourceImage::from_data_url(&url).unwrap();
        assert_eq!(parsed, source);
    }

    #[test]
    fn test_source_data_url_lenient() {
        // "hello" without padding and with a line break.
        let parsed = SourceImage::from_data_url("data:image/png;base64,aGVs\nbG8").unwrap();
        assert_eq!(parsed.data(), b"hello");
        assert_eq!(parsed.mime_type(), "image/png");
    }

    #[test]
    fn test_source_data_url_invalid() {
        assert!(SourceImage::from_data_url("https://example.com/a.png").is_err());
        assert!(SourceImage::from_data_url("data:image/png,plain").is_err());
        assert!(SourceImage::from_data_url("data:;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn test_source_debug_omits_bytes() {
        let source = SourceImage::new(vec![1, 2, 3], "image/png");
        let debug = format!("{source:?}");
        assert!(debug.contains("size: 3"));
        assert!(!debug.contains("[1, 2, 3]"));
    }

    #[test]
    fn test_generated_image_debug_omits_bytes() {
        let image = GeneratedImage::new(vec![7; 64], ImageFormat::Jpeg, GenerationMetadata::default());
        let debug = format!("{image:?}");
        assert!(debug.contains("size: 64"));
        assert!(debug.contains("Jpeg"));
        assert!(!debug.contains("7, 7"));
    }
}
