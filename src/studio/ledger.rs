//! Generation results and the newest-first ledger that holds them.

use crate::error::Result;
use crate::image::GeneratedImage;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A completed generation, tagged with the instruction that produced it.
///
/// Immutable once created.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    image: GeneratedImage,
    prompt_used: String,
    created_at: DateTime<Utc>,
}

impl GenerationResult {
    /// Builds a result whose prompt reads `"<label>: <instruction>"`.
    pub fn new(image: GeneratedImage, label: &str, instruction: &str) -> Self {
        Self::with_timestamp(image, label, instruction, Utc::now())
    }

    pub(crate) fn with_timestamp(
        image: GeneratedImage,
        label: &str,
        instruction: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            image,
            prompt_used: format!("{label}: {instruction}"),
            created_at,
        }
    }

    /// The generated image.
    pub fn image(&self) -> &GeneratedImage {
        &self.image
    }

    /// Provenance tag plus instruction.
    pub fn prompt_used(&self) -> &str {
        &self.prompt_used
    }

    /// When the result was received.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Embedded image reference suitable for an `<img src>` or a download link.
    pub fn to_data_url(&self) -> String {
        self.image.to_data_url()
    }

    /// Synthetic download file name derived from the creation time.
    pub fn download_name(&self) -> String {
        format!(
            "nano-generated-{}.{}",
            self.created_at.timestamp_millis(),
            self.image.format.extension()
        )
    }

    /// Writes the image into `dir` under [`GenerationResult::download_name`].
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.download_name());
        self.image.save(&path)?;
        Ok(path)
    }
}

/// Ordered collection of results, newest first.
///
/// Grows only through [`ResultLedger::prepend`] and shrinks only through
/// [`ResultLedger::clear`]. Entries are shared, never edited.
#[derive(Debug, Clone, Default)]
pub struct ResultLedger {
    entries: VecDeque<Arc<GenerationResult>>,
}

impl ResultLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a result at position 0.
    pub fn prepend(&mut self, result: Arc<GenerationResult>) {
        self.entries.push_front(result);
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no results are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Result at `index`, 0 being the newest.
    pub fn get(&self, index: usize) -> Option<&Arc<GenerationResult>> {
        self.entries.get(index)
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<GenerationResult>> {
        self.entries.iter()
    }
}
