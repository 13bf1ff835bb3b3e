//! Session state and its transitions.

use crate::image::SourceImage;
use crate::studio::ledger::{GenerationResult, ResultLedger};
use std::sync::Arc;

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No source image has been uploaded.
    NoSourceImage,
    /// A request is already outstanding.
    Busy,
    /// The instruction was blank.
    EmptyInstruction,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSourceImage => write!(f, "no source image uploaded"),
            Self::Busy => write!(f, "a generation is already in progress"),
            Self::EmptyInstruction => write!(f, "instruction is empty"),
        }
    }
}

/// Everything the studio knows during a run. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    source_image: Option<Arc<SourceImage>>,
    is_generating: bool,
    ledger: ResultLedger,
}

impl SessionState {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current source image, if any.
    pub fn source_image(&self) -> Option<&Arc<SourceImage>> {
        self.source_image.as_ref()
    }

    /// True while a request is outstanding.
    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    /// Results received so far, newest first.
    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    /// True when a submission would reach the service.
    pub fn can_generate(&self) -> bool {
        self.source_image.is_some() && !self.is_generating
    }

    /// Replaces the source image.
    pub fn upload(&mut self, image: SourceImage) {
        self.source_image = Some(Arc::new(image));
    }

    /// Drops the source image. Returns false if there was none.
    pub fn remove_source(&mut self) -> bool {
        self.source_image.take().is_some()
    }

    /// Empties the ledger.
    pub fn clear_history(&mut self) {
        self.ledger.clear();
    }

    /// Marks a request as outstanding and hands back the image to send.
    ///
    /// Leaves the state untouched when there is no image or a request is
    /// already in flight.
    pub fn begin_generation(&mut self) -> Result<Arc<SourceImage>, IgnoreReason> {
        if self.is_generating {
            return Err(IgnoreReason::Busy);
        }
        let image = self
            .source_image
            .clone()
            .ok_or(IgnoreReason::NoSourceImage)?;
        self.is_generating = true;
        Ok(image)
    }

    /// Ends the outstanding request, recording the result on success.
    pub fn finish_generation(&mut self, result: Option<Arc<GenerationResult>>) {
        if let Some(result) = result {
            self.ledger.prepend(result);
        }
        self.is_generating = false;
    }
}
