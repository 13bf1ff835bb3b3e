//! The request orchestrator: one owning context around the session state.

use crate::error::GenerationFailure;
use crate::image::{EditRequest, ImageEditor, SourceImage};
use crate::studio::ledger::{GenerationResult, ResultLedger};
use crate::studio::presets::{Preset, CUSTOM_LABEL};
use crate::studio::session::{IgnoreReason, SessionState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What a submission did.
#[derive(Debug, Clone)]
pub enum Submission {
    /// The service returned an image; it is now at the head of the ledger.
    Generated(Arc<GenerationResult>),
    /// Nothing was sent.
    Ignored(IgnoreReason),
}

/// A studio session bound to an image editing provider.
///
/// All mutation goes through the methods here. The state lock is never held
/// across the provider call, so reads stay available while a request is in
/// flight.
pub struct Studio<E> {
    editor: E,
    state: Mutex<SessionState>,
}

impl<E: ImageEditor> Studio<E> {
    /// Creates a studio with an empty session.
    pub fn new(editor: E) -> Self {
        Self::with_session(editor, SessionState::new())
    }

    /// Creates a studio around an existing session.
    pub fn with_session(editor: E, session: SessionState) -> Self {
        Self {
            editor,
            state: Mutex::new(session),
        }
    }

    /// The provider requests are sent to.
    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Sets or replaces the source image.
    pub fn upload(&self, image: SourceImage) {
        tracing::info!(
            mime_type = image.mime_type(),
            size = image.size(),
            "source image uploaded"
        );
        lock(&self.state).upload(image);
    }

    /// Removes the source image. Returns false if there was none.
    pub fn remove_source(&self) -> bool {
        lock(&self.state).remove_source()
    }

    /// Empties the result ledger.
    pub fn clear_history(&self) {
        let mut state = lock(&self.state);
        tracing::info!(cleared = state.ledger().len(), "history cleared");
        state.clear_history();
    }

    /// Current source image, if any.
    pub fn source_image(&self) -> Option<Arc<SourceImage>> {
        lock(&self.state).source_image().cloned()
    }

    /// True while a request is outstanding.
    pub fn is_generating(&self) -> bool {
        lock(&self.state).is_generating()
    }

    /// True when a submission would reach the service.
    pub fn can_generate(&self) -> bool {
        lock(&self.state).can_generate()
    }

    /// Snapshot of the ledger, newest first.
    pub fn results(&self) -> ResultLedger {
        lock(&self.state).ledger().clone()
    }

    /// Sends the current source image with `instruction` to the provider.
    ///
    /// Ignored when no image is uploaded or another request is outstanding.
    /// On success the result, tagged `"<label>: <instruction>"`, is prepended
    /// to the ledger. On failure the session is left exactly as it was. The
    /// in-flight flag is released in every case, including when the returned
    /// future is dropped before completion.
    pub async fn submit(
        &self,
        instruction: &str,
        label: &str,
    ) -> Result<Submission, GenerationFailure> {
        let begun = lock(&self.state).begin_generation();
        let image = match begun {
            Ok(image) => image,
            Err(reason) => {
                tracing::debug!(%reason, label, "submission ignored");
                return Ok(Submission::Ignored(reason));
            }
        };

        let in_flight = InFlight::new(&self.state);
        let request = EditRequest::new(image, instruction);

        tracing::info!(provider = self.editor.name(), label, "generating image");

        match self.editor.edit(&request).await {
            Ok(image) => {
                let result = Arc::new(GenerationResult::new(image, label, instruction));
                in_flight.finish(Some(result.clone()));
                tracing::info!(
                    prompt = result.prompt_used(),
                    size = result.image().size(),
                    "image generated"
                );
                Ok(Submission::Generated(result))
            }
            Err(err) => {
                in_flight.finish(None);
                tracing::warn!(kind = err.kind(), error = %err, label, "image generation failed");
                Err(GenerationFailure::new(err))
            }
        }
    }

    /// Submits a preset's prompt under its label.
    pub async fn submit_preset(&self, preset: &Preset) -> Result<Submission, GenerationFailure> {
        self.submit(preset.prompt, preset.label).await
    }

    /// Submits free text under the custom label. Blank text is ignored.
    pub async fn submit_custom(&self, text: &str) -> Result<Submission, GenerationFailure> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Submission::Ignored(IgnoreReason::EmptyInstruction));
        }
        self.submit(text, CUSTOM_LABEL).await
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    // State transitions cannot panic half-way, so a poisoned lock is still consistent.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the in-flight flag when the request ends or its future is dropped.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<SessionState>) -> Self {
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self, result: Option<Arc<GenerationResult>>) {
        lock(self.state).finish_generation(result);
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            lock(self.state).finish_generation(None);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{Result, StudioError, GENERATION_FAILED_NOTICE};
    use crate::image::{GeneratedImage, GenerationMetadata, ImageFormat};
    use crate::studio::presets::find_preset;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// A call as seen by the fake service.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct RecordedCall {
        pub data: Vec<u8>,
        pub mime_type: String,
        pub instruction: String,
    }

    /// Scripted in-process provider.
    #[derive(Default)]
    pub(crate) struct FakeEditor {
        calls: AtomicUsize,
        recorded: Mutex<Vec<RecordedCall>>,
        script: Mutex<VecDeque<Result<GeneratedImage>>>,
        gate: Option<Notify>,
    }

    impl FakeEditor {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Each call waits for `release()` before answering.
        pub(crate) fn gated() -> Self {
            Self {
                gate: Some(Notify::new()),
                ..Self::default()
            }
        }

        pub(crate) fn then_succeed(self) -> Self {
            self.script.lock().unwrap().push_back(Ok(GeneratedImage::new(
                b"scripted".to_vec(),
                ImageFormat::Png,
                GenerationMetadata::default(),
            )));
            self
        }

        pub(crate) fn then_fail(self, err: StudioError) -> Self {
            self.script.lock().unwrap().push_back(Err(err));
            self
        }

        pub(crate) fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn recorded(&self) -> Vec<RecordedCall> {
            self.recorded.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageEditor for FakeEditor {
        async fn edit(&self, request: &EditRequest) -> Result<GeneratedImage> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.recorded.lock().unwrap().push(RecordedCall {
                data: request.image.data().to_vec(),
                mime_type: request.image.mime_type().to_string(),
                instruction: request.instruction.clone(),
            });
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let scripted = self.script.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| {
                Ok(GeneratedImage::new(
                    format!("image-{n}").into_bytes(),
                    ImageFormat::Png,
                    GenerationMetadata::default(),
                ))
            })
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn image_a() -> SourceImage {
        SourceImage::new(b"image-a".to_vec(), "image/png")
    }

    fn generated(submission: Submission) -> Arc<GenerationResult> {
        match submission {
            Submission::Generated(result) => result,
            other => panic!("expected a generated result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_preset_submission_calls_service_once() {
        let studio = Studio::new(FakeEditor::new());
        studio.upload(image_a());

        let mug = find_preset("mug").unwrap();
        let result = generated(studio.submit_preset(mug).await.unwrap());

        assert_eq!(
            studio.editor().recorded(),
            vec![RecordedCall {
                data: b"image-a".to_vec(),
                mime_type: "image/png".into(),
                instruction: mug.prompt.into(),
            }]
        );
        assert_eq!(result.prompt_used(), format!("Coffee Mug: {}", mug.prompt));

        let ledger = studio.results();
        assert_eq!(ledger.len(), 1);
        assert!(Arc::ptr_eq(ledger.get(0).unwrap(), &result));
        assert!(!studio.is_generating());
    }

    #[tokio::test]
    async fn test_sequential_successes_are_newest_first() {
        let studio = Studio::new(FakeEditor::new());
        studio.upload(image_a());

        let r1 = generated(studio.submit("first", "Custom Edit").await.unwrap());
        let r2 = generated(studio.submit("second", "Custom Edit").await.unwrap());
        let r3 = generated(studio.submit("third", "Custom Edit").await.unwrap());

        let ledger = studio.results();
        assert_eq!(ledger.len(), 3);
        let order: Vec<_> = ledger.iter().cloned().collect();
        assert!(Arc::ptr_eq(&order[0], &r3));
        assert!(Arc::ptr_eq(&order[1], &r2));
        assert!(Arc::ptr_eq(&order[2], &r1));
    }

    #[tokio::test]
    async fn test_submit_without_source_is_noop() {
        let studio = Studio::new(FakeEditor::new());

        let outcome = studio.submit("anything", "Custom Edit").await.unwrap();
        assert!(matches!(
            outcome,
            Submission::Ignored(IgnoreReason::NoSourceImage)
        ));
        assert_eq!(studio.editor().call_count(), 0);
        assert!(studio.results().is_empty());
        assert!(!studio.is_generating());
    }

    #[tokio::test]
    async fn test_submit_while_generating_forced_is_noop() {
        let mut session = SessionState::new();
        session.upload(image_a());
        session.begin_generation().unwrap();
        let studio = Studio::with_session(FakeEditor::new(), session);

        let outcome = studio.submit_custom("add neon").await.unwrap();
        assert!(matches!(outcome, Submission::Ignored(IgnoreReason::Busy)));
        assert_eq!(studio.editor().call_count(), 0);
        assert!(studio.results().is_empty());
        assert!(studio.is_generating());
    }

    #[tokio::test]
    async fn test_concurrent_submit_is_rejected() {
        let studio = Arc::new(Studio::new(FakeEditor::gated()));
        studio.upload(image_a());

        let first = tokio::spawn({
            let studio = studio.clone();
            async move { studio.submit("first", "Custom Edit").await }
        });
        while !studio.is_generating() {
            tokio::task::yield_now().await;
        }

        let second = studio.submit("second", "Custom Edit").await.unwrap();
        assert!(matches!(second, Submission::Ignored(IgnoreReason::Busy)));
        assert_eq!(studio.editor().call_count(), 1);

        studio.editor().release();
        let first = first.await.unwrap().unwrap();
        assert_eq!(generated(first).prompt_used(), "Custom Edit: first");
        assert_eq!(studio.results().len(), 1);
        assert!(!studio.is_generating());
    }

    #[tokio::test]
    async fn test_failure_leaves_state_untouched() {
        let editor = FakeEditor::new().then_succeed().then_fail(StudioError::Api {
            status: 500,
            message: "boom".into(),
        });
        let studio = Studio::new(editor);
        studio.upload(image_a());

        let kept = generated(studio.submit("keep me", "Custom Edit").await.unwrap());
        let source_before = studio.source_image().unwrap();

        let err = studio.submit("fail", "Custom Edit").await.unwrap_err();
        assert_eq!(err.to_string(), GENERATION_FAILED_NOTICE);
        assert_eq!(err.cause().kind(), "api");
        assert_eq!(studio.editor().call_count(), 2);

        let ledger = studio.results();
        assert_eq!(ledger.len(), 1);
        assert!(Arc::ptr_eq(ledger.get(0).unwrap(), &kept));
        assert!(Arc::ptr_eq(&studio.source_image().unwrap(), &source_before));
        assert!(!studio.is_generating());
        assert!(studio.can_generate());
    }

    #[tokio::test]
    async fn test_recovers_after_failure() {
        let editor = FakeEditor::new().then_fail(StudioError::RateLimited { retry_after: None });
        let studio = Studio::new(editor);
        studio.upload(image_a());

        assert!(studio.submit("one", "Custom Edit").await.is_err());
        let result = generated(studio.submit("two", "Custom Edit").await.unwrap());

        assert_eq!(result.prompt_used(), "Custom Edit: two");
        assert_eq!(studio.results().len(), 1);
        assert_eq!(studio.editor().call_count(), 2);
    }

    #[tokio::test]
    async fn test_dropped_request_releases_guard() {
        let studio = Studio::new(FakeEditor::gated());
        studio.upload(image_a());

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), studio.submit("slow", "Custom Edit"))
                .await;
        assert!(timed_out.is_err());

        assert!(!studio.is_generating());
        assert!(studio.results().is_empty());
        assert_eq!(studio.editor().call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_custom_text_is_noop() {
        let studio = Studio::new(FakeEditor::new());
        studio.upload(image_a());

        let outcome = studio.submit_custom("   ").await.unwrap();
        assert!(matches!(
            outcome,
            Submission::Ignored(IgnoreReason::EmptyInstruction)
        ));
        assert_eq!(studio.editor().call_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_text_is_trimmed_and_labelled() {
        let studio = Studio::new(FakeEditor::new());
        studio.upload(image_a());

        let result = generated(studio.submit_custom("  add neon ").await.unwrap());
        assert_eq!(result.prompt_used(), "Custom Edit: add neon");
        assert_eq!(studio.editor().recorded()[0].instruction, "add neon");
    }

    #[tokio::test]
    async fn test_removed_source_makes_submit_noop() {
        let studio = Studio::new(FakeEditor::new());
        studio.upload(image_a());
        assert!(studio.remove_source());

        let outcome = studio.submit("x", "Custom Edit").await.unwrap();
        assert!(matches!(
            outcome,
            Submission::Ignored(IgnoreReason::NoSourceImage)
        ));
        assert_eq!(studio.editor().call_count(), 0);
    }

    #[tokio::test]
    async fn test_reupload_sends_latest_image() {
        let studio = Studio::new(FakeEditor::new());
        studio.upload(image_a());
        studio.upload(SourceImage::new(b"image-b".to_vec(), "image/webp"));

        studio.submit("x", "Custom Edit").await.unwrap();
        let call = &studio.editor().recorded()[0];
        assert_eq!(call.data, b"image-b");
        assert_eq!(call.mime_type, "image/webp");
    }

    #[tokio::test]
    async fn test_clear_history_empties_ledger() {
        let studio = Studio::new(FakeEditor::new());
        studio.upload(image_a());
        studio.submit("one", "Custom Edit").await.unwrap();
        studio.submit("two", "Custom Edit").await.unwrap();

        studio.clear_history();
        assert!(studio.results().is_empty());
        assert!(studio.source_image().is_some());

        studio.clear_history();
        assert!(studio.results().is_empty());
    }
}
