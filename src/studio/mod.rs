//! Studio session: request orchestration, result ledger and presets.

mod ledger;
mod orchestrator;
mod presets;
mod session;

pub use ledger::{GenerationResult, ResultLedger};
pub use orchestrator::{Studio, Submission};
pub use presets::{find_preset, Preset, CUSTOM_LABEL, MARKETING_PRESETS};
pub use session::{IgnoreReason, SessionState};

#[cfg(test)]
pub(crate) use orchestrator::tests::FakeEditor;
