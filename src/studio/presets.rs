//! Built-in marketing presets.

use serde::Serialize;

/// A named, pre-written instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preset {
    /// Short identifier used on the command line.
    pub id: &'static str,
    /// Display label; also the provenance tag on results.
    pub label: &'static str,
    /// Instruction sent to the generation service.
    pub prompt: &'static str,
}

/// Label used for free-text instructions.
pub const CUSTOM_LABEL: &str = "Custom Edit";

/// The marketing presets offered by the studio.
pub const MARKETING_PRESETS: [Preset; 3] = [
    Preset {
        id: "mug",
        label: "Coffee Mug",
        prompt: "Generate a realistic product photography shot of a ceramic coffee mug featuring this image printed clearly on the side. The lighting should be professional studio lighting.",
    },
    Preset {
        id: "billboard",
        label: "City Billboard",
        prompt: "A high-angle shot of a busy city street featuring a large digital billboard displaying this image as an advertisement. The scene should look realistic and urban.",
    },
    Preset {
        id: "tshirt",
        label: "Apparel",
        prompt: "A model wearing a clean white t-shirt with this image printed on the center chest. The style should be casual street wear.",
    },
];

/// Looks up a preset by id, ignoring case.
pub fn find_preset(id: &str) -> Option<&'static Preset> {
    let id = id.trim();
    MARKETING_PRESETS
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(id))
}
