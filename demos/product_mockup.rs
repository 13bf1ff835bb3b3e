//! Product mockup example - runs every marketing preset against one photo.
//!
//! Run with: `cargo run --example product_mockup -- <product.png>`
//!
//! Requires `GOOGLE_API_KEY` environment variable.

use nano_studio::{GeminiProvider, SourceImage, Studio, Submission, MARKETING_PRESETS};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input_path = std::env::args()
        .nth(1)
        .expect("Usage: product_mockup <product.png>");

    let studio = Studio::new(GeminiProvider::builder().build()?);
    studio.upload(SourceImage::from_path(&input_path)?);

    for preset in &MARKETING_PRESETS {
        match studio.submit_preset(preset).await {
            Ok(Submission::Generated(result)) => {
                let path = result.save_to_dir(".")?;
                println!("{} -> {}", preset.label, path.display());
            }
            Ok(Submission::Ignored(reason)) => println!("{}: skipped ({reason})", preset.label),
            Err(err) => println!("{}: {err}", preset.label),
        }
    }

    println!("{} mockups generated", studio.results().len());
    Ok(())
}
