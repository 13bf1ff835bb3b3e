//! CLI for Nano Studio - product mockups via Gemini image models.

use clap::{Args, Parser, Subcommand, ValueEnum};
use nano_studio::{
    find_preset, GeminiModel, GeminiProvider, ImageEditor, SourceImage, Studio, Submission,
    MARKETING_PRESETS,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nano-studio")]
#[command(about = "Turn a product photo into marketing mockups with Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Gemini model to use
    #[arg(long, value_enum, global = true, default_value = "flash")]
    model: ModelArg,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in marketing presets
    Presets,

    /// Apply one preset or edit to an image and save the result
    Generate(GenerateArgs),

    /// Start an interactive session reading commands from stdin
    Studio,

    /// Check that the API key and model are usable
    Check,
}

#[derive(Args)]
struct GenerateArgs {
    /// Product image to edit
    #[arg(short, long)]
    input: PathBuf,

    /// Preset id (see `presets`)
    #[arg(short, long, conflicts_with = "prompt", required_unless_present = "prompt")]
    preset: Option<String>,

    /// Free-text edit instruction
    #[arg(long)]
    prompt: Option<String>,

    /// Directory the generated image is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    /// Gemini 2.5 Flash Image
    Flash,
    /// Gemini 3 Pro Image
    Pro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash => GeminiModel::NanoBanana,
            ModelArg::Pro => GeminiModel::NanoBananaPro,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Presets => list_presets(cli.json)?,
        Commands::Generate(args) => generate(args, cli.model, cli.json).await?,
        Commands::Studio => run_studio(cli.model).await?,
        Commands::Check => check(cli.model, cli.json).await?,
    }

    Ok(())
}

fn build_provider(model: ModelArg) -> anyhow::Result<GeminiProvider> {
    Ok(GeminiProvider::builder().model(model.into()).build()?)
}

fn list_presets(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(&MARKETING_PRESETS)?);
    } else {
        println!("Presets:\n");
        println!("{}", nano_studio::console::render_presets());
    }
    Ok(())
}

async fn generate(args: GenerateArgs, model: ModelArg, json_output: bool) -> anyhow::Result<()> {
    let studio = Studio::new(build_provider(model)?);
    studio.upload(SourceImage::from_path(&args.input)?);

    let submission = match (&args.preset, &args.prompt) {
        (Some(id), _) => {
            let preset = find_preset(id).ok_or_else(|| {
                anyhow::anyhow!("unknown preset: {id} (run `nano-studio presets`)")
            })?;
            studio.submit_preset(preset).await?
        }
        (None, Some(prompt)) => studio.submit_custom(prompt).await?,
        (None, None) => anyhow::bail!("either --preset or --prompt is required"),
    };

    let result = match submission {
        Submission::Generated(result) => result,
        Submission::Ignored(reason) => anyhow::bail!("nothing generated: {reason}"),
    };

    std::fs::create_dir_all(&args.output_dir)?;
    let path = result.save_to_dir(&args.output_dir)?;

    if json_output {
        let output = serde_json::json!({
            "success": true,
            "output": path.display().to_string(),
            "prompt": result.prompt_used(),
            "size_bytes": result.image().size(),
            "format": result.image().format.extension(),
            "model": result.image().metadata.model,
            "duration_ms": result.image().metadata.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Generated image: {} ({} bytes)",
            path.display(),
            result.image().size()
        );
        println!("Prompt: {}", result.prompt_used());
        if let Some(duration) = result.image().metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
    }

    Ok(())
}

async fn run_studio(model: ModelArg) -> anyhow::Result<()> {
    let studio = Studio::new(build_provider(model)?);
    eprintln!("Nano Studio - type `help` for commands");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    nano_studio::console::run(&studio, stdin, tokio::io::stdout()).await?;
    Ok(())
}

async fn check(model: ModelArg, json_output: bool) -> anyhow::Result<()> {
    let provider = build_provider(model)?;
    let status = provider.health_check().await;

    if json_output {
        let output = serde_json::json!({
            "provider": provider.name(),
            "model": provider.model().as_str(),
            "ok": status.is_ok(),
            "error": status.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match &status {
            Ok(()) => println!("✓ {} ({})", provider.name(), provider.model().as_str()),
            Err(e) => println!("✗ {} ({}): {e}", provider.name(), provider.model().as_str()),
        }
    }

    status.map_err(Into::into)
}
