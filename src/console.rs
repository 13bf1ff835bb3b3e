//! Line-oriented front end for an interactive studio session.
//!
//! Each input line is one user action. The console owns no state of its own;
//! everything goes through [`Studio`].

use crate::error::GENERATION_FAILED_NOTICE;
use crate::image::{ImageEditor, SourceImage};
use crate::studio::{find_preset, Studio, Submission, MARKETING_PRESETS};
use std::fmt::Write as _;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELP: &str = "\
commands:
  upload <path>       load a product image (PNG, JPEG, WebP)
  remove              remove the product image
  preset <id>         apply a marketing preset (see `presets`)
  edit <text>         apply a free-text edit
  list                show generated images, newest first
  save <n> [dir]      write image n to dir (default: current directory)
  clear               clear generated history
  presets             list presets
  help                show this help
  quit                exit";

/// Errors parsing a console line.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The first word is not a known command.
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    /// A required argument is missing.
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        /// Command that was given.
        command: &'static str,
        /// What it was missing.
        argument: &'static str,
    },

    /// A result number was not a positive integer.
    #[error("not a result number: {0}")]
    InvalidIndex(String),
}

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Command {
    Upload(PathBuf),
    Remove,
    Preset(String),
    Edit(String),
    List,
    /// `number` is 1-based, newest first.
    Save { number: usize, dir: Option<PathBuf> },
    Clear,
    Presets,
    Help,
    Quit,
}

impl Command {
    /// Parses one line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let required = |command: &'static str, argument: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument { command, argument })
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match word.to_lowercase().as_str() {
            "upload" => Self::Upload(PathBuf::from(required("upload", "a file path")?)),
            "remove" => Self::Remove,
            "preset" => Self::Preset(required("preset", "a preset id")?),
            "edit" => Self::Edit(required("edit", "an instruction")?),
            "list" | "ls" => Self::List,
            "save" => {
                let mut args = rest.splitn(2, char::is_whitespace);
                let number = args.next().filter(|s| !s.is_empty()).ok_or(
                    CommandError::MissingArgument {
                        command: "save",
                        argument: "a result number",
                    },
                )?;
                let number = number
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| CommandError::InvalidIndex(number.to_string()))?;
                let dir = args
                    .next()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from);
                Self::Save { number, dir }
            }
            "clear" => Self::Clear,
            "presets" => Self::Presets,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    /// True for commands that send a request to the provider.
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Preset(_) | Self::Edit(_))
    }
}

/// What the loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Print the text and read the next line.
    Continue(String),
    /// Stop the session.
    Quit,
}

/// Applies one command to the studio and renders the reply.
pub async fn execute<E: ImageEditor>(studio: &Studio<E>, command: Command) -> Step {
    let reply = match command {
        Command::Upload(path) => match SourceImage::from_path(&path) {
            Ok(image) => {
                let reply = format!(
                    "loaded {} ({}, {} bytes)",
                    path.display(),
                    image.mime_type(),
                    image.size()
                );
                studio.upload(image);
                reply
            }
            Err(err) => format!("could not load {}: {err}", path.display()),
        },
        Command::Remove => {
            if studio.remove_source() {
                "product image removed".to_string()
            } else {
                "no product image to remove".to_string()
            }
        }
        Command::Preset(id) => match find_preset(&id) {
            Some(preset) => render_submission(studio.submit_preset(preset).await),
            None => format!("unknown preset: {id} (see `presets`)"),
        },
        Command::Edit(text) => render_submission(studio.submit_custom(&text).await),
        Command::List => render_list(studio),
        Command::Save { number, dir } => {
            let ledger = studio.results();
            match number.checked_sub(1).and_then(|i| ledger.get(i)) {
                Some(result) => {
                    let dir = dir.unwrap_or_else(|| PathBuf::from("."));
                    match result.save_to_dir(&dir) {
                        Ok(path) => format!("saved {}", path.display()),
                        Err(err) => format!("could not save: {err}"),
                    }
                }
                None => format!("no result #{number} ({} available)", ledger.len()),
            }
        }
        Command::Clear => {
            studio.clear_history();
            "history cleared".to_string()
        }
        Command::Presets => render_presets(),
        Command::Help => HELP.to_string(),
        Command::Quit => return Step::Quit,
    };
    Step::Continue(reply)
}

fn render_submission(
    outcome: Result<Submission, crate::error::GenerationFailure>,
) -> String {
    match outcome {
        Ok(Submission::Generated(result)) => format!(
            "generated #1: {} ({} bytes)",
            result.prompt_used(),
            result.image().size()
        ),
        Ok(Submission::Ignored(reason)) => format!("nothing sent: {reason}"),
        Err(_) => GENERATION_FAILED_NOTICE.to_string(),
    }
}

fn render_list<E: ImageEditor>(studio: &Studio<E>) -> String {
    let ledger = studio.results();
    if ledger.is_empty() {
        return "no images generated yet".to_string();
    }
    let mut out = format!("{} items", ledger.len());
    for (i, result) in ledger.iter().enumerate() {
        let _ = write!(
            out,
            "\n  [{}] {} ({}, {} bytes)",
            i + 1,
            result.prompt_used(),
            result.download_name(),
            result.image().size()
        );
    }
    out
}

/// One line per built-in preset.
pub fn render_presets() -> String {
    MARKETING_PRESETS
        .iter()
        .map(|p| format!("  {:<10} {}", p.id, p.label))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A generation command running in the background of the read loop.
type Pending<'a> = Pin<Box<dyn Future<Output = Step> + 'a>>;

async fn wait_pending(pending: &mut Option<Pending<'_>>) -> Step {
    match pending {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn write_reply<W: AsyncWrite + Unpin>(output: &mut W, step: Step) -> std::io::Result<()> {
    if let Step::Continue(reply) = step {
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }
    output.write_all(b"> ").await?;
    output.flush().await
}

/// Reads commands until `quit` or end of input, writing replies to `output`.
///
/// Input keeps being read while a generation is outstanding: other commands
/// answer immediately and further generation commands are ignored by the
/// studio rather than queued. The outstanding request always runs to
/// completion before this returns.
pub async fn run<E, R, W>(studio: &Studio<E>, input: R, mut output: W) -> std::io::Result<()>
where
    E: ImageEditor,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut pending: Option<Pending<'_>> = None;
    output.write_all(b"> ").await?;
    output.flush().await?;

    loop {
        tokio::select! {
            // Polled first so a new request has claimed the in-flight flag
            // before the next line is handled.
            biased;

            step = wait_pending(&mut pending), if pending.is_some() => {
                pending = None;
                write_reply(&mut output, step).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let step = match Command::parse(&line) {
                    Ok(None) => None,
                    Ok(Some(command)) if command.is_generation() && pending.is_none() => {
                        pending = Some(Box::pin(execute(studio, command)));
                        continue;
                    }
                    Ok(Some(command)) => match execute(studio, command).await {
                        Step::Quit => break,
                        step => Some(step),
                    },
                    Err(err) => Some(Step::Continue(err.to_string())),
                };
                match step {
                    Some(step) => write_reply(&mut output, step).await?,
                    None => {
                        output.write_all(b"> ").await?;
                        output.flush().await?;
                    }
                }
            }
        }
    }

    if let Some(fut) = pending {
        let step = fut.await;
        write_reply(&mut output, step).await?;
    }
    output.flush().await?;
    Ok(())
}
