use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clinote_ai::T5Generator;
use clinote_core::Settings;

mod qa;
mod summarize;

#[derive(Parser)]
#[command(name = "clinote", version, about = "Summarize and ask questions about clinical notes")]
struct Cli {
    /// Directory holding the exported seq2seq model.
    #[arg(long, env = "CLINOTE_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a CSV file of clinical notes.
    Summarize {
        /// Path to the input CSV file.
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Path to save the output CSV file.
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Ask a question about a single clinical note.
    Qa {
        /// The clinical note text.
        #[arg(long)]
        note: String,

        /// The question to ask.
        #[arg(long)]
        question: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut settings = Settings::default();
    if let Some(dir) = cli.model_dir {
        settings.model_dir = dir;
    }

    // The one expensive construction, shared by both commands.
    tracing::info!(model_dir = %settings.model_dir.display(), "loading model");
    let mut processor = T5Generator::load(&settings.model_dir, &settings)?;

    match cli.command {
        Command::Summarize {
            input_file,
            output_file,
        } => {
            let input = input_file.unwrap_or_else(|| settings.input_path.clone());
            let output = output_file.unwrap_or_else(|| settings.output_path.clone());
            summarize::run(&mut processor, &input, &output)?;
        }
        Command::Qa { note, question } => {
            qa::run(&mut processor, &note, &question, &mut std::io::stdout())?;
        }
    }

    Ok(())
}
