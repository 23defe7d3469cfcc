use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use docsathi_lib::config::AppConfig;
use docsathi_lib::pipeline::{mask_pii, run_pipeline, ErrorKind, PipelineError, PipelineOptions};
use docsathi_lib::samples;

#[derive(Parser)]
#[command(name = "docsathi")]
#[command(version, about = "Turn outpatient notes into a validated record and FHIR-like bundle")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct NoteSource {
    /// Note file, or `-` for stdin (default)
    file: Option<PathBuf>,
    /// Use a built-in sample note instead of a file
    #[arg(long, conflicts_with = "file")]
    sample: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extraction pipeline and print the result as JSON
    Extract {
        #[command(flatten)]
        source: NoteSource,
        /// Model identifier (overrides OPENAI_MODEL / OLLAMA_MODEL)
        #[arg(long)]
        model: Option<String>,
        /// Provider base URL (overrides OPENAI_BASE_URL / OLLAMA_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
        /// Request deterministic sampling
        #[arg(long)]
        strict: bool,
        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },
    /// Mask PII offline and print the masked note with its flags
    Mask {
        #[command(flatten)]
        source: NoteSource,
    },
    /// List built-in sample notes
    Samples,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    docsathi_lib::init_tracing();

    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error ({}): {e}", e.kind().as_str());
            ExitCode::from(exit_code(e.kind()))
        }
    }
}

fn execute(command: Commands) -> Result<(), PipelineError> {
    match command {
        Commands::Extract {
            source,
            model,
            base_url,
            strict,
            compact,
        } => {
            let note = read_note(&source)?;
            let config = AppConfig::from_env()?;
            let options = PipelineOptions {
                model,
                base_url,
                strict_mode: strict,
            };
            let result = run_pipeline(&note, &options, &config, None)?;
            let json = if compact {
                serde_json::to_string(&result)
            } else {
                serde_json::to_string_pretty(&result)
            }?;
            println!("{json}");
        }
        Commands::Mask { source } => {
            let note = read_note(&source)?;
            let (masked_note, flags) = mask_pii(&note);
            let output = serde_json::json!({ "masked_note": masked_note, "flags": flags });
            let json = serde_json::to_string_pretty(&output)?;
            println!("{json}");
        }
        Commands::Samples => {
            for name in samples::names() {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn read_note(source: &NoteSource) -> Result<String, PipelineError> {
    if let Some(name) = source.sample.as_deref() {
        return samples::sample(name).map(str::to_string).ok_or_else(|| {
            PipelineError::Configuration(format!(
                "unknown sample '{name}'; run `docsathi samples` to list them"
            ))
        });
    }

    match source.file.as_deref() {
        Some(path) if path != Path::new("-") => {
            std::fs::read_to_string(path).map_err(|error| PipelineError::Input {
                source_name: path.display().to_string(),
                error,
            })
        }
        _ => {
            let mut note = String::new();
            std::io::stdin()
                .read_to_string(&mut note)
                .map_err(|error| PipelineError::Input {
                    source_name: "stdin".into(),
                    error,
                })?;
            Ok(note)
        }
    }
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Io => 1,
        ErrorKind::Configuration => 2,
        ErrorKind::Transient => 3,
        ErrorKind::Unparseable => 4,
    }
}
