mod config;
mod input;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use input::{InputError, Source};
use serde_json::Value;
use sessdiag_core::config::TruncationLimits;
use sessdiag_parsers::jsonl::{open_records, read_records};
use sessdiag_parsers::{
    DETECT_WINDOW, TranscriptSchema, correlate, detect_schema, schema_by_name, schema_for_path,
};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "sessdiag",
    version,
    about = "Diagnostic view of Claude Code, Codex and Pi sessions - tool calls, edits, errors"
)]
struct Cli {
    /// Session file (.jsonl), a directory holding sessions, or `-` for stdin
    #[arg(value_name = "JSONL")]
    input: Option<String>,

    /// Use the most recent session under the default session roots
    #[arg(long, conflicts_with = "input")]
    latest: bool,

    /// Transcript schema
    #[arg(long, value_enum, default_value_t = SchemaArg::Auto)]
    schema: SchemaArg,

    /// Maximum lines kept per tool result
    #[arg(long, value_name = "N")]
    max_lines: Option<usize>,

    /// Maximum characters kept per tool result
    #[arg(long, value_name = "N")]
    max_chars: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Config file (default: $SESSDIAG_CONFIG or ~/.config/sessdiag/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemaArg {
    Auto,
    Claude,
    Codex,
    Pi,
}

impl SchemaArg {
    fn fixed(self) -> Option<&'static str> {
        match self {
            SchemaArg::Auto => None,
            SchemaArg::Claude => Some("claude"),
            SchemaArg::Codex => Some("codex"),
            SchemaArg::Pi => Some("pi"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Diagnostic entries separated by blank lines
    Text,
    /// One JSON event per line
    Jsonl,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<InputError>()
                .map_or(1, InputError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = config::load_config(cli.config.as_deref())?;
    let limits = config.limits.with_overrides(cli.max_lines, cli.max_chars);
    limits.validate()?;

    let source = input::resolve(
        cli.input.as_deref(),
        cli.latest,
        cli.schema.fixed(),
        &config.roots,
    )?;
    if let Source::File {
        path,
        discovered: true,
    } = &source
    {
        eprintln!("# Source: {}", path.display());
    }

    let mut records: Box<dyn Iterator<Item = Value>> = match &source {
        Source::Stdin => Box::new(read_records(std::io::stdin().lock())),
        Source::File { path, .. } => Box::new(open_records(path)?),
    };
    let head: Vec<Value> = records.by_ref().take(DETECT_WINDOW).collect();
    let schema = pick_schema(cli.schema, &source, &head);
    tracing::debug!("Reading transcript as {}", schema.name());

    let emitted = write_events(
        schema.as_ref(),
        head.into_iter().chain(records),
        cli.format,
        limits,
    )?;
    if emitted == 0 {
        eprintln!("No conversation found");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Fixed schema, else the path convention, else record content.
fn pick_schema(arg: SchemaArg, source: &Source, head: &[Value]) -> Box<dyn TranscriptSchema> {
    arg.fixed()
        .and_then(schema_by_name)
        .or_else(|| source.path().and_then(schema_for_path))
        .unwrap_or_else(|| detect_schema(head))
}

fn write_events(
    schema: &dyn TranscriptSchema,
    records: impl Iterator<Item = Value>,
    format: OutputFormat,
    limits: TruncationLimits,
) -> Result<usize> {
    let mut out = BufWriter::new(std::io::stdout().lock());
    let mut emitted = 0;
    for event in correlate(schema, records) {
        match format {
            OutputFormat::Text => writeln!(out, "{}\n", event.render(limits))?,
            OutputFormat::Jsonl => writeln!(out, "{}", serde_json::to_string(&event)?)?,
        }
        emitted += 1;
    }
    out.flush()?;
    Ok(emitted)
}
