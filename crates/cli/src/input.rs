use sessdiag_core::config::RootSettings;
use sessdiag_parsers::discover::{find_latest_jsonl, latest_in_roots, session_roots};
use std::path::{Path, PathBuf};

const ALL_SCHEMAS: &[&str] = &["claude", "codex", "pi"];

/// Failures resolving which transcript to read. Each maps to an exit status.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Sessions directory not found: {0}")]
    MissingRoot(String),
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("No .jsonl files found in {0}")]
    NoSessions(String),
}

impl InputError {
    pub fn exit_code(&self) -> u8 {
        match self {
            InputError::MissingRoot(_) | InputError::FileNotFound(_) => 2,
            InputError::NoSessions(_) => 1,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Source {
    Stdin,
    File {
        path: PathBuf,
        /// Picked by search rather than named directly.
        discovered: bool,
    },
}

impl Source {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::Stdin => None,
            Source::File { path, .. } => Some(path),
        }
    }
}

/// Resolve the positional argument (or its absence) into a transcript source.
///
/// `-` is stdin, a directory means its newest `.jsonl`, and no argument
/// (or `--latest`) means the newest session under the configured roots of
/// `schema`, or of every schema when it is not fixed.
pub fn resolve(
    input: Option<&str>,
    latest: bool,
    schema: Option<&str>,
    roots: &RootSettings,
) -> Result<Source, InputError> {
    match input {
        Some("-") if !latest => Ok(Source::Stdin),
        Some(raw) if !latest => resolve_path(raw),
        _ => resolve_latest(schema, roots),
    }
}

fn resolve_path(raw: &str) -> Result<Source, InputError> {
    let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
    if path.is_dir() {
        return find_latest_jsonl(&path)
            .map(|path| Source::File {
                path,
                discovered: true,
            })
            .ok_or_else(|| InputError::NoSessions(path.display().to_string()));
    }
    if !path.exists() {
        return Err(InputError::FileNotFound(path));
    }
    Ok(Source::File {
        path,
        discovered: false,
    })
}

fn resolve_latest(schema: Option<&str>, roots: &RootSettings) -> Result<Source, InputError> {
    let schemas = schema.map_or(ALL_SCHEMAS.to_vec(), |name| vec![name]);
    let candidates: Vec<PathBuf> = schemas
        .iter()
        .flat_map(|name| session_roots(name, roots))
        .collect();
    let existing: Vec<PathBuf> = candidates.iter().filter(|p| p.is_dir()).cloned().collect();
    if existing.is_empty() {
        return Err(InputError::MissingRoot(join_paths(&candidates)));
    }
    latest_in_roots(&existing)
        .map(|path| Source::File {
            path,
            discovered: true,
        })
        .ok_or_else(|| InputError::NoSessions(join_paths(&existing)))
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
