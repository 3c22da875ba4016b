use sessdiag_core::config::RootSettings;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Session roots for a schema, in search order, with `~` expanded.
///
/// For Codex, `$CODEX_HOME/sessions` comes before the configured roots.
pub fn session_roots(schema: &str, roots: &RootSettings) -> Vec<PathBuf> {
    let codex_home = std::env::var("CODEX_HOME").ok();
    roots_with_codex_home(schema, roots, codex_home.as_deref())
}

fn roots_with_codex_home(
    schema: &str,
    roots: &RootSettings,
    codex_home: Option<&str>,
) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if schema == "codex" {
        if let Some(codex_home) = codex_home.map(str::trim).filter(|h| !h.is_empty()) {
            out.push(expand(codex_home).join("sessions"));
        }
    }
    out.extend(roots.for_schema(schema).iter().map(|root| expand(root)));

    let mut seen = HashSet::new();
    out.retain(|root| seen.insert(root.clone()));
    out
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Recursively find `.jsonl` files under a directory.
pub fn find_jsonl_files(dir: &Path) -> Vec<PathBuf> {
    let pattern = format!("{}/**/*.jsonl", glob::Pattern::escape(&dir.to_string_lossy()));
    glob::glob(&pattern)
        .map(|paths| paths.filter_map(Result::ok).filter(|p| p.is_file()).collect())
        .unwrap_or_default()
}

/// Most recently modified `.jsonl` file under `dir`.
pub fn find_latest_jsonl(dir: &Path) -> Option<PathBuf> {
    newest(find_jsonl_files(dir))
}

/// Most recently modified `.jsonl` file across several roots. Roots that do
/// not exist are ignored.
pub fn latest_in_roots(roots: &[PathBuf]) -> Option<PathBuf> {
    newest(
        roots
            .iter()
            .filter(|root| root.is_dir())
            .flat_map(|root| find_jsonl_files(root)),
    )
}

fn newest(paths: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    paths
        .into_iter()
        .map(|path| (modified(&path), path))
        .max()
        .map(|(_, path)| path)
}

fn modified(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
