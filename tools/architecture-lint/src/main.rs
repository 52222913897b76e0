//! Runs the architecture lint over `pipeline/src` of the enclosing workspace.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};

fn main() -> ExitCode {
    let outcome = workspace_root()
        .ok_or_else(|| "no workspace Cargo.toml above the current directory".to_owned())
        .and_then(|root| {
            architecture_lint::lint_pipeline_sources(&root.join("pipeline"))
                .map_err(|err| err.to_string())
        });
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            // Nothing useful remains to do if stderr itself is gone.
            let _ignored = writeln!(io::stderr().lock(), "{message}");
            ExitCode::FAILURE
        }
    }
}

/// First directory with a `[workspace]` manifest, searched upwards from
/// `CARGO_WORKSPACE_DIR`, the current directory, then this crate.
fn workspace_root() -> Option<Utf8PathBuf> {
    let candidates = [
        env::var("CARGO_WORKSPACE_DIR").ok().map(Utf8PathBuf::from),
        env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok()),
        Some(Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|start| enclosing_workspace(&start))
}

fn enclosing_workspace(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .find(|dir| {
            fs::read_to_string(dir.join("Cargo.toml"))
                .is_ok_and(|manifest| manifest.contains("[workspace]"))
        })
        .map(Utf8Path::to_path_buf)
}
