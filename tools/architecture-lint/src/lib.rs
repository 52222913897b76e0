//! Repo-local architectural lint for the schema pipeline's hexagon.
//!
//! Every Rust file under `pipeline/src/{domain,inbound,outbound}` is parsed
//! with `syn` and each path it mentions is checked against the rules of its
//! layer:
//!
//! - `domain` may not reach adapter modules, HTTP, filesystem, CLI, or
//!   configuration crates, nor the process and filesystem APIs of `std` and
//!   `tokio`
//! - `inbound` may not reach `outbound` modules or transport crates
//! - `outbound` may not reach `inbound` modules or clap
//!
//! Files elsewhere in `pipeline/src` (the binary, configuration) are wiring
//! and are not checked. Run it with `cargo run -p architecture-lint`.

use std::collections::BTreeSet;
use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use syn::visit::Visit;

const LIBRARY_CRATE: &str = "schema_pipeline";
const LAYERS: [Layer; 3] = [Layer::Domain, Layer::Inbound, Layer::Outbound];

/// A single boundary violation discovered by the linter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File path relative to `pipeline/src`.
    pub file: Utf8PathBuf,
    /// Human-readable description of the violated rule.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.message)
    }
}

/// Failure modes returned by the architecture lint.
#[derive(Debug)]
pub enum ArchitectureLintError {
    /// Directory traversal or reading failed.
    Io(io::Error),
    /// A source file could not be attributed to a layer or parsed.
    Parse {
        /// Offending file, relative to `pipeline/src`.
        file: Utf8PathBuf,
        /// What went wrong.
        message: String,
    },
    /// One or more boundary violations were found.
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "architecture lint could not read sources: {err}"),
            Self::Parse { file, message } => write!(f, "cannot lint {file}: {message}"),
            Self::Violations(violations) => {
                writeln!(f, "{} architecture boundary violation(s):", violations.len())?;
                violations
                    .iter()
                    .try_for_each(|violation| writeln!(f, "  {violation}"))
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse { .. } | Self::Violations(_) => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `pipeline/src`.
    pub file: Utf8PathBuf,
    /// Rust source text.
    pub contents: String,
}

/// Lint the layer directories of `pipeline_dir/src` on disk.
pub fn lint_pipeline_sources(pipeline_dir: &Utf8Path) -> Result<(), ArchitectureLintError> {
    let src = Dir::open_ambient_dir(pipeline_dir.join("src"), ambient_authority())?;
    let mut sources = Vec::new();
    for layer in LAYERS {
        let dir = match src.open_dir(layer.dir_name()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err.into()),
        };
        read_sources(&dir, Utf8Path::new(layer.dir_name()), &mut sources)?;
    }
    sources.sort_by(|left, right| left.file.cmp(&right.file));
    lint_sources(&sources)
}

/// Lint in-memory sources whose paths are relative to `pipeline/src`.
///
/// Every file must live under one of the layer directories.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let layer = Layer::of(&source.file).ok_or_else(|| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message: "file is not under domain/, inbound/, or outbound/".to_owned(),
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(
            layer
                .breaches(&parsed)
                .into_iter()
                .map(|breach| Violation {
                    file: source.file.clone(),
                    message: breach.describe(layer),
                }),
        );
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Outbound,
}

/// What a layer may not name.
struct Rules {
    modules: &'static [&'static str],
    crates: &'static [&'static str],
    apis: &'static [&'static str],
}

impl Layer {
    fn of(file: &Utf8Path) -> Option<Self> {
        let first = file.components().next()?.as_str();
        LAYERS.into_iter().find(|layer| layer.dir_name() == first)
    }

    const fn dir_name(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    const fn rules(self) -> Rules {
        match self {
            Self::Domain => Rules {
                modules: &["inbound", "outbound"],
                crates: &[
                    "camino",
                    "cap_std",
                    "clap",
                    "ortho_config",
                    "reqwest",
                    "tracing_subscriber",
                    "url",
                ],
                apis: &["std::fs", "std::process", "tokio::fs", "tokio::process"],
            },
            Self::Inbound => Rules {
                modules: &["outbound"],
                crates: &["cap_std", "reqwest", "tracing_subscriber"],
                apis: &[],
            },
            Self::Outbound => Rules {
                modules: &["inbound"],
                crates: &["clap"],
                apis: &[],
            },
        }
    }

    fn breaches(self, parsed: &syn::File) -> BTreeSet<Breach> {
        let rules = self.rules();
        let mut collector = PathCollector::default();
        collector.visit_file(parsed);

        let mut breaches = BTreeSet::new();
        for path in &collector.paths {
            if let Some(module) = layer_module(path).and_then(|root| find(rules.modules, root)) {
                breaches.insert(Breach::Module(module));
            }
            if let Some(krate) = external_crate(path).and_then(|root| find(rules.crates, root)) {
                breaches.insert(Breach::Crate(krate));
            }
            if let Some(api) = rules.apis.iter().copied().find(|api| starts_with(path, api)) {
                breaches.insert(Breach::Api(api));
            }
        }
        breaches
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Breach {
    Module(&'static str),
    Crate(&'static str),
    Api(&'static str),
}

impl Breach {
    fn describe(self, layer: Layer) -> String {
        let name = layer.dir_name();
        match self {
            Self::Module(root) => format!("{name} module must not depend on crate::{root}"),
            Self::Crate(root) => {
                format!("{name} module must not depend on external crate `{root}`")
            }
            Self::Api(api) => format!("{name} module must not use `{api}`"),
        }
    }
}

fn find(names: &'static [&'static str], candidate: &str) -> Option<&'static str> {
    names.iter().copied().find(|name| *name == candidate)
}

fn starts_with(path: &[String], api: &str) -> bool {
    let expected: Vec<&str> = api.split("::").collect();
    path.len() >= expected.len()
        && path
            .iter()
            .zip(&expected)
            .all(|(segment, wanted)| segment.as_str() == *wanted)
}

fn is_relative(segment: &str) -> bool {
    matches!(segment, "crate" | "self" | "super")
}

/// The pipeline layer a path points into, if any.
fn layer_module(path: &[String]) -> Option<&str> {
    let first = path.first()?.as_str();
    let root = if is_relative(first) {
        path.iter().map(String::as_str).find(|segment| !is_relative(segment))?
    } else if first == LIBRARY_CRATE {
        path.get(1)?.as_str()
    } else {
        first
    };
    LAYERS
        .into_iter()
        .map(Layer::dir_name)
        .find(|name| *name == root)
}

fn external_crate(path: &[String]) -> Option<&str> {
    let root = path.first()?.as_str();
    (!is_relative(root) && root != LIBRARY_CRATE).then_some(root)
}

/// Every path a file mentions, with `use` trees flattened.
#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
    prefix: Vec<String>,
}

impl PathCollector {
    fn flatten(&mut self, tree: &syn::UseTree) {
        let leaf = match tree {
            syn::UseTree::Path(path) => {
                self.prefix.push(path.ident.to_string());
                self.flatten(&path.tree);
                self.prefix.pop();
                return;
            }
            syn::UseTree::Group(group) => {
                group.items.iter().for_each(|item| self.flatten(item));
                return;
            }
            syn::UseTree::Name(name) => name.ident.to_string(),
            syn::UseTree::Rename(rename) => rename.ident.to_string(),
            syn::UseTree::Glob(_) => "*".to_owned(),
        };
        let mut path = self.prefix.clone();
        path.push(leaf);
        self.paths.insert(path);
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let path: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !path.is_empty() {
            self.paths.insert(path);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.flatten(&node.tree);
    }
}

fn read_sources(
    dir: &Dir,
    relative: &Utf8Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry
            .file_name()
            .into_string()
            .map_err(|name| ArchitectureLintError::Parse {
                file: relative.join(&*name.to_string_lossy()),
                message: "file name is not valid UTF-8".to_owned(),
            })?;
        let file = relative.join(&name);
        if entry.file_type()?.is_dir() {
            read_sources(&entry.open_dir()?, &file, sources)?;
        } else if file.extension() == Some("rs") {
            let contents = dir.read_to_string(&name)?;
            sources.push(LintSource { file, contents });
        }
    }
    Ok(())
}
