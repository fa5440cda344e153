use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const SPEC_SUFFIXES: [&str; 4] = [".tfguard.toml", ".tfguard.json", ".tfguard.yaml", ".tfguard.yml"];
const SPEC_NAMES: [&str; 4] = [
    "tfguard.rules.toml",
    "tfguard.rules.json",
    "tfguard.rules.yaml",
    "tfguard.rules.yml",
];

/// Everything a run reads from disk, as canonical absolute paths in sorted order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inputs {
    /// Canonical repository root; result locations are expressed relative to it.
    pub root: Utf8PathBuf,
    pub resource_files: Vec<Utf8PathBuf>,
    /// Rule documents sitting next to a resource file.
    pub spec_files: Vec<Utf8PathBuf>,
}

/// True for rule documents picked up next to resource files.
pub fn is_spec_file(file_name: &str) -> bool {
    SPEC_NAMES.contains(&file_name)
        || SPEC_SUFFIXES
            .iter()
            .any(|suffix| file_name.len() > suffix.len() && file_name.ends_with(suffix))
}

/// Discover resource files and adjacent rule documents.
///
/// Behavior:
/// - Relative `paths` are resolved against `repo_root`; no paths means the root itself.
/// - An explicitly named file is always a resource file.
/// - Directories are walked and files matching `resource_globs` relative to the repo root are
///   collected. Rule documents never count as resource files. Hidden directories (`.git`,
///   `.terraform`, ...) and `node_modules` are skipped.
/// - Every path is canonicalized and deduplicated.
pub fn discover_inputs(
    repo_root: &Utf8Path,
    paths: &[Utf8PathBuf],
    resource_globs: &[String],
) -> anyhow::Result<Inputs> {
    let root = canonical(repo_root).with_context(|| format!("resolve repo root {repo_root}"))?;
    let globs = build_globset(resource_globs).context("compile resource globs")?;

    let requested: Vec<Utf8PathBuf> = if paths.is_empty() {
        vec![root.clone()]
    } else {
        paths
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { root.join(p) })
            .collect()
    };

    let mut resource_files = BTreeSet::new();
    for path in &requested {
        let meta = std::fs::metadata(path).with_context(|| format!("read {path}"))?;
        if meta.is_file() {
            resource_files.insert(canonical(path)?);
            continue;
        }

        let dir = canonical(path)?;
        for entry in WalkDir::new(&dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
        {
            let entry = entry.with_context(|| format!("walk {path}"))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(abs) = pathbuf_to_utf8(entry.path().to_path_buf()) else {
                continue;
            };
            if abs.file_name().is_some_and(is_spec_file) {
                continue;
            }
            // Globs are written against the repo root; a walk outside it matches from its own base.
            let base: &Utf8Path = if dir.starts_with(&root) { &root } else { &dir };
            let rel = abs.strip_prefix(base).unwrap_or(&abs).as_str().replace('\\', "/");
            if globs.is_match(&rel) {
                resource_files.insert(canonical(&abs)?);
            }
        }
    }

    let mut spec_files = BTreeSet::new();
    let dirs: BTreeSet<&Utf8Path> = resource_files.iter().filter_map(|f| f.parent()).collect();
    for dir in dirs {
        for entry in std::fs::read_dir(dir).with_context(|| format!("read directory {dir}"))? {
            let entry = entry.with_context(|| format!("read directory {dir}"))?;
            let Some(abs) = pathbuf_to_utf8(entry.path()) else {
                continue;
            };
            if abs.is_file() && abs.file_name().is_some_and(is_spec_file) {
                spec_files.insert(canonical(&abs)?);
            }
        }
    }

    debug!(
        resources = resource_files.len(),
        spec_files = spec_files.len(),
        "inputs discovered"
    );

    Ok(Inputs {
        root,
        resource_files: resource_files.into_iter().collect(),
        spec_files: spec_files.into_iter().collect(),
    })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name == "node_modules")
}

fn canonical(path: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
    let abs = std::fs::canonicalize(path).with_context(|| format!("canonicalize {path}"))?;
    pathbuf_to_utf8(abs).with_context(|| format!("non UTF-8 path under {path}"))
}

pub(crate) fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        b.add(Glob::new(p).with_context(|| format!("invalid glob: {p}"))?);
    }
    Ok(b.build()?)
}

fn pathbuf_to_utf8(path: PathBuf) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).ok()
}
