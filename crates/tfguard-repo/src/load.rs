use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use tfguard_domain::{RuleOrigin, RuleSource, SourceKind};
use tfguard_settings::{DocFormat, LoadError, parse_rules};
use tfguard_types::RepoPath;
use tracing::debug;

use crate::discover::Inputs;

/// Loads one rule document from disk.
pub trait RuleSourceLoader {
    fn load(&self, path: &Utf8Path, origin: RuleOrigin) -> anyhow::Result<RuleSource>;
}

/// Reads the file and picks the parser from its extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileRuleLoader;

impl RuleSourceLoader for FileRuleLoader {
    fn load(&self, path: &Utf8Path, origin: RuleOrigin) -> anyhow::Result<RuleSource> {
        let file = origin.file.clone().unwrap_or_else(|| path.to_string());
        let Some(format) = DocFormat::from_path(path.as_str()) else {
            return Err(LoadError::UnsupportedFormat { file }.into());
        };
        let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
        let source = parse_rules(&text, format, origin)?;
        debug!(file = %file, rules = source.rules.len(), "rule document loaded");
        Ok(source)
    }
}

/// Load adjacent spec files (sorted) followed by the optional custom rules file.
///
/// Every document is read once. A custom file that is also an adjacent spec file is loaded only
/// as the custom source, so it keeps the highest precedence.
pub fn load_rule_sources(
    inputs: &Inputs,
    custom_rules: Option<&Utf8Path>,
    loader: &dyn RuleSourceLoader,
) -> anyhow::Result<Vec<RuleSource>> {
    let custom = custom_rules.map(|custom| {
        let abs = if custom.is_absolute() {
            custom.to_path_buf()
        } else {
            inputs.root.join(custom)
        };
        let abs = std::fs::canonicalize(&abs)
            .ok()
            .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
            .unwrap_or(abs);
        (custom, abs)
    });

    let mut sources = Vec::with_capacity(inputs.spec_files.len() + 1);

    for file in &inputs.spec_files {
        if custom.as_ref().is_some_and(|(_, abs)| abs == file) {
            debug!(file = %file, "spec file is also the custom rules file; loading it once");
            continue;
        }
        let rel = RepoPath::relative_to(&inputs.root, file);
        let origin = RuleOrigin::file(SourceKind::SpecFile, rel.as_str());
        sources.push(loader.load(file, origin)?);
    }

    if let Some((custom, abs)) = custom {
        let rel = RepoPath::relative_to(&inputs.root, &abs);
        let origin = RuleOrigin::file(SourceKind::Custom, rel.as_str());
        sources.push(
            loader
                .load(&abs, origin)
                .with_context(|| format!("load custom rules {custom}"))?,
        );
    }

    Ok(sources)
}
