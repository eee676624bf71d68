//! `check` command.

use anyhow::Context;
use std::path::Path;

use luasense::Settings;
use luasense::checker::Checker;
use luasense::indexing::DocumentManager;

/// Prints one line per problem; exits non-zero when errors were found.
pub async fn run(settings: &Settings, file: &Path) -> anyhow::Result<bool> {
    let documents = DocumentManager::new(settings.parser_options());
    let index = documents.open_file(file)?;

    let mut diagnostics = index.diagnostics.clone();
    if !index.malformed {
        let checker = Checker::new(settings.static_check.clone());
        let found = checker
            .check(&file.to_string_lossy(), &index.text)
            .await
            .context("static check failed")?;
        diagnostics.extend(found);
    }

    let mut has_errors = false;
    for diagnostic in &diagnostics {
        has_errors |= diagnostic.severity == luasense::types::Severity::Error;
        println!(
            "{}:{}:{}: [{}{}] {}",
            file.display(),
            diagnostic.range.start.line + 1,
            diagnostic.range.start.character + 1,
            diagnostic.source,
            diagnostic
                .code
                .as_deref()
                .map(|code| format!(" {code}"))
                .unwrap_or_default(),
            diagnostic.message
        );
    }
    Ok(!has_errors)
}
