//! `symbols` command.

use std::path::Path;

use luasense::Settings;
use luasense::indexing::DocumentManager;
use luasense::providers::document_symbols;

pub fn run(settings: &Settings, file: &Path, all: bool) -> anyhow::Result<()> {
    let documents = DocumentManager::new(settings.parser_options());
    let index = documents.open_file(file)?;
    let global_only = !all && settings.symbol_display.show_function_global_only;

    for symbol in document_symbols(&index, global_only) {
        let container = symbol
            .container_name
            .map(|name| format!(" in {name}"))
            .unwrap_or_default();
        println!(
            "{}:{}\t{}\t{}{container}",
            symbol.selection_range.start.line + 1,
            symbol.selection_range.start.character + 1,
            symbol.kind.as_str(),
            symbol.name
        );
    }
    Ok(())
}
