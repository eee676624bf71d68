//! `modules` command.

use std::path::PathBuf;

use luasense::Settings;

pub fn run(settings: &Settings, root: Option<PathBuf>) -> anyhow::Result<()> {
    let root = super::workspace_root(root);
    let modules = super::scanned_modules(settings, &root);

    for name in modules.names() {
        for entry in modules.entries(&name) {
            println!("{name}\t{}", entry.path.display());
        }
    }
    eprintln!("{} module files under {} roots", modules.len(), modules.roots().len());
    Ok(())
}
