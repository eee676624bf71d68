mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use luasense::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {e}");
            Settings::default()
        }),
    };
    luasense::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Definition {
            file,
            line,
            column,
            root,
        } => cli::commands::definition::run(&settings, &file, line, column, root)?,
        Commands::Symbols { file, all } => cli::commands::symbols::run(&settings, &file, all)?,
        Commands::Check { file } => {
            if !cli::commands::check::run(&settings, &file).await? {
                std::process::exit(1);
            }
        }
        Commands::Modules { root } => cli::commands::modules::run(&settings, root)?,
        Commands::Watch { root } => cli::commands::watch::run(&settings, root).await?,
        Commands::Config => cli::commands::config::run(&settings)?,
    }
    Ok(())
}
