//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Lua symbol and type resolution from the command line
#[derive(Parser)]
#[command(
    name = "luasense",
    version = env!("CARGO_PKG_VERSION"),
    about = "Scope-aware symbol and type resolution for Lua",
    long_about = "Resolve definitions, list symbols, run the static checker and inspect the \
                  workspace module index of a Lua project.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to a custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Go to definition (1-based line and column)
    Definition {
        file: PathBuf,
        line: u32,
        column: u32,

        /// Workspace root used for `require` lookups
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// List the symbols defined in a file
    Symbols {
        file: PathBuf,

        /// Include nested locals, not just top-level definitions
        #[arg(short, long)]
        all: bool,
    },

    /// Report parser and luacheck diagnostics for a file
    Check { file: PathBuf },

    /// List modules found under the search roots
    Modules {
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Watch the search roots and log module index updates
    Watch {
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Display active settings as TOML
    Config,
}
