//! `config` command.

use luasense::Settings;

pub fn run(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
