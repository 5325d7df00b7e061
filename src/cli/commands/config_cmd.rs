//! Configuration management commands.

use console::style;

use crate::config::{Config, Settings};

/// Print the effective configuration as TOML.
pub fn cmd_config_show(settings: &Settings, loaded: &Config) -> anyhow::Result<()> {
    match &loaded.source_path {
        Some(path) => eprintln!("{} Loaded from {}", style("→").dim(), path.display()),
        None => eprintln!("{} No config file found, using defaults", style("!").yellow()),
    }
    let effective = Config::from_settings(settings);
    print!("{}", toml::to_string_pretty(&effective)?);
    Ok(())
}
