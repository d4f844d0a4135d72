use std::path::Path;
use std::process::ExitCode;

use anstyle::{AnsiColor, Effects, Style};

use tooldeck::LoadedCatalog;
use tooldeck::commands::catalog::Catalog;
use tooldeck::config_file::{Config, ConfigStore};
use tooldeck::remote;

const CATEGORY: Style = Style::new()
    .fg_color(Some(anstyle::Color::Ansi(AnsiColor::Blue)))
    .effects(Effects::BOLD);
const DIM: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::BrightBlack)));

/// Print every command with the path `run` accepts for it
pub fn list(catalog: &Catalog) {
    if catalog.categories.is_empty() {
        println!("No commands configured.");
        return;
    }
    for category in &catalog.categories {
        println!("{CATEGORY}{}{CATEGORY:#}", category.name);
        for tool in &category.tools {
            if tool.description.is_empty() {
                println!("  {}", tool.name);
            } else {
                println!("  {}  {DIM}{}{DIM:#}", tool.name, tool.description);
            }
            for command in &tool.commands {
                println!(
                    "    {}/{}/{}  {DIM}{}{DIM:#}",
                    category.name, tool.name, command.name, command.template
                );
            }
        }
    }
}

pub async fn fetch(store: &ConfigStore, url: &str) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = remote::fetch_config(url).await?;
    store.save(&config)?;
    println!(
        "Loaded {} categories from {url} into {}",
        config.categories.len(),
        store.path().display()
    );
    Ok(ExitCode::SUCCESS)
}

pub fn import(store: &ConfigStore, file: &str) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = store.import(Path::new(file))?;
    println!(
        "Imported {} categories from {file} into {}",
        config.categories.len(),
        store.path().display()
    );
    Ok(ExitCode::SUCCESS)
}

pub fn export(loaded: &LoadedCatalog, file: &str) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::from_catalog(&loaded.catalog, loaded.use_internal_terminal);
    ConfigStore::export(&config, Path::new(file))?;
    println!("Exported {} commands to {file}", loaded.catalog.command_count());
    Ok(ExitCode::SUCCESS)
}
