use super::OutputFormat;
use anyhow::{anyhow, Result};
use colored::*;
use enforcement::EnforcementConfig;
use humantime::format_duration;
use std::path::Path;

/// Load a configuration file and print the effective values
pub fn execute(path: &Path, format: OutputFormat) -> Result<()> {
    let config = EnforcementConfig::from_file(path)
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    match format {
        OutputFormat::Json => {
            let json_output = serde_json::to_string_pretty(&config)?;
            println!("{}", json_output);
        }
        OutputFormat::Yaml => {
            let yaml_output = config
                .to_yaml()
                .map_err(|e| anyhow!("Failed to render configuration: {}", e))?;
            println!("{}", yaml_output);
        }
        OutputFormat::Text => print_config_text(path, &config),
    }

    Ok(())
}

fn print_config_text(path: &Path, config: &EnforcementConfig) {
    println!("{}", "=== Enforcement Configuration ===".bold());
    println!();
    println!("{}: {}", "Source".bold(), path.display().to_string().cyan());
    println!();

    let cache = &config.cache;
    println!("{}", "[cache]".cyan().bold());
    println!("  {}: {}", "maximum_size".cyan(), cache.maximum_size.to_string().magenta());
    println!(
        "  {}: {}",
        "expire_after_write".cyan(),
        format_duration(cache.expire_after_write).to_string().yellow()
    );
    println!(
        "  {}: {}",
        "ask_timeout".cyan(),
        format_duration(cache.ask_timeout).to_string().yellow()
    );
    println!();

    println!("{}", "[blocked_namespaces]".cyan().bold());
    if config.blocked_namespaces.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for namespace in &config.blocked_namespaces {
        println!("  - {}", namespace.yellow());
    }
    println!();

    println!("{}", "Configuration is valid".green());
}
