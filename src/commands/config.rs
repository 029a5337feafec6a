//! `config show` and `config set`.

use owo_colors::OwoColorize;
use serde_json::json;

use super::print_json;
use crate::config::Config;
use crate::error::Result;

/// Show the effective configuration and where it comes from
pub fn cmd_config_show(json: bool) -> Result<()> {
    let config = Config::load()?;
    let path = Config::config_path();

    if json {
        return print_json(&json!({
            "config_file": path.to_string_lossy(),
            "config": config,
        }));
    }

    println!("{}\n", "Configuration:".cyan().bold());
    println!("{}: {}", "page_size".cyan(), config.page_size);
    println!("{}:", "dismiss".cyan());
    println!("  suppression_ms: {}", config.dismiss.suppression_ms);
    println!("  listener_delay_ms: {}", config.dismiss.listener_delay_ms);
    println!("  overlay_classes: {}", config.dismiss.overlay_classes.join(", "));
    println!("{}:", "panel".cyan());
    println!("  width: {}", config.panel.width);
    println!("  expanded_percent: {}", config.panel.expanded_percent);
    println!("\n{} {}", "Config file:".dimmed(), path.display());
    Ok(())
}

/// Set one configuration value by dotted key
pub fn cmd_config_set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;
    println!("Set {} = {}", key.cyan(), value);
    Ok(())
}
