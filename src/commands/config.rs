use crate::core::Config;
use anyhow::{Context, Result};
use colored::Colorize;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("set", sub_matches)) => set(sub_matches),
        Some(("reset", _)) => reset(),
        Some(("path", _)) => {
            println!("{}", Config::get_config_path()?.display());
            Ok(())
        }
        _ => {
            println!("Use 'diskwatch config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;
    println!("{}", "Current configuration:".white().bold());
    println!("  {:<22} {}", "interval_minutes", config.interval_minutes.to_string().cyan());
    println!("  {:<22} {}", "notify_enabled", config.notify_enabled.to_string().cyan());
    println!("  {:<22} {}", "icon_healthy", config.icon_healthy.cyan());
    println!("  {:<22} {}", "icon_failing", config.icon_failing.cyan());
    println!("  {:<22} {}", "startup_delay_secs", config.startup_delay_secs.to_string().cyan());
    println!("  {:<22} {}", "unit_timeout_secs", config.unit_timeout_secs.to_string().cyan());
    println!(
        "  {:<22} {}",
        "rescan_interval_secs",
        config.rescan_interval_secs.to_string().cyan()
    );
    Ok(())
}

fn set(matches: &clap::ArgMatches) -> Result<()> {
    let key = matches
        .get_one::<String>("key")
        .context("Key argument is required")?;
    let value = matches
        .get_one::<String>("value")
        .context("Value argument is required")?;

    let mut config = Config::load()?;
    config.set_value(key, value)?;
    config.save()?;

    println!("{} {} = {}", "✓ Set".green(), key, value.cyan());
    Ok(())
}

fn reset() -> Result<()> {
    Config::default().save()?;
    println!("{}", "✓ Configuration reset to defaults".green());
    Ok(())
}
