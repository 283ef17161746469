use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use diskwatch::commands;

fn main() -> Result<()> {
    diskwatch::init_logging();

    let matches = Command::new("diskwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Watches the health of drives and RAID arrays")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("monitor")
                .about("Monitor storage units in the foreground and alert on health changes")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MINUTES")
                        .help("Minutes between periodic health checks")
                        .value_parser(clap::value_parser!(u32))
                )
                .arg(
                    Arg::new("no-notify")
                        .long("no-notify")
                        .help("Do not raise alerts when the health verdict changes")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("notifier")
                        .short('n')
                        .long("notifier")
                        .value_name("KIND")
                        .help("Where alerts are delivered")
                        .value_parser(["desktop", "log", "json"])
                        .default_value("desktop")
                )
                .arg(
                    Arg::new("icon-healthy")
                        .long("icon-healthy")
                        .value_name("ICON")
                        .help("Icon name used for healthy alerts")
                )
                .arg(
                    Arg::new("icon-failing")
                        .long("icon-failing")
                        .value_name("ICON")
                        .help("Icon name used for failing alerts")
                )
        )
        .subcommand(
            Command::new("status")
                .about("Check every storage unit once and print the result")
                .arg(
                    Arg::new("json")
                        .short('j')
                        .long("json")
                        .help("Print the result as JSON")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("self-test")
                .about("Start a short SMART self-test on a drive")
                .arg(
                    Arg::new("device")
                        .help("Device path or short name, e.g. /dev/sda or sda")
                        .required(true)
                        .index(1)
                )
        )
        .subcommand(
            Command::new("config")
                .about("Manage configuration (use 'diskwatch config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Show the current configuration"))
                .subcommand(
                    Command::new("set")
                        .about("Set a configuration value")
                        .arg(
                            Arg::new("key")
                                .help("Configuration key, e.g. interval_minutes")
                                .required(true)
                                .index(1)
                        )
                        .arg(
                            Arg::new("value")
                                .help("New value")
                                .required(true)
                                .index(2)
                        )
                )
                .subcommand(Command::new("reset").about("Restore the default configuration"))
                .subcommand(Command::new("path").about("Print the configuration file path"))
        )
        .subcommand(
            Command::new("version")
                .about("Shows version information")
        )
        .get_matches();

    if matches.get_flag("version") {
        return commands::version();
    }

    match matches.subcommand() {
        Some(("monitor", sub_matches)) => {
            commands::monitor(sub_matches)?;
        }
        Some(("status", sub_matches)) => {
            commands::status(sub_matches)?;
        }
        Some(("self-test", sub_matches)) => {
            commands::self_test(sub_matches)?;
        }
        Some(("config", sub_matches)) => {
            commands::config::execute(sub_matches)?;
        }
        Some(("version", _)) => {
            commands::version()?;
        }
        _ => {
            println!("Welcome to diskwatch!");
            println!("Use 'diskwatch --help' for more information.");
        }
    }

    Ok(())
}
