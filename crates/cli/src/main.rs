// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use kobosync_config::ConfigManager;
use log::debug;
use std::path::PathBuf;

mod commands;

use commands::Settings;

fn device_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("kobo")
                .short('k')
                .long("kobo")
                .value_name("NAME")
                .help("Volume label of the device (default from config: KOBOeReader)"),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("USER")
                .help("Owner of the mount point under the mount root (default: $USER)"),
        )
        .arg(
            Arg::new("mount")
                .short('m')
                .long("mount")
                .value_name("DIR")
                .help("Device mount point, bypassing <mount_root>/<user>/<kobo>"),
        )
}

fn build_cli() -> Command {
    Command::new("kobosync")
        .version("0.1.0")
        .about("Keeps manga series metadata and a Kobo e-reader library in step")
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml")
                .global(true),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .value_name("DIR")
                .help("Series directory")
                .default_value(".")
                .global(true),
        )
        .subcommand(
            Command::new("init")
                .about("Create the metadata file of a series from the archives it contains")
                .arg(Arg::new("series").short('s').long("series").value_name("NAME").help("Series name (default: directory name)"))
                .arg(
                    Arg::new("index")
                        .short('i')
                        .long("index")
                        .value_name("N")
                        .help("Index of the first volume")
                        .value_parser(clap::value_parser!(u32).range(1..)),
                )
                .arg(Arg::new("force").short('f').long("force").help("Overwrite an existing metadata file").action(ArgAction::SetTrue)),
        )
        .subcommand(device_args(
            Command::new("sync")
                .about("Copy volumes to the device and update its library")
                .arg(
                    Arg::new("volumes")
                        .short('v')
                        .long("volumes")
                        .value_name("INDEX")
                        .help("Only these volume indices")
                        .num_args(1..)
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(Arg::new("oneshot").short('s').long("oneshot").help("The series is a single standalone book").action(ArgAction::SetTrue))
                .arg(Arg::new("yes").short('y').long("yes").help("Do not wait for the device to be replugged").action(ArgAction::SetTrue))
                .arg(Arg::new("update-only").long("update-only").help("Skip copying, only rewrite library records").action(ArgAction::SetTrue))
                .arg(Arg::new("json").long("json").help("Print the report as JSON").action(ArgAction::SetTrue)),
        ))
        .subcommand(
            Command::new("get")
                .about("Print a metadata field")
                .arg(Arg::new("field").required(true).value_name("FIELD").help("Dotted path, e.g. vol.2.date")),
        )
        .subcommand(
            Command::new("set")
                .about("Change a metadata field")
                .arg(Arg::new("field").required(true).value_name("FIELD").help("Dotted path, e.g. vol.2.date"))
                .arg(Arg::new("value").value_name("VALUE").required_unless_present("unset").help("New value"))
                .arg(Arg::new("unset").long("unset").help("Remove the field instead").action(ArgAction::SetTrue).conflicts_with("value")),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or edit config.toml")
                .subcommand_required(true)
                .subcommand(Command::new("path").about("Print the location of config.toml"))
                .subcommand(Command::new("show").about("Print the effective configuration, environment overrides included"))
                .subcommand(Command::new("check").about("Validate config.toml"))
                .subcommand(
                    Command::new("init")
                        .about("Write a default config.toml")
                        .arg(Arg::new("force").short('f').long("force").help("Replace an existing file with defaults").action(ArgAction::SetTrue)),
                )
                .subcommand(
                    Command::new("set")
                        .about("Change one setting, e.g. device.user or library.archive_extensions")
                        .arg(Arg::new("key").required(true).value_name("KEY").help("Dotted key, e.g. device.books_dir"))
                        .arg(Arg::new("value").required(true).value_name("VALUE").allow_hyphen_values(true).help("New value; lists are comma-separated")),
                ),
        )
        .subcommand(device_args(Command::new("books").about("List the books on the device")))
        .subcommand(device_args(
            Command::new("shelves")
                .about("List the collections on the device, or the books in one")
                .arg(Arg::new("name").value_name("NAME").help("Collection name")),
        ))
        .subcommand(device_args(
            Command::new("remove")
                .about("Remove a book from the device library")
                .arg(Arg::new("title").required(true).value_name("TITLE").help("Exact book title"))
                .arg(Arg::new("force").short('f').long("force").help("Skip confirmation prompt").action(ArgAction::SetTrue)),
        ))
}

fn config_manager(matches: &clap::ArgMatches) -> Result<ConfigManager> {
    match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    }
    .context("Failed to locate configuration")
}

fn load_settings(matches: &clap::ArgMatches) -> Result<Settings> {
    let manager = config_manager(matches)?;
    let config = manager
        .load_with_env_overrides()
        .with_context(|| format!("Failed to load {}", manager.config_path().display()))?;
    debug!("Configuration loaded from {}", manager.config_path().display());

    let path = matches
        .get_one::<String>("path")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(Settings::new(config, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        // Runs before loading so a broken file can still be inspected or reset
        Some(("config", sub_matches)) => {
            commands::config_command(&config_manager(sub_matches)?, sub_matches)
        }
        Some((name, sub_matches)) => {
            // Global arguments are propagated down, so read them from the subcommand
            let settings = load_settings(sub_matches)?;
            match name {
                "init" => commands::init_series(&settings, sub_matches),
                "sync" => commands::sync_series(&settings, sub_matches).await,
                "get" => commands::get_field(&settings, sub_matches),
                "set" => commands::set_field(&settings, sub_matches),
                "books" => commands::list_books(&settings, sub_matches).await,
                "shelves" => commands::list_shelves(&settings, sub_matches).await,
                "remove" => commands::remove_book(&settings, sub_matches).await,
                _ => {
                    build_cli().print_help()?;
                    Ok(())
                }
            }
        }
        None => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
