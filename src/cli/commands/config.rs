//! `rtk config` command - Configuration inspection

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::find_project;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration values
    Show(ShowArgs),

    /// Show paths to configuration files and the program database
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("database", "Program database path, relative to the project root"),
    ("functional", "Default FMEA kind for `rtk fmea` (true = functional)"),
    ("log_level", "Log filter, e.g. warn or rtk=debug (env: RTK_LOG)"),
    ("log_format", "Log format: pretty or json (env: RTK_LOG_FORMAT)"),
    ("default_format", "Default output format (yaml, json, tsv, etc.)"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn load(global: &GlobalOpts) -> Config {
    Config::load_for(find_project(global).ok().as_ref())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = load(global);

    if let Some(key) = &args.key {
        return match get_config_value(&config, key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None if VALID_KEYS.iter().any(|(k, _)| k == key) => {
                Err(miette::miette!("Key '{}' is not set", key))
            }
            None => Err(miette::miette!("Unknown configuration key '{}'", key)),
        };
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&config).into_diagnostic()?);
        }
        _ => {
            println!("{}", style("Effective Configuration").bold().underlined());
            println!();
            for (key, _) in VALID_KEYS {
                print_config_value(key, get_config_value(&config, key).as_deref());
            }

            println!();
            println!("{}", style("Config Sources (in priority order):").dim());
            println!("  1. Environment variables (RTK_DATABASE, RTK_LOG, RTK_LOG_FORMAT)");
            println!("  2. Project config (.rtk/config.yaml)");
            println!("  3. Global config (~/.config/rtk/config.yaml)");
        }
    }

    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => print_path("Global:", &path),
        None => println!("  {} {}", style("Global:").cyan(), style("(unavailable)").dim()),
    }

    match find_project(global) {
        Ok(project) => {
            let config = Config::load_for(Some(&project));
            print_path("Project:", &project.config_path());
            print_path("Database:", &project.database_path(config.database.as_deref()));
        }
        Err(_) => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in an RTK project)").dim()
        ),
    }

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "database" => config.database.as_ref().map(|p| p.display().to_string()),
        "functional" => config.functional.map(|f| f.to_string()),
        "log_level" => config.log_level.clone(),
        "log_format" => config
            .log_format
            .map(|f| format!("{:?}", f).to_lowercase()),
        "default_format" => config.default_format.clone(),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn print_path(label: &str, path: &std::path::Path) {
    let state = if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("  {:<10} {} {}", style(label).cyan(), path.display(), state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogFormat;
    use std::path::PathBuf;

    #[test]
    fn test_get_config_value() {
        let config = Config {
            database: Some(PathBuf::from("data/program.db")),
            log_format: Some(LogFormat::Json),
            functional: Some(true),
            ..Config::default()
        };

        assert_eq!(
            get_config_value(&config, "database").as_deref(),
            Some("data/program.db")
        );
        assert_eq!(get_config_value(&config, "log_format").as_deref(), Some("json"));
        assert_eq!(get_config_value(&config, "functional").as_deref(), Some("true"));
        assert_eq!(get_config_value(&config, "log_level"), None);
    }

    #[test]
    fn test_every_key_is_readable() {
        let config = Config {
            database: Some(PathBuf::from("x.db")),
            log_level: Some("info".to_string()),
            log_format: Some(LogFormat::Pretty),
            default_format: Some("md".to_string()),
            functional: Some(false),
        };
        for (key, _) in VALID_KEYS {
            assert!(get_config_value(&config, key).is_some(), "{key} unreadable");
        }
    }
}
