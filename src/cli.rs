use crate::{
    config,
    session::{LogLevel, Session},
};
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

struct GlobalOptions {
    format: OutputFormat,
    plugin_dir: Option<PathBuf>,
}

enum CliCommand {
    Status,
    Masters,
    Plugins,
    Groups,
    Activate(String),
    Deactivate(String),
    Enable(String),
    Disable(String),
    ProfilesList,
    ProfileCreate(String),
    ProfileDelete { name: String, force: bool },
    ProfileSwitch(String),
    Rescan,
    Paths,
    Help,
    Version,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, options) = parse_args(&args)?;

    match command {
        CliCommand::Help => {
            print_help();
            return Ok(());
        }
        CliCommand::Version => {
            println!("espwright {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let mut session = Session::initialize(options.plugin_dir.clone())?;
    for entry in session.logs() {
        if entry.level == LogLevel::Warn {
            eprintln!("warning: {}", entry.message);
        }
    }

    match command {
        CliCommand::Status => print_status(&mut session, options.format)?,
        CliCommand::Masters => print_masters(&session, options.format)?,
        CliCommand::Plugins => print_plugins(&session, options.format)?,
        CliCommand::Groups => print_groups(&session, options.format)?,
        CliCommand::Activate(name) => {
            if !session.activate_master(&name) {
                bail!("unknown master \"{name}\"");
            }
            session.flush()?;
            println!("activated {name}");
        }
        CliCommand::Deactivate(name) => {
            if !session.deactivate_master(&name) {
                bail!("unknown master \"{name}\"");
            }
            session.flush()?;
            println!("deactivated {name}");
        }
        CliCommand::Enable(plugin) => {
            if !session.set_enabled(&plugin, true) {
                bail!("\"{plugin}\" is not eligible; activate its masters first");
            }
            session.flush()?;
            println!("enabled {plugin}");
        }
        CliCommand::Disable(plugin) => {
            if !session.set_enabled(&plugin, false) {
                bail!("\"{plugin}\" is not eligible; activate its masters first");
            }
            session.flush()?;
            println!("disabled {plugin}");
        }
        CliCommand::ProfilesList => print_profiles(&mut session, options.format)?,
        CliCommand::ProfileCreate(name) => {
            session.create_profile(&name)?;
            println!("created profile {name}");
        }
        CliCommand::ProfileDelete { name, force } => {
            if session.config.confirm_profile_delete && !force {
                bail!("pass --force to delete profile \"{name}\"");
            }
            session.delete_profile(&name)?;
            println!("deleted profile {name}");
        }
        CliCommand::ProfileSwitch(name) => {
            session.switch_profile(&name)?;
            println!("switched to profile {}", session.current_profile());
        }
        CliCommand::Rescan => {
            session.rescan()?;
            println!(
                "rescanned {}: {} plugin(s)",
                session.config.plugin_dir.display(),
                session.plugin_count()
            );
        }
        CliCommand::Paths => print_paths(&session)?,
        CliCommand::Help | CliCommand::Version => unreachable!(),
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<(CliCommand, GlobalOptions)> {
    let mut options = GlobalOptions {
        format: OutputFormat::Text,
        plugin_dir: None,
    };
    let mut positional: Vec<String> = Vec::new();
    let mut force = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--format" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--format requires a value"))?;
                options.format = OutputFormat::parse(value)
                    .ok_or_else(|| anyhow::anyhow!("unknown format \"{value}\""))?;
            }
            "--plugin-dir" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--plugin-dir requires a path"))?;
                options.plugin_dir = Some(PathBuf::from(value));
            }
            "--force" => force = true,
            "--help" | "-h" => return Ok((CliCommand::Help, options)),
            "--version" | "-V" => return Ok((CliCommand::Version, options)),
            other if other.starts_with('-') => bail!("unknown option \"{other}\""),
            other => positional.push(other.to_string()),
        }
    }

    let command = match positional.first().map(String::as_str) {
        None => CliCommand::Status,
        Some("masters") => CliCommand::Masters,
        Some("plugins") => CliCommand::Plugins,
        Some("groups") => CliCommand::Groups,
        Some("activate") => CliCommand::Activate(required(&positional, 1, "activate <master>")?),
        Some("deactivate") => {
            CliCommand::Deactivate(required(&positional, 1, "deactivate <master>")?)
        }
        Some("enable") => CliCommand::Enable(required(&positional, 1, "enable <plugin>")?),
        Some("disable") => CliCommand::Disable(required(&positional, 1, "disable <plugin>")?),
        Some("profiles") => match positional.get(1).map(String::as_str) {
            None | Some("list") => CliCommand::ProfilesList,
            Some("create") => {
                CliCommand::ProfileCreate(required(&positional, 2, "profiles create <name>")?)
            }
            Some("delete") => CliCommand::ProfileDelete {
                name: required(&positional, 2, "profiles delete <name>")?,
                force,
            },
            Some("switch") => {
                CliCommand::ProfileSwitch(required(&positional, 2, "profiles switch <name>")?)
            }
            Some(other) => bail!("unknown profiles subcommand \"{other}\""),
        },
        Some("rescan") => CliCommand::Rescan,
        Some("paths") => CliCommand::Paths,
        Some("help") => CliCommand::Help,
        Some("version") => CliCommand::Version,
        Some(other) => bail!("unknown command \"{other}\""),
    };

    Ok((command, options))
}

fn required(positional: &[String], index: usize, usage: &str) -> Result<String> {
    positional
        .get(index)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("usage: espwright {usage}"))
}

#[derive(Serialize)]
struct MasterRow {
    name: String,
    active: bool,
}

#[derive(Serialize)]
struct PluginRow {
    name: String,
    enabled: bool,
}

#[derive(Serialize)]
struct StatusReport {
    profile: String,
    profiles: Vec<String>,
    masters: usize,
    active_masters: usize,
    eligible_plugins: usize,
    enabled_plugins: usize,
}

fn print_status(session: &mut Session, format: OutputFormat) -> Result<()> {
    let report = StatusReport {
        profile: session.current_profile().to_string(),
        profiles: session.list_profiles(),
        masters: session.all_masters().len(),
        active_masters: session
            .all_masters()
            .iter()
            .filter(|master| session.is_master_active(master))
            .count(),
        eligible_plugins: session.eligible_plugins().len(),
        enabled_plugins: session.enabled_plugins().len(),
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("profile: {}", report.profile);
            println!("profiles: {}", report.profiles.join(", "));
            println!(
                "masters: {} ({} active)",
                report.masters, report.active_masters
            );
            println!(
                "plugins: {} eligible, {} enabled",
                report.eligible_plugins, report.enabled_plugins
            );
        }
    }
    Ok(())
}

fn print_masters(session: &Session, format: OutputFormat) -> Result<()> {
    let rows: Vec<MasterRow> = session
        .all_masters()
        .iter()
        .map(|name| MasterRow {
            name: name.clone(),
            active: session.is_master_active(name),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            for row in rows {
                let marker = if row.active { "[x]" } else { "[ ]" };
                println!("{marker} {}", row.name);
            }
        }
    }
    Ok(())
}

fn print_plugins(session: &Session, format: OutputFormat) -> Result<()> {
    let rows: Vec<PluginRow> = session
        .eligible_plugins()
        .iter()
        .map(|name| PluginRow {
            name: name.clone(),
            enabled: session.is_plugin_enabled(name),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            for row in rows {
                let marker = if row.enabled { "[x]" } else { "[ ]" };
                println!("{marker} {}", row.name);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct GroupRow {
    masters: Vec<String>,
    satisfied: bool,
    plugins: Vec<String>,
}

fn print_groups(session: &Session, format: OutputFormat) -> Result<()> {
    let rows: Vec<GroupRow> = session
        .dependency_groups()
        .iter()
        .map(|group| GroupRow {
            masters: group.masters.clone(),
            satisfied: session.group_satisfied(group),
            plugins: group.plugins.clone(),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            for row in rows {
                let marker = if row.satisfied { "[x]" } else { "[ ]" };
                let requires = if row.masters.is_empty() {
                    "(no masters)".to_string()
                } else {
                    row.masters.join(", ")
                };
                println!("{marker} {requires}");
                for plugin in row.plugins {
                    println!("      {plugin}");
                }
            }
        }
    }
    Ok(())
}

fn print_profiles(session: &mut Session, format: OutputFormat) -> Result<()> {
    let current = session.current_profile().to_string();
    let profiles = session.list_profiles();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&profiles)?),
        OutputFormat::Text => {
            for profile in profiles {
                let marker = if profile == current { "*" } else { " " };
                println!("{marker} {profile}");
            }
        }
    }
    Ok(())
}

fn print_paths(session: &Session) -> Result<()> {
    println!("config:  {}", config::config_path()?.display());
    println!("store:   {}", config::store_path()?.display());
    println!("plugins: {}", session.config.plugin_dir.display());
    Ok(())
}

fn print_help() {
    println!("espwright: plugin selection and load-order profiles");
    println!();
    println!("usage: espwright [command] [options]");
    println!();
    println!("commands:");
    println!("  (none)                     status summary");
    println!("  masters                    list masters with active markers");
    println!("  plugins                    list eligible plugins with enabled markers");
    println!("  groups                     show dependency groups and their plugins");
    println!("  activate <master>          add a master to the active set");
    println!("  deactivate <master>        remove a master from the active set");
    println!("  enable <plugin>            enable an eligible plugin");
    println!("  disable <plugin>           disable an eligible plugin");
    println!("  profiles [list]            list profiles (* marks current)");
    println!("  profiles create <name>     create an empty profile");
    println!("  profiles delete <name>     delete a profile (--force)");
    println!("  profiles switch <name>     switch profiles, saving the current one");
    println!("  rescan                     rebuild the catalog from the plugin directory");
    println!("  paths                      show config, store, and plugin paths");
    println!();
    println!("options:");
    println!("  --format <text|json>       output format for list commands");
    println!("  --plugin-dir <dir>         override the plugin directory for this run");
}
