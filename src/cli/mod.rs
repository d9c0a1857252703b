//! Command-line interface for dreadnot.
//!
//! Operator tooling around the orchestrator: startup checks, stack details
//! and status, and warning management. Serving HTTP is left to the
//! transport layer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::core::Orchestrator;
use crate::domain::User;
use crate::stack::ConfiguredStackFactory;

/// dreadnot - Deployment orchestrator
#[derive(Parser, Debug)]
#[command(name = "dreadnot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, env = "DREADNOT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run startup and report the initialized stacks
    Check,

    /// Show details of every stack
    Details,

    /// Show the running status of every stack
    Status,

    /// Show or change the warning banner
    Warning {
        #[command(subcommand)]
        command: WarningCommands,
    },

    /// Show resolved configuration
    Config,
}

#[derive(Subcommand, Debug)]
pub enum WarningCommands {
    /// Print the current warning
    Show,

    /// Set the warning
    Set {
        /// Warning text
        text: String,

        /// User recorded as setting the warning
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Clear the warning
    Clear {
        /// User recorded as clearing the warning
        #[arg(short, long)]
        user: Option<String>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(&self.config)?;

        match self.command {
            Commands::Config => show_config(&self.config, &config),
            Commands::Check => check(config).await,
            Commands::Details => {
                let orchestrator = start(config).await?;
                print_json(&orchestrator.details().await?)
            }
            Commands::Status => {
                let orchestrator = start(config).await?;
                print_json(&orchestrator.running_status().await?)
            }
            Commands::Warning { command } => execute_warning(config, command).await,
        }
    }
}

/// Build the orchestrator and run startup
async fn start(config: Config) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::new(config, Arc::new(ConfiguredStackFactory));
    orchestrator.init().await.context("Startup failed")?;
    Ok(orchestrator)
}

async fn check(config: Config) -> Result<()> {
    let orchestrator = start(config).await?;

    println!("{} ({})", orchestrator.name(), orchestrator.summary().name);
    for name in orchestrator.config().stack_names() {
        let stack = orchestrator.get_stack(&name)?;
        println!("  {} ready", stack.name());
    }

    let warning = orchestrator.warning();
    if !warning.is_empty() {
        println!("Warning: {}", warning);
    }

    Ok(())
}

async fn execute_warning(config: Config, command: WarningCommands) -> Result<()> {
    let orchestrator = start(config).await?;

    match command {
        WarningCommands::Show => {
            let warning = orchestrator.warning();
            if warning.is_empty() {
                println!("No warning set");
            } else {
                println!("{}", warning);
            }
        }
        WarningCommands::Set { text, user } => {
            orchestrator.set_warning(&actor(user), &text).await?;
            println!("Warning set");
        }
        WarningCommands::Clear { user } => {
            orchestrator.set_warning(&actor(user), "").await?;
            println!("Warning cleared");
        }
    }

    Ok(())
}

fn actor(name: Option<String>) -> User {
    name.map(User::authorized)
        .unwrap_or_else(User::login_not_required)
}

fn show_config(path: &Path, config: &Config) -> Result<()> {
    println!("Config file: {}", path.display());
    println!("Name:        {}", config.name);
    println!("Environment: {}", config.env);
    println!("Data root:   {}", config.data_root.display());
    println!("Warning:     {}", config.warning_path().display());
    println!("Sessions:    {}", config.sessions_dir().display());
    println!("Login:       {}", if config.login_required { "required" } else { "not required" });
    println!("Stacks:");
    for (name, stack) in &config.stacks {
        println!("  {} [{}]", name, stack.regions.join(", "));
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
