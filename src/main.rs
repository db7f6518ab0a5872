// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::fs::File;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use matchday::schedule::today;
use matchday::{Config, MenuSystem, Player, ScheduleClient};

mod cli;
use cli::{CheckCommand, CommandContext, ListCommand, OutputFormat, PlayCommand, ResolveCommand};

fn cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD ({})", e))
}

#[derive(Parser)]
#[command(name = "matchday")]
#[command(about = "Browse today's televised matches and play their live streams")]
#[command(version)]
#[command(styles = cargo_style())]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging to file (matchday_debug.log)
    #[arg(long, global = true)]
    debug_log: bool,

    /// Day to show instead of today (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch interactive TUI (default if no command given)
    Tui,

    /// Launch the prompt-based menu
    Menu,

    /// List leagues, or the channels of one league
    List {
        /// League name (case-insensitive)
        #[arg(short, long)]
        league: Option<String>,
        /// Output format (text, json, m3u)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Resolve a channel id to its stream URL
    Resolve {
        /// Channel id as listed by `list --league`
        channel_id: String,
    },

    /// Check which channels are currently streaming
    Check {
        /// League name (case-insensitive)
        #[arg(short, long)]
        league: Option<String>,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Resolve a channel and play it
    Play {
        channel_id: String,
        /// Start the player detached and return immediately
        #[arg(short, long)]
        detach: bool,
    },

    /// Execute raw API calls
    #[command(subcommand)]
    Api(ApiSubcommand),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigSubcommand),
}

#[derive(Subcommand)]
enum ApiSubcommand {
    /// Get the day's schedule as returned by the server
    Schedule,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

async fn run_api_command(client: &ScheduleClient, date: NaiveDate, cmd: ApiSubcommand) -> Result<()> {
    // Return raw JSON responses without any interpretation or deserialization
    let result = match cmd {
        ApiSubcommand::Schedule => client.fetch_raw(date).await?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_config_command(config: &Config, cmd: ConfigSubcommand) -> Result<()> {
    let config_path = Config::default_path();

    match cmd {
        ConfigSubcommand::Path => println!("{}", config_path.display()),
        ConfigSubcommand::Show => {
            let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", text);
        }
        ConfigSubcommand::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(&config_path)?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.debug_log {
        let file = File::create("matchday_debug.log")?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                EnvFilter::from_default_env()
                    .add_directive("matchday=debug".parse()?)
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into())
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("hyper_util=error".parse()?),
            )
            .init();
    }

    let config = Config::load_or_default(Config::default_path());
    let date = cli.date.unwrap_or_else(today);

    let mut client = ScheduleClient::new(&config.source, &config.probe)?;

    match cli.command {
        Some(Commands::Tui) | None => {
            let player = Player::new(&config.player);
            matchday::run_tui(&config, client, player, date).await?;
        }

        Some(Commands::Menu) => {
            let player = Player::new(&config.player);
            let mut menu = MenuSystem::new(
                client,
                player,
                date,
                config.ui.page_size,
                config.probe.concurrency,
            );
            menu.run().await?;
        }

        Some(Commands::List { league, format }) => {
            client.enable_progress();
            let cmd = ListCommand {
                league,
                format: format.parse::<OutputFormat>()?,
            };
            cmd.execute(CommandContext::new(client, config, date)).await?;
        }

        Some(Commands::Resolve { channel_id }) => {
            let cmd = ResolveCommand { channel_id };
            cmd.execute(CommandContext::new(client, config, date)).await?;
        }

        Some(Commands::Check { league, format }) => {
            client.enable_progress();
            let cmd = CheckCommand {
                league,
                format: format.parse::<OutputFormat>()?,
            };
            cmd.execute(CommandContext::new(client, config, date)).await?;
        }

        Some(Commands::Play { channel_id, detach }) => {
            let player = Player::new(&config.player);
            let cmd = PlayCommand { channel_id, detach };
            cmd.execute(CommandContext::new(client, config, date), player)
                .await?;
        }

        Some(Commands::Api(api_cmd)) => {
            client.enable_progress();
            run_api_command(&client, date, api_cmd).await?;
        }

        Some(Commands::Config(config_cmd)) => {
            run_config_command(&config, config_cmd)?;
        }
    }

    Ok(())
}
