// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::catalog::{ChannelEntry, League, group_by_league};
use crate::player::Player;
use crate::probe::{Liveness, check_all};
use crate::schedule::ScheduleClient;
use anyhow::Result;
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Select;
use std::fmt;
use tracing::{debug, info};

enum LeagueChoice {
    League(League),
    Refresh,
}

impl fmt::Display for LeagueChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeagueChoice::League(league) => {
                write!(f, "{} ({} channels)", league.name, league.channels.len())
            }
            LeagueChoice::Refresh => write!(f, "↻ Refresh"),
        }
    }
}

enum ChannelChoice {
    Channel(ChannelEntry, Liveness),
    Recheck,
}

impl fmt::Display for ChannelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelChoice::Channel(entry, liveness) => write!(
                f,
                "{} {} | {} [{}]",
                liveness.marker(),
                entry.display_name(),
                entry.match_label,
                liveness
            ),
            ChannelChoice::Recheck => write!(f, "↻ Check again"),
        }
    }
}

fn pause() {
    println!("Press Enter to continue...");
    let _ = std::io::stdin().read_line(&mut String::new());
}

pub struct MenuSystem {
    client: ScheduleClient,
    player: Player,
    date: NaiveDate,
    page_size: usize,
    concurrency: usize,
}

impl MenuSystem {
    pub fn new(
        client: ScheduleClient,
        player: Player,
        date: NaiveDate,
        page_size: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            player,
            date,
            page_size,
            concurrency,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("Matches for {}", self.date.format("%A %d %B %Y"));

        if !self.player.is_available() {
            println!("Warning: mpv not found. Channels cannot be played.");
        }

        let mut last_selected_index = 0;

        loop {
            let matches = self.client.matches_or_empty(self.date).await;
            let leagues = group_by_league(&matches);
            debug!("Menu loaded {} leagues", leagues.len());

            if leagues.is_empty() {
                println!("No matches with channels for {}.", self.date);
            }

            let mut options: Vec<LeagueChoice> =
                leagues.into_iter().map(LeagueChoice::League).collect();
            options.push(LeagueChoice::Refresh);
            let option_count = options.len();

            let selection = Select::new("Select a league:", options)
                .with_page_size(self.page_size)
                .with_starting_cursor(last_selected_index.min(option_count - 1))
                .with_help_message("↑↓ to move, enter to select, esc to quit")
                .prompt_skippable()?;

            match selection {
                Some(LeagueChoice::League(league)) => {
                    last_selected_index = 0;
                    if let Err(e) = self.browse_league(&league).await {
                        println!("❌ Error: {}", e);
                        pause();
                    }
                }
                Some(LeagueChoice::Refresh) => {
                    last_selected_index = option_count - 1;
                    info!("Refreshing schedule");
                }
                None => {
                    println!("Goodbye!");
                    return Ok(());
                }
            }
        }
    }

    async fn check_league(&self, league: &League) -> Vec<(ChannelEntry, Liveness)> {
        let pb = ProgressBar::new(league.channels.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Checking channels [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let results = check_all(
            &self.client,
            league.channels.clone(),
            self.concurrency,
            |_, _| pb.inc(1),
        )
        .await;

        pb.finish_and_clear();
        results
    }

    async fn browse_league(&self, league: &League) -> Result<()> {
        let mut results = self.check_league(league).await;
        let mut last_selected_index = 0;

        loop {
            let mut options: Vec<ChannelChoice> = results
                .iter()
                .map(|(entry, liveness)| ChannelChoice::Channel(entry.clone(), *liveness))
                .collect();
            options.push(ChannelChoice::Recheck);
            let option_count = options.len();

            let selection = Select::new(&format!("{} - select a channel:", league.name), options)
                .with_page_size(self.page_size)
                .with_starting_cursor(last_selected_index.min(option_count - 1))
                .with_help_message("esc to go back")
                .prompt_skippable()?;

            match selection {
                Some(ChannelChoice::Channel(entry, liveness)) => {
                    last_selected_index = results
                        .iter()
                        .position(|(e, _)| e.id() == entry.id())
                        .unwrap_or(0);
                    if liveness == Liveness::Dead {
                        println!("⚠️  {} did not respond to the check", entry.display_name());
                    }
                    if let Err(e) = self.play_entry(&entry).await {
                        println!("Playback error: {}", e);
                    }
                }
                Some(ChannelChoice::Recheck) => {
                    last_selected_index = option_count - 1;
                    results = self.check_league(league).await;
                }
                None => return Ok(()),
            }
        }
    }

    async fn play_entry(&self, entry: &ChannelEntry) -> Result<()> {
        let stream = self.client.resolve_or_empty(&entry.channel).await;
        let title = entry.title();

        println!("Playing: {}", title);
        if self.player.tracks_playback() {
            self.player.play_blocking(&stream, &title).await
        } else {
            self.player.play(&stream, &title).await
        }
    }
}
