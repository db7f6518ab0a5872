// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use chrono::NaiveDate;
use std::str::FromStr;

use matchday::catalog::{ChannelEntry, League, find_channel, find_league, group_by_league};
use matchday::schedule::{Channel, Match, ScheduleClient};
use matchday::Config;

pub mod check;
pub mod list;
pub mod play;
pub mod resolve;

pub use check::CheckCommand;
pub use list::ListCommand;
pub use play::PlayCommand;
pub use resolve::ResolveCommand;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    M3u,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "m3u" => Ok(Self::M3u),
            _ => anyhow::bail!("Invalid format: {}. Use 'text', 'json', or 'm3u'", s),
        }
    }
}

/// Everything a scriptable command needs: the HTTP session, settings and
/// the day being looked at.
pub struct CommandContext {
    pub client: ScheduleClient,
    pub config: Config,
    pub date: NaiveDate,
}

impl CommandContext {
    pub fn new(client: ScheduleClient, config: Config, date: NaiveDate) -> Self {
        Self {
            client,
            config,
            date,
        }
    }

    pub async fn matches(&self) -> Result<Vec<Match>> {
        self.client.fetch_matches(self.date).await
    }

    pub async fn leagues(&self) -> Result<Vec<League>> {
        Ok(group_by_league(&self.matches().await?))
    }

    /// One league by name, or every league when `name` is None.
    pub async fn select_leagues(&self, name: Option<&str>) -> Result<Vec<League>> {
        let leagues = self.leagues().await?;
        let Some(name) = name else {
            return Ok(leagues);
        };

        match find_league(&leagues, name) {
            Some(league) => Ok(vec![league.clone()]),
            None => {
                let available: Vec<&str> = leagues.iter().map(|l| l.name.as_str()).collect();
                anyhow::bail!(
                    "League '{}' not found for {}. Available: {}",
                    name,
                    self.date,
                    available.join(", ")
                )
            }
        }
    }

    /// The scheduled entry for a channel id. Ids missing from today's
    /// listing still resolve, they just have no match label.
    pub async fn channel(&self, id: &str) -> ChannelEntry {
        let matches = self.client.matches_or_empty(self.date).await;
        find_channel(&matches, id).unwrap_or_else(|| ChannelEntry {
            channel: Channel {
                ch: id.to_string(),
                ..Channel::default()
            },
            match_label: String::new(),
        })
    }
}
