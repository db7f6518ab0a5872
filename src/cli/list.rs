// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat};
use anyhow::Result;
use matchday::catalog::{ChannelEntry, League};
use matchday::stream::Stream;
use tracing::debug;

pub struct ListCommand {
    pub league: Option<String>,
    pub format: OutputFormat,
}

impl ListCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let leagues = context.select_leagues(self.league.as_deref()).await?;

        match self.format {
            OutputFormat::Json => {
                let value = if self.league.is_some() {
                    let channels: Vec<&ChannelEntry> =
                        leagues.iter().flat_map(|l| &l.channels).collect();
                    serde_json::to_value(channels)?
                } else {
                    serde_json::to_value(&leagues)?
                };
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                if leagues.is_empty() {
                    println!("No matches with channels for {}", context.date);
                } else if self.league.is_some() {
                    for league in &leagues {
                        Self::print_league_channels(league);
                    }
                } else {
                    for league in &leagues {
                        println!("{:4} | {}", league.channels.len(), league.name);
                    }
                }
            }
            OutputFormat::M3u => {
                println!("#EXTM3U");
                for league in &leagues {
                    for entry in &league.channels {
                        let stream = context.client.resolve_or_empty(&entry.channel).await;
                        if stream.is_empty() {
                            eprintln!("Skipping {}: no stream available", entry.display_name());
                            continue;
                        }
                        debug!("Resolved {} for playlist", entry.id());
                        print!("{}", m3u_entry(&league.name, entry, &stream));
                    }
                }
            }
        }

        Ok(())
    }

    fn print_league_channels(league: &League) {
        println!("{}:", league.name);
        for group in league.by_match() {
            println!("  {}", group.label);
            for entry in group.channels {
                println!("    {:>10} | {}", entry.id(), entry.display_name());
            }
        }
    }
}

fn m3u_entry(league: &str, entry: &ChannelEntry, stream: &Stream) -> String {
    let mut out = String::new();
    for url in &stream.urls {
        out.push_str(&format!(
            "#EXTINF:-1 tvg-id=\"{}\" tvg-name=\"{}\" group-title=\"{}\",{}\n",
            entry.id(),
            entry.display_name(),
            league,
            entry.title()
        ));
        out.push_str(&format!("#EXTVLCOPT:http-referrer={}\n", stream.referer));
        out.push_str(url);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchday::schedule::Channel;

    #[test]
    fn m3u_entry_carries_referer() {
        let entry = ChannelEntry {
            channel: Channel {
                ch: "55".to_string(),
                server_name_en: "beIN 1".to_string(),
                server_name: String::new(),
            },
            match_label: "A vs B".to_string(),
        };
        let stream = Stream {
            urls: vec!["https://cdn.example.net/55.m3u8".to_string()],
            referer: "https://koora.vip/".to_string(),
        };

        let out = m3u_entry("Premier League", &entry, &stream);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "#EXTINF:-1 tvg-id=\"55\" tvg-name=\"beIN 1\" group-title=\"Premier League\",beIN 1 - A vs B"
        );
        assert_eq!(lines[1], "#EXTVLCOPT:http-referrer=https://koora.vip/");
        assert_eq!(lines[2], "https://cdn.example.net/55.m3u8");
    }
}
