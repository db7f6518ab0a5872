// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use matchday::catalog::ChannelEntry;
use matchday::probe::{Liveness, check_all};
use serde_json::json;

pub struct CheckCommand {
    pub league: Option<String>,
    pub format: OutputFormat,
}

impl CheckCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        if self.format == OutputFormat::M3u {
            anyhow::bail!("The check command supports 'text' or 'json' output");
        }

        let leagues = context.select_leagues(self.league.as_deref()).await?;
        let tagged: Vec<(String, ChannelEntry)> = leagues
            .iter()
            .flat_map(|l| l.channels.iter().map(|c| (l.name.clone(), c.clone())))
            .collect();

        let entries: Vec<ChannelEntry> = tagged.iter().map(|(_, e)| e.clone()).collect();

        let pb = ProgressBar::new(entries.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let results = check_all(
            &context.client,
            entries,
            context.config.probe.concurrency,
            |entry, _| {
                pb.set_message(entry.display_name().to_string());
                pb.inc(1);
            },
        )
        .await;
        pb.finish_and_clear();

        let live = results
            .iter()
            .filter(|(_, liveness)| *liveness == Liveness::Live)
            .count();

        match self.format {
            OutputFormat::Json => {
                let report: Vec<_> = tagged
                    .iter()
                    .zip(&results)
                    .map(|((league, _), (entry, liveness))| {
                        json!({
                            "id": entry.id(),
                            "name": entry.display_name(),
                            "match": entry.match_label,
                            "league": league,
                            "status": liveness,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            _ => {
                for (entry, liveness) in &results {
                    println!(
                        "{} {:>10} | {} | {} ({})",
                        liveness.marker(),
                        entry.id(),
                        entry.display_name(),
                        entry.match_label,
                        liveness
                    );
                }
                println!(
                    "\n{} live, {} not working",
                    live,
                    results.len() - live
                );
            }
        }

        Ok(())
    }
}
