// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Grouping of the upstream listing into leagues and matches.
//!
//! Upstream order is meaningful (it is the order the aggregator shows), so
//! every grouping here keeps first-seen order rather than sorting.

use crate::schedule::{Channel, Match};
use serde::Serialize;
use std::collections::HashMap;

const UNKNOWN_CHANNEL: &str = "Unknown Channel";
const UNKNOWN_MATCH: &str = "Unknown Match";

impl Match {
    /// `"Home vs Away"`, or just one name when both sides are the same
    /// (the aggregator uses that for single-entity events).
    pub fn label(&self) -> String {
        let home = self.home_en.trim();
        let away = self.away_en.trim();
        if home == away {
            home.to_string()
        } else {
            format!("{} vs {}", home, away)
        }
    }
}

/// A channel together with the label of the match it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelEntry {
    #[serde(flatten)]
    pub channel: Channel,
    pub match_label: String,
}

impl ChannelEntry {
    pub fn id(&self) -> &str {
        &self.channel.ch
    }

    pub fn display_name(&self) -> &str {
        let name = self.channel.server_name_en.trim();
        if name.is_empty() {
            UNKNOWN_CHANNEL
        } else {
            name
        }
    }

    /// Name for the player window; prefers the native-script name.
    pub fn title(&self) -> String {
        let native = self.channel.server_name.trim();
        let name = if native.is_empty() {
            self.display_name()
        } else {
            native
        };
        format!("{} - {}", name, self.match_label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct League {
    pub name: String,
    pub channels: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup<'a> {
    pub label: &'a str,
    pub channels: Vec<&'a ChannelEntry>,
}

impl League {
    pub fn by_match(&self) -> Vec<MatchGroup<'_>> {
        let mut groups: Vec<MatchGroup<'_>> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for entry in &self.channels {
            let label = if entry.match_label.is_empty() {
                UNKNOWN_MATCH
            } else {
                entry.match_label.as_str()
            };

            match index.get(label).copied() {
                Some(i) => groups[i].channels.push(entry),
                None => {
                    index.insert(label, groups.len());
                    groups.push(MatchGroup {
                        label,
                        channels: vec![entry],
                    });
                }
            }
        }

        groups
    }
}

/// Group channels by league. Matches without channels do not create a league.
pub fn group_by_league(matches: &[Match]) -> Vec<League> {
    let mut leagues: Vec<League> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for m in matches {
        if m.channels.is_empty() {
            continue;
        }

        let league = m.league_en.trim().to_string();
        let label = m.label();
        let enriched = m.channels.iter().map(|channel| ChannelEntry {
            channel: channel.clone(),
            match_label: label.clone(),
        });

        match index.get(&league).copied() {
            Some(i) => leagues[i].channels.extend(enriched),
            None => {
                index.insert(league.clone(), leagues.len());
                leagues.push(League {
                    name: league,
                    channels: enriched.collect(),
                });
            }
        }
    }

    leagues
}

/// Channels of the first match in `league`, compared untrimmed.
pub fn channels_for_league(matches: &[Match], league: &str) -> Vec<Channel> {
    matches
        .iter()
        .find(|m| m.league_en == league)
        .map(|m| m.channels.clone())
        .unwrap_or_default()
}

pub fn find_league<'a>(leagues: &'a [League], name: &str) -> Option<&'a League> {
    let wanted = name.trim().to_lowercase();
    leagues.iter().find(|l| l.name.to_lowercase() == wanted)
}

pub fn find_channel(matches: &[Match], id: &str) -> Option<ChannelEntry> {
    matches.iter().find_map(|m| {
        m.channels
            .iter()
            .find(|c| c.ch == id)
            .map(|channel| ChannelEntry {
                channel: channel.clone(),
                match_label: m.label(),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str, name: &str) -> Channel {
        Channel {
            ch: id.to_string(),
            server_name_en: name.to_string(),
            server_name: String::new(),
        }
    }

    fn fixture(league: &str, home: &str, away: &str, channels: Vec<Channel>) -> Match {
        Match {
            league_en: league.to_string(),
            home_en: home.to_string(),
            away_en: away.to_string(),
            channels,
        }
    }

    #[test]
    fn label_collapses_identical_sides() {
        assert_eq!(fixture("", " Formula 1 ", "Formula 1", vec![]).label(), "Formula 1");
        assert_eq!(fixture("", "Inter ", " Milan", vec![]).label(), "Inter vs Milan");
    }

    #[test]
    fn groups_leagues_in_first_seen_order() {
        let matches = vec![
            fixture("Serie A", "Inter", "Milan", vec![channel("1", "One")]),
            fixture("La Liga", "Real", "Barca", vec![channel("2", "Two")]),
            fixture("Serie A ", "Roma", "Lazio", vec![channel("3", "Three")]),
            fixture("Ligue 1", "PSG", "OM", vec![]),
        ];

        let leagues = group_by_league(&matches);
        let names: Vec<_> = leagues.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Serie A", "La Liga"]);

        let serie_a = &leagues[0];
        assert_eq!(serie_a.channels.len(), 2);
        assert_eq!(serie_a.channels[0].match_label, "Inter vs Milan");
        assert_eq!(serie_a.channels[1].match_label, "Roma vs Lazio");
        assert_eq!(serie_a.channels[1].id(), "3");
    }

    #[test]
    fn league_channels_group_by_match() {
        let matches = vec![
            fixture("Cup", "A", "B", vec![channel("1", "One"), channel("2", "Two")]),
            fixture("Cup", "C", "D", vec![channel("3", "")]),
            fixture("Cup", "A", "B", vec![channel("4", "Four")]),
        ];

        let leagues = group_by_league(&matches);
        let groups = leagues[0].by_match();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "A vs B");
        let ids: Vec<_> = groups[0].channels.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
        assert_eq!(groups[1].channels[0].display_name(), "Unknown Channel");
    }

    #[test]
    fn empty_label_groups_as_unknown_match() {
        let matches = vec![fixture("Cup", "", "", vec![channel("9", "Nine")])];
        let leagues = group_by_league(&matches);
        assert_eq!(leagues[0].by_match()[0].label, "Unknown Match");
    }

    #[test]
    fn channels_for_league_uses_first_match_only() {
        let matches = vec![
            fixture("Cup", "A", "B", vec![channel("1", "One")]),
            fixture("Cup", "C", "D", vec![channel("2", "Two")]),
        ];
        let channels = channels_for_league(&matches, "Cup");
        assert_eq!(channels, vec![channel("1", "One")]);
        assert!(channels_for_league(&matches, "Other").is_empty());
    }

    #[test]
    fn finds_channel_with_its_match_label() {
        let matches = vec![
            fixture("Cup", "A", "B", vec![channel("1", "One")]),
            fixture("Cup", "C", "C", vec![channel("2", "Two")]),
        ];
        let entry = find_channel(&matches, "2").unwrap();
        assert_eq!(entry.match_label, "C");
        assert_eq!(entry.title(), "Two - C");
        assert!(find_channel(&matches, "404").is_none());
    }

    #[test]
    fn league_lookup_ignores_case() {
        let leagues = group_by_league(&[fixture("Premier League", "A", "B", vec![channel("1", "x")])]);
        assert!(find_league(&leagues, "premier league").is_some());
        assert!(find_league(&leagues, "bundesliga").is_none());
    }
}
