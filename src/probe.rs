// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::catalog::ChannelEntry;
use crate::schedule::{Channel, ScheduleClient};
use futures_util::StreamExt;
use futures_util::stream;
use ratatui::style::Color;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Pending,
    Live,
    Dead,
}

impl Liveness {
    pub fn is_settled(self) -> bool {
        self != Liveness::Pending
    }

    pub fn color(self) -> Color {
        match self {
            Liveness::Pending => Color::Yellow,
            Liveness::Live => Color::Green,
            Liveness::Dead => Color::Red,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Liveness::Pending => "…",
            Liveness::Live => "●",
            Liveness::Dead => "✗",
        }
    }
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Liveness::Pending => write!(f, "checking"),
            Liveness::Live => write!(f, "live"),
            Liveness::Dead => write!(f, "not working"),
        }
    }
}

impl ScheduleClient {
    /// HEAD the URL; only a plain 200 counts as working.
    pub async fn is_stream_working(&self, url: &str) -> bool {
        match self
            .probe_client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!("Probe {} -> {}", url, response.status());
                response.status() == reqwest::StatusCode::OK
            }
            Err(e) => {
                debug!("Probe {} failed: {}", url, e);
                false
            }
        }
    }

    pub async fn check_channel(&self, channel: &Channel) -> Liveness {
        let stream = self.resolve_or_empty(channel).await;
        match stream.primary() {
            Some(url) if self.is_stream_working(url).await => Liveness::Live,
            _ => Liveness::Dead,
        }
    }
}

/// Probe every entry with at most `concurrency` checks in flight.
/// Results come back in input order.
pub async fn check_all(
    client: &ScheduleClient,
    entries: Vec<ChannelEntry>,
    concurrency: usize,
    on_done: impl Fn(&ChannelEntry, Liveness),
) -> Vec<(ChannelEntry, Liveness)> {
    let mut results: Vec<(usize, ChannelEntry, Liveness)> = stream::iter(entries.into_iter().enumerate())
        .map(|(i, entry)| async move {
            let liveness = client.check_channel(&entry.channel).await;
            (i, entry, liveness)
        })
        .buffer_unordered(concurrency.max(1))
        .inspect(|(_, entry, liveness)| on_done(entry, *liveness))
        .collect()
        .await;

    results.sort_by_key(|(i, _, _)| *i);
    results
        .into_iter()
        .map(|(_, entry, liveness)| (entry, liveness))
        .collect()
}

#[derive(Debug)]
pub struct ProbeResult {
    pub generation: u64,
    pub channel_id: String,
    pub liveness: Liveness,
}

/// Background probes for whatever channel list the TUI is showing.
///
/// Each `watch` call starts a new generation: in-flight tasks of the previous
/// one are aborted and any result they already queued is dropped by
/// `drain`.
pub struct ProbeBoard {
    client: ScheduleClient,
    generation: u64,
    tasks: Vec<JoinHandle<()>>,
    statuses: HashMap<String, Liveness>,
    sender: mpsc::UnboundedSender<ProbeResult>,
    receiver: mpsc::UnboundedReceiver<ProbeResult>,
}

impl ProbeBoard {
    pub fn new(client: ScheduleClient) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            client,
            generation: 0,
            tasks: Vec::new(),
            statuses: HashMap::new(),
            sender,
            receiver,
        }
    }

    pub fn watch(&mut self, channels: &[Channel]) {
        self.cancel();

        for channel in channels {
            if self.statuses.contains_key(&channel.ch) {
                continue;
            }
            self.statuses.insert(channel.ch.clone(), Liveness::Pending);

            let client = self.client.clone();
            let sender = self.sender.clone();
            let channel = channel.clone();
            let generation = self.generation;

            self.tasks.push(tokio::spawn(async move {
                let liveness = client.check_channel(&channel).await;
                let _ = sender.send(ProbeResult {
                    generation,
                    channel_id: channel.ch,
                    liveness,
                });
            }));
        }

        debug!(
            "Probe generation {} started {} checks",
            self.generation,
            self.tasks.len()
        );
    }

    /// Stop all checks. Results already queued belong to the retired
    /// generation and are dropped by the next `drain`.
    pub fn cancel(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.statuses.clear();
        self.generation += 1;
    }

    /// Apply finished probes; returns true if anything changed.
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        while let Ok(result) = self.receiver.try_recv() {
            if result.generation != self.generation {
                continue;
            }
            self.statuses.insert(result.channel_id, result.liveness);
            changed = true;
        }
        if changed {
            self.tasks.retain(|task| !task.is_finished());
        }
        changed
    }

    pub fn status(&self, channel_id: &str) -> Liveness {
        self.statuses
            .get(channel_id)
            .copied()
            .unwrap_or(Liveness::Pending)
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        self.statuses
            .values()
            .fold((0, 0, 0), |(pending, live, dead), status| match status {
                Liveness::Pending => (pending + 1, live, dead),
                Liveness::Live => (pending, live + 1, dead),
                Liveness::Dead => (pending, live, dead + 1),
            })
    }
}

impl Drop for ProbeBoard {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProbeConfig, SourceConfig};

    fn board() -> ProbeBoard {
        let source = SourceConfig {
            schedule_url: "http://127.0.0.1:9/{date}".to_string(),
            share_url: "http://127.0.0.1:9/share".to_string(),
            ..SourceConfig::default()
        };
        ProbeBoard::new(ScheduleClient::new(&source, &ProbeConfig::default()).unwrap())
    }

    fn result(generation: u64, channel_id: &str, liveness: Liveness) -> ProbeResult {
        ProbeResult {
            generation,
            channel_id: channel_id.to_string(),
            liveness,
        }
    }

    #[tokio::test]
    async fn results_queued_before_cancel_are_dropped() {
        let mut board = board();
        board.watch(&[]);
        board
            .sender
            .send(result(board.generation, "1", Liveness::Live))
            .unwrap();

        board.cancel();

        assert!(!board.drain());
        assert_eq!(board.counts(), (0, 0, 0));
        assert_eq!(board.status("1"), Liveness::Pending);
    }

    #[tokio::test]
    async fn older_generations_are_ignored() {
        let mut board = board();
        board.watch(&[]);
        let old = board.generation;
        board.watch(&[]);
        assert!(board.generation > old);

        board.sender.send(result(old, "7", Liveness::Live)).unwrap();
        assert!(!board.drain());
        assert_eq!(board.counts(), (0, 0, 0));

        board
            .sender
            .send(result(board.generation, "7", Liveness::Dead))
            .unwrap();
        assert!(board.drain());
        assert_eq!(board.status("7"), Liveness::Dead);
    }

    #[test]
    fn only_pending_is_unsettled() {
        assert!(!Liveness::Pending.is_settled());
        assert!(Liveness::Live.is_settled());
        assert!(Liveness::Dead.is_settled());
        assert_eq!(Liveness::Dead.to_string(), "not working");
        assert_eq!(Liveness::Live.color(), Color::Green);
        assert_eq!(Liveness::Dead.color(), Color::Red);
    }
}
