// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::catalog::{self, ChannelEntry, League};
use crate::player::Player;
use crate::probe::{Liveness, ProbeBoard};
use crate::schedule::{Match, ScheduleClient};
use chrono::{DateTime, Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum AppState {
    Loading(String),
    LeagueSelection,
    ChannelSelection(League),
    Error(String),
}

#[derive(Debug, Clone)]
pub enum Row {
    League { name: String, channel_count: usize },
    MatchHeader(String),
    Channel(ChannelEntry),
}

impl Row {
    pub fn is_selectable(&self) -> bool {
        !matches!(self, Row::MatchHeader(_))
    }

    /// Stable identity used to keep the cursor on the same row across refreshes
    fn key(&self) -> &str {
        match self {
            Row::League { name, .. } => name,
            Row::MatchHeader(label) => label,
            Row::Channel(entry) => entry.id(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
}

#[derive(Debug, Clone, Default)]
struct NavigationState {
    league: Option<String>,
    scroll_offset: usize,
}

pub struct App {
    pub state: AppState,
    pub date: NaiveDate,
    pub rows: Vec<Row>,
    /// Indices into `rows` that survive the current filter
    pub visible: Vec<usize>,
    /// Position in `visible`
    pub selected: usize,
    pub scroll_offset: usize,
    pub status_message: Option<String>,
    pub logs: Vec<(DateTime<Local>, String)>,
    pub show_help: bool,
    pub search_active: bool,
    pub search_query: String,
    pub visible_height: usize,
    pub probes: ProbeBoard,
    pub playing: Option<String>,
    client: ScheduleClient,
    player: Player,
    refresh_interval: Duration,
    leagues: Vec<League>,
    last_refresh: Option<Instant>,
    refresh_task: Option<JoinHandle<Vec<Match>>>,
    announce_refresh: bool,
    error_return: Option<Box<AppState>>,
    league_nav: NavigationState,
}

impl App {
    pub fn new(
        client: ScheduleClient,
        player: Player,
        date: NaiveDate,
        refresh_interval: Duration,
    ) -> Self {
        let mut app = Self {
            state: AppState::Loading(format!("Fetching matches for {}...", date)),
            date,
            rows: Vec::new(),
            visible: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            status_message: None,
            logs: Vec::new(),
            show_help: false,
            search_active: false,
            search_query: String::new(),
            visible_height: 20,
            probes: ProbeBoard::new(client.clone()),
            playing: None,
            client,
            player,
            refresh_interval,
            leagues: Vec::new(),
            last_refresh: None,
            refresh_task: None,
            announce_refresh: true,
            error_return: None,
            league_nav: NavigationState::default(),
        };

        if !app.player.is_available() {
            app.add_log("⚠️ mpv not found; playback is unavailable".to_string());
        }
        app.start_refresh();
        app
    }

    pub fn update_visible_height(&mut self, height: usize) {
        self.visible_height = height.max(1);
        self.ensure_selected_visible();
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.visible
            .get(self.selected)
            .and_then(|&index| self.rows.get(index))
    }

    fn start_refresh(&mut self) {
        if self.refresh_task.is_some() {
            return;
        }

        let client = self.client.clone();
        let date = self.date;
        self.refresh_task = Some(tokio::spawn(async move {
            client.matches_or_empty(date).await
        }));
    }

    /// Periodic work; returns true if the screen needs redrawing.
    pub async fn async_tick(&mut self) -> bool {
        let mut redraw = false;

        if self
            .refresh_task
            .as_ref()
            .is_some_and(|task| task.is_finished())
            && let Some(task) = self.refresh_task.take()
        {
            match task.await {
                Ok(matches) => self.apply_matches(matches),
                Err(e) => warn!("Schedule refresh task failed: {}", e),
            }
            redraw = true;
        }

        // Only the league list auto-refreshes; a channel list keeps its probes
        if matches!(self.state, AppState::LeagueSelection)
            && self
                .last_refresh
                .is_some_and(|at| at.elapsed() >= self.refresh_interval)
        {
            self.start_refresh();
        }

        if self.probes.drain() {
            redraw = true;
        }

        if self.playing.is_some() {
            let (is_running, exit_message) = self.player.check_player_status().await;
            if !is_running {
                if let Some(title) = self.playing.take() {
                    self.add_log(format!("Stopped: {}", title));
                }
                if let Some(message) = exit_message {
                    self.add_log(format!("⚠️ {}", message));
                }
                redraw = true;
            }
        }

        redraw
    }

    fn apply_matches(&mut self, matches: Vec<Match>) {
        self.last_refresh = Some(Instant::now());
        self.leagues = catalog::group_by_league(&matches);
        debug!(
            "Schedule refreshed: {} matches in {} leagues",
            matches.len(),
            self.leagues.len()
        );

        if self.announce_refresh {
            self.announce_refresh = false;
            self.add_log(format!(
                "Loaded {} leagues for {}",
                self.leagues.len(),
                self.date
            ));
        }

        match self.state {
            AppState::Loading(_) => {
                self.state = AppState::LeagueSelection;
                self.show_leagues();
            }
            AppState::LeagueSelection => self.show_leagues(),
            AppState::ChannelSelection(_) | AppState::Error(_) => {}
        }
    }

    fn league_rows(&self) -> Vec<Row> {
        self.leagues
            .iter()
            .map(|league| Row::League {
                name: league.name.clone(),
                channel_count: league.channels.len(),
            })
            .collect()
    }

    fn show_leagues(&mut self) {
        let keep = self.selected_row().map(|row| row.key().to_string());
        let scroll_offset = self.scroll_offset;
        self.rows = self.league_rows();
        self.apply_filter();
        self.scroll_offset = scroll_offset;

        match keep.and_then(|key| self.position_of(&key)) {
            Some(position) => self.selected = position,
            None => self.selected = self.selected.min(self.visible.len().saturating_sub(1)),
        }
        self.ensure_selected_visible();
    }

    fn open_league(&mut self, name: &str) {
        let Some(league) = self.leagues.iter().find(|l| l.name == name).cloned() else {
            return;
        };

        self.league_nav = NavigationState {
            league: Some(league.name.clone()),
            scroll_offset: self.scroll_offset,
        };
        self.reset_filter();

        let mut rows = Vec::new();
        for group in league.by_match() {
            rows.push(Row::MatchHeader(group.label.to_string()));
            rows.extend(group.channels.into_iter().cloned().map(Row::Channel));
        }
        self.rows = rows;
        self.visible = (0..self.rows.len()).collect();
        self.selected = self.first_selectable();
        self.scroll_offset = 0;

        let channels: Vec<_> = league.channels.iter().map(|e| e.channel.clone()).collect();
        self.probes.watch(&channels);
        self.add_log(format!(
            "Checking {} channels in {}",
            channels.len(),
            league.name
        ));

        self.state = AppState::ChannelSelection(league);
        self.ensure_selected_visible();
    }

    fn back_to_leagues(&mut self) {
        if !matches!(self.state, AppState::ChannelSelection(_)) {
            return;
        }

        self.probes.cancel();
        self.state = AppState::LeagueSelection;
        self.reset_filter();
        self.rows = self.league_rows();
        self.visible = (0..self.rows.len()).collect();
        self.selected = self
            .league_nav
            .league
            .take()
            .and_then(|name| self.position_of(&name))
            .unwrap_or_else(|| self.first_selectable());
        self.scroll_offset = self.league_nav.scroll_offset;
        self.ensure_selected_visible();

        // The list may be stale after sitting in a channel view
        if self
            .last_refresh
            .is_some_and(|at| at.elapsed() >= self.refresh_interval)
        {
            self.start_refresh();
        }
    }

    async fn activate_selected(&mut self) {
        match self.selected_row().cloned() {
            Some(Row::League { name, .. }) => self.open_league(&name),
            Some(Row::Channel(entry)) => self.play_channel(&entry).await,
            Some(Row::MatchHeader(_)) | None => {}
        }
    }

    async fn play_channel(&mut self, entry: &ChannelEntry) {
        if self.probes.status(entry.id()) == Liveness::Pending {
            self.status_message = Some(format!("Still checking {}...", entry.display_name()));
            return;
        }

        self.add_log(format!("Resolving: {}", entry.display_name()));
        let stream = self.client.resolve_or_empty(&entry.channel).await;

        let Some(url) = stream.primary().map(str::to_string) else {
            self.show_error("No stream available for this channel".to_string());
            return;
        };
        self.add_log(format!("Stream URL: {}", url));

        let title = entry.title();
        match self.player.play(&stream, &title).await {
            Ok(()) => {
                self.add_log(format!("Playing: {}", title));
                if self.player.tracks_playback() {
                    self.playing = Some(title);
                }
            }
            Err(e) => {
                self.add_log(format!("Playback failed: {:#}", e));
                self.show_error(format!("Failed to play stream: {}", e));
            }
        }
    }

    fn show_error(&mut self, message: String) {
        if !matches!(self.state, AppState::Error(_)) {
            self.error_return = Some(Box::new(self.state.clone()));
        }
        self.state = AppState::Error(message);
    }

    fn dismiss_error(&mut self) {
        self.state = self
            .error_return
            .take()
            .map(|state| *state)
            .unwrap_or(AppState::LeagueSelection);

        // Leagues may have been refreshed while the overlay was up
        if matches!(self.state, AppState::LeagueSelection) {
            self.show_leagues();
        }
    }

    fn stop_playing(&mut self) {
        let player = self.player.clone();
        tokio::spawn(async move {
            let _ = player.stop().await;
        });

        if let Some(title) = self.playing.take() {
            self.add_log(format!("Stopped: {}", title));
        } else {
            self.add_log("Stopped playback".to_string());
        }
    }

    fn manual_refresh(&mut self) {
        match &self.state {
            AppState::LeagueSelection => {
                self.announce_refresh = true;
                self.start_refresh();
                self.status_message = Some("Refreshing...".to_string());
            }
            AppState::ChannelSelection(league) => {
                let channels: Vec<_> = league.channels.iter().map(|e| e.channel.clone()).collect();
                self.probes.watch(&channels);
                self.add_log(format!("Re-checking {} channels", channels.len()));
            }
            _ => {}
        }
    }

    pub async fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }

        if self.show_help {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::F(1) | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return None;
        }

        match self.state {
            AppState::Error(_) => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.dismiss_error();
                }
                return None;
            }
            AppState::Loading(_) => {
                if key.code == KeyCode::Char('q') {
                    return Some(Action::Quit);
                }
                return None;
            }
            _ => {}
        }

        if self.search_active {
            match key.code {
                KeyCode::Esc => self.cancel_search(),
                KeyCode::Enter => self.confirm_search(),
                KeyCode::Backspace => self.delete_search_char(),
                KeyCode::Up => self.move_selection(-1),
                KeyCode::Down => self.move_selection(1),
                KeyCode::Char(c) => self.update_search(c),
                _ => {}
            }
            return None;
        }

        self.status_message = None;

        match key.code {
            KeyCode::Char('q') => return Some(Action::Quit),
            KeyCode::Char('?') | KeyCode::F(1) => self.show_help = true,
            KeyCode::Char('/') => self.start_search(),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::PageUp => {
                let page = self.visible_height.saturating_sub(1).max(1) as isize;
                self.move_selection(-page);
            }
            KeyCode::PageDown => {
                let page = self.visible_height.saturating_sub(1).max(1) as isize;
                self.move_selection(page);
            }
            KeyCode::Home => {
                self.selected = self.first_selectable();
                self.ensure_selected_visible();
            }
            KeyCode::End => {
                self.selected = self.last_selectable();
                self.ensure_selected_visible();
            }
            KeyCode::Enter => self.activate_selected().await,
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                if !self.search_query.is_empty() {
                    self.reset_filter();
                    self.visible = (0..self.rows.len()).collect();
                    self.selected = self.first_selectable();
                    self.ensure_selected_visible();
                } else {
                    self.back_to_leagues();
                }
            }
            KeyCode::Char('r') => self.manual_refresh(),
            KeyCode::Char('s') => self.stop_playing(),
            _ => {}
        }

        None
    }

    /// Returns true if the screen needs redrawing.
    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Right) => {
                if matches!(self.state, AppState::ChannelSelection(_)) && !self.show_help {
                    self.back_to_leagues();
                    return true;
                }
                false
            }
            MouseEventKind::ScrollUp => {
                self.move_selection(-1);
                true
            }
            MouseEventKind::ScrollDown => {
                self.move_selection(1);
                true
            }
            _ => false,
        }
    }

    fn is_selectable_at(&self, position: usize) -> bool {
        self.visible
            .get(position)
            .and_then(|&index| self.rows.get(index))
            .is_some_and(Row::is_selectable)
    }

    fn first_selectable(&self) -> usize {
        (0..self.visible.len())
            .find(|&p| self.is_selectable_at(p))
            .unwrap_or(0)
    }

    fn last_selectable(&self) -> usize {
        (0..self.visible.len())
            .rev()
            .find(|&p| self.is_selectable_at(p))
            .unwrap_or(0)
    }

    fn position_of(&self, key: &str) -> Option<usize> {
        self.visible
            .iter()
            .position(|&index| self.rows[index].is_selectable() && self.rows[index].key() == key)
    }

    /// Move by `delta` rows, skipping match headers.
    fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }

        let last = self.visible.len() - 1;
        let target = (self.selected as isize + delta).clamp(0, last as isize) as usize;

        let found = if delta < 0 {
            (0..=target)
                .rev()
                .find(|&p| self.is_selectable_at(p))
                .or_else(|| (target..=last).find(|&p| self.is_selectable_at(p)))
        } else {
            (target..=last)
                .find(|&p| self.is_selectable_at(p))
                .or_else(|| (0..=target).rev().find(|&p| self.is_selectable_at(p)))
        };

        if let Some(position) = found {
            self.selected = position;
        }
        self.ensure_selected_visible();
    }

    fn start_search(&mut self) {
        self.search_active = true;
        self.search_query.clear();
        self.apply_filter();
        self.status_message =
            Some("Search: Type to filter, Enter to confirm, Esc to cancel".to_string());
    }

    fn update_search(&mut self, c: char) {
        self.search_query.push(c);
        self.apply_filter();
        self.status_message = Some(format!("Search: {}", self.search_query));
    }

    fn delete_search_char(&mut self) {
        if self.search_query.pop().is_some() {
            self.apply_filter();
        }
        self.status_message = Some(if self.search_query.is_empty() {
            "Search: Type to filter, Enter to confirm, Esc to cancel".to_string()
        } else {
            format!("Search: {}", self.search_query)
        });
    }

    /// Rebuild `visible`. A match header stays only while one of its
    /// channels matches.
    fn apply_filter(&mut self) {
        let query = self.search_query.to_lowercase();

        if query.is_empty() {
            self.visible = (0..self.rows.len()).collect();
        } else {
            let mut visible = Vec::new();
            let mut pending_header: Option<usize> = None;

            for (index, row) in self.rows.iter().enumerate() {
                match row {
                    Row::MatchHeader(_) => pending_header = Some(index),
                    Row::League { name, .. } => {
                        if name.to_lowercase().contains(&query) {
                            visible.push(index);
                        }
                    }
                    Row::Channel(entry) => {
                        if entry.display_name().to_lowercase().contains(&query)
                            || entry.match_label.to_lowercase().contains(&query)
                        {
                            if let Some(header) = pending_header.take() {
                                visible.push(header);
                            }
                            visible.push(index);
                        }
                    }
                }
            }

            self.visible = visible;
        }

        self.selected = self.first_selectable();
        self.scroll_offset = 0;
    }

    fn cancel_search(&mut self) {
        self.reset_filter();
        self.visible = (0..self.rows.len()).collect();
        self.selected = self.first_selectable();
        self.ensure_selected_visible();
    }

    fn confirm_search(&mut self) {
        self.search_active = false;
        self.status_message = if !self.search_query.is_empty() {
            Some(format!(
                "Filtered: \"{}\" (Press '/' to search again)",
                self.search_query
            ))
        } else {
            None
        };
    }

    fn reset_filter(&mut self) {
        self.search_query.clear();
        self.search_active = false;
        self.status_message = None;
    }

    fn add_log(&mut self, message: String) {
        self.logs.push((Local::now(), message));
        if self.logs.len() > 100 {
            self.logs.remove(0);
        }
    }

    fn ensure_selected_visible(&mut self) {
        let visible_height = self.visible_height.max(1);

        if self.visible.is_empty() {
            self.scroll_offset = 0;
            return;
        }

        let position = self.selected;
        let max_scroll = self.visible.len().saturating_sub(visible_height);

        // Keep the match header above the first channel in view
        let top = if position > 0 && !self.is_selectable_at(position - 1) {
            position - 1
        } else {
            position
        };

        if top < self.scroll_offset {
            self.scroll_offset = top;
        } else if position >= self.scroll_offset + visible_height {
            self.scroll_offset = (position + 1).saturating_sub(visible_height);
        }

        self.scroll_offset = self.scroll_offset.min(max_scroll);
    }
}
