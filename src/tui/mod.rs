// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod app;
pub mod event;
pub mod ui;
pub mod widgets;

use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;

use crate::config::Config;
use crate::player::Player;
use crate::schedule::ScheduleClient;

pub use app::App;
pub use event::{Event, EventHandler};

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    pub event_handler: EventHandler,
}

impl Tui {
    pub fn new() -> Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;
        let event_handler = EventHandler::new(Duration::from_millis(100));
        Ok(Self {
            terminal,
            event_handler,
        })
    }

    pub fn init(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        Ok(())
    }

    pub fn draw(&mut self, app: &mut App) -> Result<()> {
        self.terminal.draw(|frame| ui::draw(frame, app))?;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

pub async fn run_tui(
    config: &Config,
    mut client: ScheduleClient,
    player: Player,
    date: NaiveDate,
) -> Result<()> {
    // Spinners would corrupt the alternate screen
    client.disable_progress();

    let mut tui = Tui::new()?;
    tui.init()?;

    let refresh_interval = Duration::from_secs(config.ui.refresh_secs.max(1));
    let mut app = App::new(client, player.clone(), date, refresh_interval);
    let res = run_app(&mut tui, &mut app).await;

    let _ = player.shutdown().await;

    tui.exit()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app(tui: &mut Tui, app: &mut App) -> Result<()> {
    tui.draw(app)?;

    loop {
        let event =
            tokio::time::timeout(Duration::from_millis(250), tui.event_handler.next()).await;

        let handled = match event {
            Ok(Ok(Event::Key(key_event))) => match app.handle_key_event(key_event).await {
                Some(app::Action::Quit) => break,
                None => true,
            },
            Ok(Ok(Event::Mouse(mouse_event))) => app.handle_mouse_event(mouse_event),
            Ok(Ok(Event::Resize(_, _))) => true,
            Ok(Err(e)) => return Err(e),
            Err(_) => false,
        };

        // Refresh and probe results are picked up whether or not input arrived
        let ticked = app.async_tick().await;

        if handled || ticked {
            tui.draw(app)?;
        }
    }

    Ok(())
}
