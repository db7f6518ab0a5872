// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use crossterm::event::{
    self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

/// Keep key presses, right clicks, wheel scrolls and resizes.
/// Mouse capture reports every motion, which would otherwise flood the loop.
fn translate(event: CrosstermEvent) -> Option<Event> {
    match event {
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        CrosstermEvent::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(MouseButton::Right)
            | MouseEventKind::ScrollUp
            | MouseEventKind::ScrollDown => Some(Event::Mouse(mouse)),
            _ => None,
        },
        CrosstermEvent::Resize(width, height) => Some(Event::Resize(width, height)),
        _ => None,
    }
}

pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Reads the terminal on a blocking thread; `poll_interval` bounds how
    /// long the reader waits before checking whether the UI has gone away.
    pub fn new(poll_interval: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        tokio::task::spawn_blocking(move || {
            while !sender.is_closed() {
                match event::poll(poll_interval) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        debug!("Terminal poll failed: {}", e);
                        break;
                    }
                }

                let Some(event) = event::read().ok().and_then(translate) else {
                    continue;
                };
                if sender.send(event).is_err() {
                    break;
                }
            }
        });

        Self { receiver }
    }

    pub async fn next(&mut self) -> Result<Event> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Event channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    fn mouse(kind: MouseEventKind) -> CrosstermEvent {
        CrosstermEvent::Mouse(MouseEvent {
            kind,
            column: 3,
            row: 4,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn only_handled_mouse_events_pass() {
        assert!(translate(mouse(MouseEventKind::Down(MouseButton::Right))).is_some());
        assert!(translate(mouse(MouseEventKind::ScrollDown)).is_some());
        assert!(translate(mouse(MouseEventKind::Moved)).is_none());
        assert!(translate(mouse(MouseEventKind::Down(MouseButton::Left))).is_none());
    }

    #[test]
    fn key_releases_are_dropped() {
        let press = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..press
        };

        assert!(matches!(translate(CrosstermEvent::Key(press)), Some(Event::Key(_))));
        assert!(translate(CrosstermEvent::Key(release)).is_none());
        assert!(matches!(
            translate(CrosstermEvent::Resize(80, 24)),
            Some(Event::Resize(80, 24))
        ));
    }
}
