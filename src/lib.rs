// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod catalog;
pub mod config;
pub mod menu;
pub mod player;
pub mod probe;
pub mod schedule;
pub mod stream;
pub mod tui;

pub use config::Config;
pub use menu::MenuSystem;
pub use player::Player;
pub use schedule::ScheduleClient;
pub use tui::run_tui;
