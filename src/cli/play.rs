// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::CommandContext;
use anyhow::Result;
use matchday::Player;
use tracing::info;

pub struct PlayCommand {
    pub channel_id: String,
    pub detach: bool,
}

impl PlayCommand {
    pub async fn execute(self, context: CommandContext, player: Player) -> Result<()> {
        let entry = context.channel(&self.channel_id).await;
        let stream = context.client.resolve_stream(&entry.channel).await?;

        let title = if entry.match_label.is_empty() {
            entry.display_name().to_string()
        } else {
            entry.title()
        };

        info!("Starting playback of: {}", title);
        eprintln!("Playing: {}", title);

        if self.detach {
            player.play_detached(&stream, &title).await
        } else {
            player.play_blocking(&stream, &title).await
        }
    }
}
