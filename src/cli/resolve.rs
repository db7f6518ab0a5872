// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::CommandContext;
use anyhow::Result;
use matchday::schedule::Channel;

pub struct ResolveCommand {
    pub channel_id: String,
}

impl ResolveCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let channel = Channel {
            ch: self.channel_id,
            ..Channel::default()
        };

        let stream = context.client.resolve_stream(&channel).await?;
        println!("{}", serde_json::to_string_pretty(&stream)?);
        Ok(())
    }
}
