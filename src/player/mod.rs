// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

mod mpv;

use crate::config::{PlayMode, PlayerConfig};
use crate::stream::Stream;
use anyhow::{Context, Result};
use mpv::{MpvPlayer, PlayRequest};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub struct Player {
    mpv_player: Arc<Mutex<Option<MpvPlayer>>>,
    config: PlayerConfig,
    use_mpv: bool,
}

impl Clone for Player {
    fn clone(&self) -> Self {
        Self {
            mpv_player: Arc::clone(&self.mpv_player),
            config: self.config.clone(),
            use_mpv: self.use_mpv,
        }
    }
}

/// Arguments for a standalone mpv process playing one channel.
pub fn mpv_args(stream_url: &str, referer: &str, title: &str, extra: &[String]) -> Vec<String> {
    let mut args = vec![
        stream_url.to_string(),
        format!("--http-header-fields=Referer: {}", referer),
        format!("--title={}", title),
        "--loop-file=inf".to_string(),
        "--force-window=yes".to_string(),
        "--osc=yes".to_string(),
        "--input-default-bindings=yes".to_string(),
        "--input-vo-keyboard=yes".to_string(),
    ];
    args.extend(extra.iter().cloned());
    args
}

fn primary_url(stream: &Stream) -> Result<&str> {
    stream
        .primary()
        .ok_or_else(|| anyhow::anyhow!("No stream available for this channel"))
}

impl Player {
    pub fn new(config: &PlayerConfig) -> Self {
        let use_mpv = Self::is_mpv_available(&config.command);

        if use_mpv {
            debug!("MPV detected at '{}'", config.command);
        } else {
            debug!("MPV not found at '{}'", config.command);
        }

        Self {
            mpv_player: Arc::new(Mutex::new(None)),
            config: config.clone(),
            use_mpv,
        }
    }

    fn is_mpv_available(command: &str) -> bool {
        Command::new(command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn is_available(&self) -> bool {
        self.use_mpv
    }

    /// Whether playback can be watched for exit (only the shared window can)
    pub fn tracks_playback(&self) -> bool {
        self.config.play_mode == PlayMode::Mpv
    }

    fn ensure_available(&self) -> Result<()> {
        if !self.use_mpv {
            return Err(anyhow::anyhow!(
                "MPV is not installed. Please install MPV to play streams."
            ));
        }
        Ok(())
    }

    /// Play from an interactive surface, following the configured play mode.
    pub async fn play(&self, stream: &Stream, title: &str) -> Result<()> {
        match self.config.play_mode {
            PlayMode::Mpv => self.play_ipc(stream, title).await,
            PlayMode::Detached => self.play_detached(stream, title).await,
        }
    }

    /// Play in the shared mpv window, launching it if needed.
    pub async fn play_ipc(&self, stream: &Stream, title: &str) -> Result<()> {
        let url = primary_url(stream)?;
        self.ensure_available()?;

        let request = PlayRequest {
            url,
            referer: &stream.referer,
            title,
        };

        let mut mpv_guard = self.mpv_player.lock().await;

        let needs_restart = match mpv_guard.as_mut() {
            Some(mpv) => !mpv.is_running().await,
            None => true,
        };

        if needs_restart {
            if let Some(mut old_mpv) = mpv_guard.take() {
                debug!("Cleaning up old MPV instance");
                let _ = old_mpv.stop().await;
            }

            if let Some(existing_mpv) = MpvPlayer::try_connect_existing(&self.config.command).await
            {
                debug!("Found existing MPV instance, reusing it");
                existing_mpv.play(&request).await?;
                *mpv_guard = Some(existing_mpv);
            } else {
                let mut mpv = MpvPlayer::new(&self.config.command);
                mpv.launch().await?;
                mpv.play(&request).await?;
                *mpv_guard = Some(mpv);
            }
        } else {
            let result = match mpv_guard.as_ref() {
                Some(mpv) => mpv.play(&request).await,
                None => Ok(()),
            };

            let Err(e) = result else {
                return Ok(());
            };

            error!("Failed to play stream: {}", e);
            warn!("Attempting to restart MPV after play failure");

            let mut mpv = MpvPlayer::new(&self.config.command);
            mpv.launch().await?;
            mpv.play(&request).await?;
            *mpv_guard = Some(mpv);
        }

        Ok(())
    }

    /// Play and wait for the player window to close.
    pub async fn play_blocking(&self, stream: &Stream, title: &str) -> Result<()> {
        let url = primary_url(stream)?;
        self.ensure_available()?;

        let args = mpv_args(url, &stream.referer, title, &self.config.args);
        let command = self.config.command.clone();

        let status = tokio::task::spawn_blocking(move || Command::new(command).args(args).status())
            .await
            .with_context(|| "Failed to spawn blocking task")?
            .context("Failed to start MPV")?;

        if !status.success()
            && let Some(code) = status.code()
        {
            // Exit code 4 is normal user quit in MPV
            if code != 4 {
                return Err(anyhow::anyhow!("MPV exited with code: {}", code));
            }
        }

        Ok(())
    }

    /// Start an independent mpv window and return immediately.
    pub async fn play_detached(&self, stream: &Stream, title: &str) -> Result<()> {
        let url = primary_url(stream)?;
        self.ensure_available()?;

        let mut cmd = if cfg!(target_os = "linux") {
            let mut setsid_cmd = Command::new("setsid");
            setsid_cmd.arg(&self.config.command);
            setsid_cmd
        } else {
            Command::new(&self.config.command)
        };

        cmd.args(mpv_args(url, &stream.referer, title, &self.config.args))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());

        cmd.spawn()
            .context("Failed to start MPV in detached mode")?;

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut mpv_guard = self.mpv_player.lock().await;
        if let Some(mpv) = mpv_guard.as_mut() {
            mpv.stop_with_kill(false).await?;
        }
        Ok(())
    }

    /// Returns (is_running, exit_message)
    pub async fn check_player_status(&self) -> (bool, Option<String>) {
        let mut mpv_guard = self.mpv_player.lock().await;
        let Some(mpv) = mpv_guard.as_mut() else {
            return (false, None);
        };

        let is_running = mpv.is_running().await;
        if !is_running && let Some(exit_status) = mpv.take_last_exit_status() {
            let message = if exit_status.success() {
                "MPV exited normally (status: 0)".to_string()
            } else if let Some(code) = exit_status.code() {
                format!("MPV exited with error code: {}", code)
            } else {
                "MPV terminated by signal".to_string()
            };
            return (false, Some(message));
        }

        (is_running, None)
    }

    pub async fn shutdown(&self) -> Result<()> {
        debug!("Shutting down player");

        let mut mpv_guard = self.mpv_player.lock().await;
        if let Some(mut mpv) = mpv_guard.take() {
            let _ = mpv.stop().await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpv_args_carry_referer_and_title() {
        let args = mpv_args(
            "https://cdn.example.net/a.m3u8",
            "https://koora.vip/",
            "beIN 1 - A vs B",
            &["--fs".to_string()],
        );
        assert_eq!(args[0], "https://cdn.example.net/a.m3u8");
        assert!(args.contains(&"--http-header-fields=Referer: https://koora.vip/".to_string()));
        assert!(args.contains(&"--title=beIN 1 - A vs B".to_string()));
        assert!(args.contains(&"--loop-file=inf".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--fs"));
    }

    #[tokio::test]
    async fn empty_stream_is_refused() {
        let player = Player::new(&PlayerConfig {
            command: "matchday-no-such-player".to_string(),
            ..PlayerConfig::default()
        });
        assert!(!player.is_available());

        let err = player.play(&Stream::empty(), "x").await.unwrap_err();
        assert_eq!(err.to_string(), "No stream available for this channel");

        let err = player.play_blocking(&Stream::empty(), "x").await.unwrap_err();
        assert_eq!(err.to_string(), "No stream available for this channel");
    }
}
