// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// What mpv needs to open one channel.
pub(super) struct PlayRequest<'a> {
    pub url: &'a str,
    pub referer: &'a str,
    pub title: &'a str,
}

/// An mpv instance driven over its JSON IPC socket.
pub(super) struct MpvPlayer {
    command: String,
    socket_path: PathBuf,
    mpv_process: Option<Child>,
    last_exit_status: Option<std::process::ExitStatus>,
}

impl MpvPlayer {
    pub(super) fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            socket_path: Self::socket_path(),
            mpv_process: None,
            last_exit_status: None,
        }
    }

    /// `$XDG_STATE_HOME/matchday/mpv.sock`, shared by every instance of the
    /// app for this user.
    pub(super) fn socket_path() -> PathBuf {
        let state_dir = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")));

        let Some(app_dir) = state_dir.map(|dir| dir.join("matchday")) else {
            let uid = unsafe { libc::getuid() };
            return std::env::temp_dir().join(format!("matchday-mpv-{}.sock", uid));
        };

        if !app_dir.exists() {
            if let Err(e) = fs::create_dir_all(&app_dir) {
                warn!("Failed to create state directory: {}", e);
                let uid = unsafe { libc::getuid() };
                return std::env::temp_dir().join(format!("matchday-mpv-{}.sock", uid));
            }
            if let Err(e) = fs::set_permissions(&app_dir, fs::Permissions::from_mode(0o700)) {
                warn!("Failed to set permissions on state directory: {}", e);
            }
        }

        app_dir.join("mpv.sock")
    }

    /// Attach to an mpv left running by an earlier session.
    pub(super) async fn try_connect_existing(command: &str) -> Option<Self> {
        let player = Self::new(command);

        if !player.socket_path.exists() {
            debug!("No existing MPV socket found at {:?}", player.socket_path);
            return None;
        }

        if player.is_socket_ready().await {
            debug!("Connected to existing MPV instance at {:?}", player.socket_path);
            Some(player)
        } else {
            debug!("Socket exists but MPV is not responding, cleaning up");
            let _ = fs::remove_file(&player.socket_path);
            None
        }
    }

    fn send_command(&self, command: Value) -> Result<Value> {
        let mut socket = UnixStream::connect(&self.socket_path).with_context(|| {
            format!("Failed to connect to MPV socket at {:?}", self.socket_path)
        })?;
        socket.set_read_timeout(Some(Duration::from_secs(2)))?;

        let command_str = serde_json::to_string(&command)?;
        debug!("Sending MPV command: {}", command_str);

        socket.write_all(command_str.as_bytes())?;
        socket.write_all(b"\n")?;

        // mpv interleaves events with replies; skip lines until the reply
        let mut reader = BufReader::new(socket);
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(anyhow::anyhow!("MPV closed the IPC connection"));
            }

            let parsed: Value = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse MPV response: {}", line))?;

            if parsed.get("event").is_some() {
                continue;
            }

            if let Some(error) = parsed.get("error").and_then(|e| e.as_str())
                && error != "success"
            {
                return Err(anyhow::anyhow!("MPV command failed: {}", error));
            }

            return Ok(parsed);
        }
    }

    async fn is_socket_ready(&self) -> bool {
        if !self.socket_path.exists() {
            return false;
        }

        match UnixStream::connect(&self.socket_path) {
            Ok(mut socket) => {
                let command = json!({
                    "command": ["get_property", "mpv-version"]
                });

                if let Ok(command_str) = serde_json::to_string(&command)
                    && socket.write_all(command_str.as_bytes()).is_ok()
                    && socket.write_all(b"\n").is_ok()
                {
                    return true;
                }
                false
            }
            Err(_) => false,
        }
    }

    pub(super) async fn launch(&mut self) -> Result<()> {
        debug!("Launching MPV with IPC socket at {:?}", self.socket_path);

        if self.is_socket_ready().await {
            debug!("MPV is already running, skipping launch");
            return Ok(());
        }

        if self.mpv_process.is_some() {
            self.stop().await?;
        }

        if self.socket_path.exists() {
            let _ = fs::remove_file(&self.socket_path);
        }

        // setsid keeps mpv alive when the terminal running the TUI goes away
        let mut cmd = if cfg!(target_os = "linux") {
            let mut setsid_cmd = Command::new("setsid");
            setsid_cmd.arg(&self.command);
            setsid_cmd
        } else {
            Command::new(&self.command)
        };

        cmd.arg(format!("--input-ipc-server={}", self.socket_path.display()))
            .arg("--idle=yes")
            .arg("--force-window=yes")
            .arg("--keep-open=yes")
            .arg("--no-terminal")
            .arg("--really-quiet")
            .arg("--osc=yes")
            .arg("--input-default-bindings=yes")
            .arg("--input-vo-keyboard=yes")
            .arg("--title=Matchday")
            .arg("--geometry=1280x720")
            .arg("--autofit-larger=90%x90%")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());

        debug!("MPV command: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .context("Failed to start MPV. Is MPV installed?")?;

        if let Some(stdout) = child.stdout.take() {
            thread::spawn(move || {
                let reader = BufReader::new(stdout);
                for line in reader.lines().map_while(Result::ok) {
                    debug!("MPV stdout: {}", line);
                }
            });
        }

        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    if line.contains("error") || line.contains("ERROR") {
                        warn!("MPV stderr: {}", line);
                    } else {
                        debug!("MPV stderr: {}", line);
                    }
                }
            });
        }

        self.mpv_process = Some(child);

        for i in 0..20 {
            sleep(Duration::from_millis(500)).await;

            if let Some(ref mut proc) = self.mpv_process {
                match proc.try_wait() {
                    Ok(Some(status)) => {
                        error!("MPV process exited unexpectedly with status: {:?}", status);
                        return Err(anyhow::anyhow!(
                            "MPV process exited unexpectedly with status: {:?}",
                            status
                        ));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Failed to check MPV process status: {}", e);
                    }
                }
            }

            if self.is_socket_ready().await {
                debug!("MPV IPC socket ready after {} ms", (i + 1) * 500);
                return Ok(());
            }
        }

        error!("MPV IPC socket failed to start after 10 seconds");
        Err(anyhow::anyhow!(
            "MPV IPC socket failed to start after 10 seconds"
        ))
    }

    /// Replace whatever is playing with the requested channel.
    pub(super) async fn play(&self, request: &PlayRequest<'_>) -> Result<()> {
        debug!("Playing {} ({})", request.title, request.url);

        if !self.is_socket_ready().await {
            warn!("MPV is not running, cannot play stream");
            return Err(anyhow::anyhow!(
                "MPV is not running. Please restart the player."
            ));
        }

        let _ = self.send_command(json!({ "command": ["stop"] }));

        // Header and loop settings must be in place before loadfile opens the URL
        self.send_command(json!({
            "command": ["set_property", "http-header-fields", format!("Referer: {}", request.referer)]
        }))
        .context("Failed to set Referer header")?;
        self.send_command(json!({ "command": ["set_property", "loop-file", "inf"] }))?;
        let _ = self.send_command(json!({ "command": ["set_property", "title", request.title] }));

        sleep(Duration::from_millis(100)).await;

        const MAX_RETRIES: u32 = 3;
        const INITIAL_DELAY_MS: u64 = 500;

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay_ms = INITIAL_DELAY_MS * (attempt as u64);
                debug!(
                    "Retrying stream connection (attempt {}/{}), waiting {}ms...",
                    attempt + 1,
                    MAX_RETRIES,
                    delay_ms
                );
                sleep(Duration::from_millis(delay_ms)).await;
                let _ = self.send_command(json!({ "command": ["stop"] }));
                sleep(Duration::from_millis(100)).await;
            }

            match self.send_command(json!({ "command": ["loadfile", request.url, "replace"] })) {
                Ok(_) => {
                    sleep(Duration::from_millis(500)).await;

                    match self.send_command(json!({ "command": ["get_property", "filename"] })) {
                        Ok(_) => {
                            debug!("Stream loaded in MPV after {} retries", attempt);
                            return Ok(());
                        }
                        Err(e) => {
                            warn!("Stream may not have started properly: {}", e);
                            last_error = Some(e);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to send play command to MPV (attempt {}/{}): {}",
                        attempt + 1,
                        MAX_RETRIES,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Failed to play stream"))
            .context(format!(
                "Failed to play stream after {} attempts",
                MAX_RETRIES
            )))
    }

    pub(super) async fn stop(&mut self) -> Result<()> {
        self.stop_with_kill(true).await
    }

    pub(super) async fn stop_with_kill(&mut self, kill_process: bool) -> Result<()> {
        debug!("Stopping MPV playback (kill_process: {})", kill_process);

        if self.is_socket_ready().await {
            let _ = self.send_command(json!({ "command": ["stop"] }));
            let _ = self.send_command(json!({ "command": ["playlist-clear"] }));
        }

        if kill_process && let Some(mut child) = self.mpv_process.take() {
            debug!("Killing MPV process");
            let _ = child.kill();
            let _ = child.wait();
        }

        Ok(())
    }

    pub(super) async fn is_running(&mut self) -> bool {
        if let Some(ref mut proc) = self.mpv_process {
            match proc.try_wait() {
                Ok(Some(status)) => {
                    debug!("MPV process has exited with status: {:?}", status);
                    self.last_exit_status = Some(status);
                    self.mpv_process = None;
                    return false;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to check MPV process status: {}", e);
                }
            }
        }

        self.is_socket_ready().await
    }

    pub(super) fn take_last_exit_status(&mut self) -> Option<std::process::ExitStatus> {
        self.last_exit_status.take()
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        if let Some(mut child) = self.mpv_process.take() {
            match child.try_wait() {
                Ok(Some(_)) => {
                    debug!("MPV process already exited");
                }
                Ok(None) | Err(_) => {
                    debug!("Terminating MPV process on cleanup");
                    let _ = child.kill();
                    let _ = child.wait();
                }
            }
        }
    }
}
