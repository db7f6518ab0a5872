// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::schedule::{Channel, ScheduleClient};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

static TOKEN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"var token = "(https?://[^"]+\.m3u8)""#).expect("token pattern is valid")
});

/// Playable URLs for a channel and the Referer the CDN insists on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub urls: Vec<String>,
    #[serde(rename = "Referer")]
    pub referer: String,
}

impl Stream {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn primary(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }
}

pub fn share_url(base: &str, channel_id: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid share URL: {}", base))?;
    url.query_pairs_mut().append_pair("ch", channel_id);
    Ok(url)
}

/// Pull the HLS playlist URL out of a share page's inline script.
pub fn extract_token_url(html: &str) -> Option<String> {
    TOKEN_URL
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

impl ScheduleClient {
    pub async fn resolve_stream(&self, channel: &Channel) -> Result<Stream> {
        let url = share_url(&self.source.share_url, &channel.ch)?;
        debug!("Fetching share page for channel {}: {}", channel.ch, url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch share page {}", url))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!(
                "Failed to fetch share page for channel {}. Status code: {}",
                channel.ch,
                status.as_u16()
            );
        }

        let html = response
            .text()
            .await
            .with_context(|| "Failed to read share page body")?;

        let token_url = extract_token_url(&html).ok_or_else(|| {
            anyhow::anyhow!("Failed to extract token URL for channel {}", channel.ch)
        })?;

        Ok(Stream {
            urls: vec![token_url],
            referer: self.source.referer.clone(),
        })
    }

    pub async fn resolve_or_empty(&self, channel: &Channel) -> Stream {
        match self.resolve_stream(channel).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Error fetching stream for channel {}: {:#}", channel.ch, e);
                Stream::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHARE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><script src="/player.js"></script></head>
<body>
<script>
    var channel = "bein1";
    var token = "https://cdn.example.net/live/bein1/index.m3u8";
    var token = "https://cdn.example.net/live/backup/index.m3u8";
</script>
</body></html>"#;

    #[test]
    fn extracts_first_playlist_url() {
        assert_eq!(
            extract_token_url(SHARE_PAGE).as_deref(),
            Some("https://cdn.example.net/live/bein1/index.m3u8")
        );
    }

    #[test]
    fn ignores_non_hls_and_missing_tokens() {
        assert_eq!(
            extract_token_url(r#"var token = "https://cdn.example.net/live/a.mp4";"#),
            None
        );
        assert_eq!(
            extract_token_url(r#"var token = "ftp://cdn.example.net/a.m3u8";"#),
            None
        );
        assert_eq!(
            extract_token_url(r#"var token = "https://cdn.example.net/a.m3u8?st=1";"#),
            None
        );
        assert_eq!(extract_token_url("<html>offline</html>"), None);
    }

    #[test]
    fn share_url_encodes_channel_id() {
        let url = share_url("https://share.koora.vip/share.php", "a b&c").unwrap();
        assert_eq!(url.as_str(), "https://share.koora.vip/share.php?ch=a+b%26c");
        assert!(share_url("not a url", "1").is_err());
    }

    #[test]
    fn empty_stream_has_no_primary() {
        let stream = Stream::empty();
        assert!(stream.is_empty());
        assert_eq!(stream.primary(), None);
        assert_eq!(stream.referer, "");
    }

    #[test]
    fn serialises_referer_like_upstream() {
        let stream = Stream {
            urls: vec!["https://cdn.example.net/a.m3u8".to_string()],
            referer: "https://koora.vip/".to_string(),
        };
        let json = serde_json::to_value(&stream).unwrap();
        assert_eq!(json["Referer"], "https://koora.vip/");
        assert_eq!(json["urls"][0], "https://cdn.example.net/a.m3u8");
    }
}
