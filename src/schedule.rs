// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::config::{ProbeConfig, SourceConfig};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Ids come as strings or numbers; anything else is kept as its JSON text.
fn deserialize_id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

fn deserialize_nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// One fixture from the upstream listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Match {
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub league_en: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub home_en: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub away_en: String,
    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Opaque upstream id, used as the `ch` share-page parameter
    #[serde(default, deserialize_with = "deserialize_id_as_string")]
    pub ch: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub server_name_en: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub server_name: String,
}

/// Parse a schedule body. A `null` body is an empty day.
pub fn parse_matches(text: &str) -> Result<Vec<Match>> {
    let matches: Option<Vec<Match>> = serde_json::from_str(text).map_err(|e| {
        let line_num = e.line();
        let col_num = e.column();
        let snippet: String = text
            .lines()
            .nth(line_num.saturating_sub(1))
            .map(|line| {
                let start = col_num.saturating_sub(60);
                line.chars().skip(start).take(120).collect()
            })
            .unwrap_or_default();

        let error_msg = format!(
            "Schedule JSON parsing failed at line {}, column {}:\nContext: ...{}...\nError: {}",
            line_num, col_num, snippet, e
        );
        warn!("{}", error_msg);
        anyhow::anyhow!(error_msg)
    })?;

    Ok(matches.unwrap_or_default())
}

/// The date the listing is keyed by when none is given.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// HTTP session shared by schedule fetches, share-page scraping and probes.
#[derive(Debug, Clone)]
pub struct ScheduleClient {
    pub(crate) client: Client,
    /// HEAD checks judge the first response, so this one never follows redirects
    pub(crate) probe_client: Client,
    pub(crate) source: SourceConfig,
    pub(crate) probe_timeout: Duration,
    show_progress: bool,
}

impl ScheduleClient {
    pub fn new(source: &SourceConfig, probe: &ProbeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&source.user_agent).with_context(|| "Invalid user agent")?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&source.referer).with_context(|| "Invalid referer")?,
        );
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&source.origin).with_context(|| "Invalid origin")?,
        );

        let client = Client::builder()
            .default_headers(headers.clone())
            .timeout(Duration::from_secs(source.timeout_secs.max(1)))
            .build()
            .with_context(|| "Failed to build HTTP client")?;

        let probe_client = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .with_context(|| "Failed to build probe HTTP client")?;

        Ok(Self {
            client,
            probe_client,
            source: source.clone(),
            probe_timeout: Duration::from_secs(probe.timeout_secs.max(1)),
            show_progress: false,
        })
    }

    /// Show a spinner on stderr while fetching (CLI only)
    pub fn enable_progress(&mut self) {
        self.show_progress = true;
    }

    pub fn disable_progress(&mut self) {
        self.show_progress = false;
    }

    pub fn referer(&self) -> &str {
        &self.source.referer
    }

    pub fn schedule_url(&self, date: NaiveDate) -> String {
        self.source
            .schedule_url
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
    }

    async fn fetch_body(&self, date: NaiveDate) -> Result<String> {
        let url = self.schedule_url(date);
        debug!("Requesting schedule: {}", url);

        let pb = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} [{elapsed_precise}] {bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Fetching schedule...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            pb.finish_and_clear();
            return Err(anyhow::anyhow!(
                "Schedule request failed with status: {}",
                response.status()
            ));
        }

        pb.set_message("Downloading...");

        let mut response_bytes = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = futures_util::StreamExt::next(&mut stream).await {
            let chunk = chunk_result.with_context(|| "Failed to read response chunk")?;
            response_bytes.extend_from_slice(&chunk);
            pb.set_position(response_bytes.len() as u64);
        }

        pb.finish_and_clear();
        debug!("Schedule response size: {} bytes", response_bytes.len());

        let text = String::from_utf8(response_bytes)
            .with_context(|| "Failed to convert response to UTF-8 string")?;

        if text.trim().is_empty() {
            return Err(anyhow::anyhow!("Empty response from server"));
        }

        Ok(text)
    }

    pub async fn fetch_matches(&self, date: NaiveDate) -> Result<Vec<Match>> {
        let text = self.fetch_body(date).await?;
        let matches = parse_matches(&text)?;
        debug!("Fetched {} matches for {}", matches.len(), date);
        Ok(matches)
    }

    /// Undecoded upstream JSON
    pub async fn fetch_raw(&self, date: NaiveDate) -> Result<Value> {
        let text = self.fetch_body(date).await?;
        serde_json::from_str(&text).with_context(|| "Schedule response is not valid JSON")
    }

    /// Listing for display surfaces: any failure is logged and shows as an empty day.
    pub async fn matches_or_empty(&self, date: NaiveDate) -> Vec<Match> {
        match self.fetch_matches(date).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Error fetching schedule: {:#}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_numeric_ids_and_nulls() {
        let body = r#"[
            {
                "league_en": "Premier League",
                "home_en": "Arsenal",
                "away_en": "Chelsea",
                "channels": [
                    {"ch": 1042, "server_name_en": "beIN 1", "server_name": "بي ان 1"},
                    {"ch": "abc", "server_name_en": null}
                ]
            },
            {"league_en": null, "home_en": "A", "away_en": "B", "channels": null},
            {"league_en": "Serie A"}
        ]"#;

        let matches = parse_matches(body).unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].channels[0].ch, "1042");
        assert_eq!(matches[0].channels[1].ch, "abc");
        assert_eq!(matches[0].channels[1].server_name_en, "");
        assert_eq!(matches[1].league_en, "");
        assert!(matches[1].channels.is_empty());
        assert!(matches[2].channels.is_empty());
    }

    #[test]
    fn odd_channel_ids_do_not_break_the_day() {
        let body = r#"[
            {"league_en": "La Liga", "channels": [{"ch": true}, {"ch": {"id": 7}}, {"ch": "ok"}]}
        ]"#;

        let matches = parse_matches(body).unwrap();
        let ids: Vec<&str> = matches[0].channels.iter().map(|c| c.ch.as_str()).collect();
        assert_eq!(ids, vec!["true", r#"{"id":7}"#, "ok"]);
    }

    #[test]
    fn null_body_is_empty_day() {
        assert!(parse_matches("null").unwrap().is_empty());
        assert!(parse_matches("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_an_error() {
        let err = parse_matches("[{\"league_en\": ").unwrap_err();
        assert!(err.to_string().contains("parsing failed"));
    }

    #[test]
    fn schedule_url_substitutes_date() {
        let client = ScheduleClient::new(&SourceConfig::default(), &ProbeConfig::default()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(
            client.schedule_url(date),
            "https://web-api.scorarab.com/api/detail-matches/2025-03-09?t=10"
        );
    }
}
