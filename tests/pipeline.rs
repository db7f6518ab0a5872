// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Schedule → leagues → stream → probe, against a local HTTP server that
//! stands in for the schedule API, the share pages and the HLS CDN.

use chrono::NaiveDate;
use matchday::catalog::{find_channel, group_by_league};
use matchday::config::{ProbeConfig, SourceConfig};
use matchday::probe::{Liveness, ProbeBoard, check_all};
use matchday::schedule::ScheduleClient;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SCHEDULE: &str = r#"[
    {
        "league_en": "Premier League ",
        "home_en": "Arsenal",
        "away_en": "Chelsea",
        "channels": [
            {"ch": "live1", "server_name_en": "beIN 1", "server_name": "بي إن 1"},
            {"ch": "dead1", "server_name_en": "beIN 2", "server_name": null}
        ]
    },
    {
        "league_en": "La Liga",
        "home_en": "Real Madrid",
        "away_en": "Barcelona",
        "channels": [
            {"ch": "notoken", "server_name_en": "", "server_name": ""}
        ]
    },
    {
        "league_en": "Premier League",
        "home_en": "Formula 1",
        "away_en": "Formula 1",
        "channels": [
            {"ch": 77, "server_name_en": "Sky F1", "server_name": ""}
        ]
    },
    {
        "league_en": "Serie A",
        "home_en": "Milan",
        "away_en": "Inter",
        "channels": null
    }
]"#;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()
}

async fn respond(mut socket: TcpStream, addr: SocketAddr) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&buf);
    let mut parts = request.lines().next().unwrap_or_default().split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut extra_headers = String::new();
    let (status, body) = match (method.as_str(), path.as_str()) {
        ("GET", "/api/detail-matches/2025-01-05") => ("200 OK", SCHEDULE.to_string()),
        ("GET", "/share.php?ch=live1") => (
            "200 OK",
            format!(
                "<script>var token = \"http://{}/hls/live1.m3u8\";</script>",
                addr
            ),
        ),
        ("GET", "/share.php?ch=dead1") => (
            "200 OK",
            format!(
                "<script>var token = \"http://{}/hls/dead1.m3u8\";</script>",
                addr
            ),
        ),
        ("GET", "/share.php?ch=notoken") => {
            ("200 OK", "<p>stream offline</p>".to_string())
        }
        ("HEAD", "/hls/live1.m3u8") => ("200 OK", "#EXTM3U\n".to_string()),
        ("HEAD", "/hls/moved.m3u8") => {
            extra_headers = format!("Location: http://{}/hls/live1.m3u8\r\n", addr);
            ("302 Found", String::new())
        }
        _ => ("404 Not Found", "not found".to_string()),
    };

    let mut response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        body.len(),
        extra_headers
    );
    if method != "HEAD" {
        response.push_str(&body);
    }

    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn serve() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(respond(socket, addr));
        }
    });

    addr
}

async fn client() -> (ScheduleClient, SocketAddr) {
    let addr = serve().await;
    let source = SourceConfig {
        schedule_url: format!("http://{}/api/detail-matches/{{date}}", addr),
        share_url: format!("http://{}/share.php", addr),
        timeout_secs: 5,
        ..SourceConfig::default()
    };
    let probe = ProbeConfig {
        timeout_secs: 2,
        concurrency: 2,
    };
    (ScheduleClient::new(&source, &probe).unwrap(), addr)
}

#[tokio::test]
async fn schedule_groups_into_leagues() {
    let (client, _) = client().await;

    let matches = client.fetch_matches(day()).await.unwrap();
    assert_eq!(matches.len(), 4);

    let leagues = group_by_league(&matches);
    let names: Vec<&str> = leagues.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Premier League", "La Liga"]);

    let premier = &leagues[0];
    let ids: Vec<&str> = premier.channels.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["live1", "dead1", "77"]);
    assert_eq!(premier.channels[0].match_label, "Arsenal vs Chelsea");
    assert_eq!(premier.channels[2].match_label, "Formula 1");

    let groups = premier.by_match();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].channels.len(), 2);

    assert_eq!(leagues[1].channels[0].display_name(), "Unknown Channel");
}

#[tokio::test]
async fn missing_day_is_an_error_or_empty() {
    let (client, _) = client().await;
    let other_day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();

    let err = client.fetch_matches(other_day).await.unwrap_err();
    assert!(err.to_string().contains("404"));
    assert!(client.matches_or_empty(other_day).await.is_empty());
}

#[tokio::test]
async fn raw_schedule_is_passed_through() {
    let (client, _) = client().await;

    let raw = client.fetch_raw(day()).await.unwrap();
    assert_eq!(raw.as_array().map(Vec::len), Some(4));
    assert_eq!(raw[3]["channels"], serde_json::Value::Null);
}

#[tokio::test]
async fn share_page_resolves_to_playlist() {
    let (client, addr) = client().await;
    let matches = client.fetch_matches(day()).await.unwrap();

    let entry = find_channel(&matches, "live1").unwrap();
    let stream = client.resolve_stream(&entry.channel).await.unwrap();
    assert_eq!(stream.urls, vec![format!("http://{}/hls/live1.m3u8", addr)]);
    assert_eq!(stream.referer, "https://koora.vip/");

    let json = serde_json::to_value(&stream).unwrap();
    assert_eq!(json["Referer"], "https://koora.vip/");
}

#[tokio::test]
async fn unresolvable_channels_fail_cleanly() {
    let (client, _) = client().await;
    let matches = client.fetch_matches(day()).await.unwrap();

    let missing = find_channel(&matches, "77").unwrap();
    let err = client.resolve_stream(&missing.channel).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to fetch share page for channel 77. Status code: 404"
    );
    assert!(client.resolve_or_empty(&missing.channel).await.is_empty());

    let no_token = find_channel(&matches, "notoken").unwrap();
    let err = client.resolve_stream(&no_token.channel).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to extract token URL for channel notoken"
    );
}

#[tokio::test]
async fn probes_report_liveness() {
    let (client, addr) = client().await;

    assert!(
        client
            .is_stream_working(&format!("http://{}/hls/live1.m3u8", addr))
            .await
    );
    assert!(
        !client
            .is_stream_working(&format!("http://{}/hls/dead1.m3u8", addr))
            .await
    );
    // A redirect is judged by itself, not by where it points
    assert!(
        !client
            .is_stream_working(&format!("http://{}/hls/moved.m3u8", addr))
            .await
    );
    // Nothing listens on port 9 of localhost
    assert!(!client.is_stream_working("http://127.0.0.1:9/x.m3u8").await);
}

#[tokio::test]
async fn bulk_check_keeps_input_order() {
    let (client, _) = client().await;
    let matches = client.fetch_matches(day()).await.unwrap();
    let entries: Vec<_> = group_by_league(&matches)
        .into_iter()
        .flat_map(|l| l.channels)
        .collect();

    let seen = std::sync::atomic::AtomicUsize::new(0);
    let results = check_all(&client, entries, 2, |_, _| {
        seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    })
    .await;

    assert_eq!(seen.into_inner(), 4);
    let summary: Vec<(&str, Liveness)> = results
        .iter()
        .map(|(entry, liveness)| (entry.id(), *liveness))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("live1", Liveness::Live),
            ("dead1", Liveness::Dead),
            ("77", Liveness::Dead),
            ("notoken", Liveness::Dead),
        ]
    );
}

#[tokio::test]
async fn probe_board_settles_and_resets() {
    let (client, _) = client().await;
    let matches = client.fetch_matches(day()).await.unwrap();
    let premier: Vec<_> = group_by_league(&matches)[0]
        .channels
        .iter()
        .map(|entry| entry.channel.clone())
        .collect();

    let mut board = ProbeBoard::new(client.clone());
    board.watch(&premier);
    assert_eq!(board.counts(), (3, 0, 0));
    assert_eq!(board.status("live1"), Liveness::Pending);

    let settled = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            board.drain();
            if board.counts().0 == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(settled.is_ok(), "probes did not settle");

    assert_eq!(board.counts(), (0, 1, 2));
    assert_eq!(board.status("live1"), Liveness::Live);
    assert_eq!(board.status("dead1"), Liveness::Dead);

    // A new view forgets the previous one
    let la_liga = vec![find_channel(&matches, "notoken").unwrap().channel];
    board.watch(&la_liga);
    assert_eq!(board.counts(), (1, 0, 0));
    assert_eq!(board.status("live1"), Liveness::Pending);
}
