use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use match_pipeline::TransformedMatch;
use match_tracker::{body_snippet, Analyzer, PlayerAnalysis};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct AnalyzerResponse {
    #[serde(default)]
    players: Vec<PlayerAnalysis>,
}

/// Posts the transformed match as JSON and reads `{ "players": [...] }`.
pub struct HttpAnalyzer {
    http: reqwest::Client,
    url:  String,
}

impl HttpAnalyzer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, transformed: &TransformedMatch) -> Result<Vec<PlayerAnalysis>> {
        let resp = self
            .http
            .post(&self.url)
            .json(transformed)
            .send()
            .await
            .context("analyzer request")?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("analyzer HTTP {}: {}", status, body_snippet(&body, 200));
        }
        let parsed: AnalyzerResponse = serde_json::from_str(&body)
            .with_context(|| format!("analyzer body: {}", body_snippet(&body, 200)))?;
        if parsed.players.is_empty() {
            bail!("analyzer returned no players");
        }
        Ok(parsed.players)
    }
}

/// Used when no analyzer endpoint is configured; every analysis is unavailable.
pub struct DisabledAnalyzer;

#[async_trait]
impl Analyzer for DisabledAnalyzer {
    async fn analyze(&self, _transformed: &TransformedMatch) -> Result<Vec<PlayerAnalysis>> {
        bail!("no analyzer configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn transformed() -> TransformedMatch {
        match_pipeline::transform(
            &match_pipeline::MatchSummary {
                match_id:      "M".into(),
                duration_secs: 600,
                game_mode:     "CLASSIC".into(),
                participants:  vec![match_pipeline::ParticipantRecord { puuid: "p".into(), ..Default::default() }],
            },
            "p",
            None,
        )
        .unwrap()
    }

    /// Answers one request with `status` and `body`, returns the endpoint url.
    async fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/analyze", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 4096];
            // headers, then whatever body bytes Content-Length announces
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&req).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let wanted = text
                        .lines()
                        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if req.len() >= end + 4 + wanted {
                        break;
                    }
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        });
        url
    }

    #[tokio::test]
    async fn non_ascii_error_body_becomes_an_error() {
        let body = format!("xxxxx{}", "Phân tích ".repeat(40));
        let url = serve_once("500 Internal Server Error", body).await;
        let err = HttpAnalyzer::new(url, Duration::from_secs(5)).analyze(&transformed()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("analyzer HTTP 500"));
        assert!(msg.contains("Phân tích"));
    }

    #[tokio::test]
    async fn non_ascii_garbage_body_becomes_an_error() {
        let url = serve_once("200 OK", "Phân tích ".repeat(40)).await;
        let err = HttpAnalyzer::new(url, Duration::from_secs(5)).analyze(&transformed()).await.unwrap_err();
        assert!(format!("{err:#}").contains("analyzer body: Phân tích"));
    }

    #[test]
    fn response_reads_players_array() {
        let parsed: AnalyzerResponse = serde_json::from_str(
            r#"{"players":[{"champion":"Zoe","player_name":"Alpha","score":8.5,"highlight":"early roam"}],"model":"x"}"#,
        )
        .unwrap();
        assert_eq!(parsed.players.len(), 1);
        assert_eq!(parsed.players[0].highlight, "early roam");
    }

    #[tokio::test]
    async fn disabled_analyzer_always_errors() {
        assert!(DisabledAnalyzer.analyze(&transformed()).await.is_err());
    }
}
