use crate::dto::{AccountDto, MatchDto, TimelineDto};
use async_trait::async_trait;
use match_pipeline::{MatchSummary, Timeline};
use match_tracker::{body_snippet, KeyValueStore, MatchApi, TrackerError};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_ACCOUNT_BASE_URL: &str = "https://asia.api.riotgames.com";
pub const DEFAULT_MATCH_BASE_URL: &str = "https://sea.api.riotgames.com";

#[derive(Debug, Clone)]
pub struct RiotConfig {
    pub api_key:          String,
    pub account_base_url: String,
    pub match_base_url:   String,
    pub timeout:          Duration,
}

impl RiotConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key:          api_key.into(),
            account_base_url: DEFAULT_ACCOUNT_BASE_URL.to_string(),
            match_base_url:   DEFAULT_MATCH_BASE_URL.to_string(),
            timeout:          Duration::from_secs(15),
        }
    }
}

pub struct RiotClient {
    http:         reqwest::Client,
    api_key:      String,
    account_base: String,
    match_base:   String,
    /// PUUID lookups are cached here when present.
    store:        Option<Arc<dyn KeyValueStore>>,
}

impl RiotClient {
    pub fn new(config: RiotConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key:      config.api_key,
            account_base: config.account_base_url,
            match_base:   config.match_base_url,
            store:        None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Recent match ids, newest first.
    pub async fn match_ids(&self, puuid: &str, count: u32) -> Result<Vec<String>, TrackerError> {
        let mut url = endpoint(&self.match_base, &["lol", "match", "v5", "matches", "by-puuid", puuid, "ids"])?;
        url.query_pairs_mut()
            .append_pair("start", "0")
            .append_pair("count", &count.to_string());
        self.get_json(url).await
    }

    /// `Name#Tag` → PUUID.
    pub async fn resolve_puuid(&self, game_name: &str, tag_line: &str) -> Result<String, TrackerError> {
        let cache_key = format!("puuid:{}#{}", game_name.to_lowercase(), tag_line.to_lowercase());
        if let Some(store) = &self.store {
            match store.get(&cache_key).await {
                Ok(Some(cached)) if !cached.is_empty() => {
                    debug!("PUUID cache hit for {game_name}#{tag_line}");
                    return Ok(cached);
                }
                Ok(_) => {}
                Err(e) => warn!("PUUID cache read failed: {e}"),
            }
        }

        let url = endpoint(
            &self.account_base,
            &["riot", "account", "v1", "accounts", "by-riot-id", game_name, tag_line],
        )?;
        let account: AccountDto = self.get_json(url).await?;
        if account.puuid.is_empty() {
            return Err(TrackerError::MalformedUpstreamPayload(format!("empty puuid for {game_name}#{tag_line}")));
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.set(&cache_key, &account.puuid).await {
                warn!("PUUID cache write failed: {e}");
            }
        }
        info!("Resolved {game_name}#{tag_line}");
        Ok(account.puuid)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TrackerError> {
        let resp = self
            .http
            .get(url.clone())
            .header("X-Riot-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| TrackerError::UpstreamUnavailable(format!("{}: {e}", url.path())))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TrackerError::UpstreamUnavailable(format!("{}: {e}", url.path())))?;
        if !status.is_success() {
            return Err(TrackerError::UpstreamUnavailable(format!(
                "{} HTTP {}: {}",
                url.path(),
                status,
                body_snippet(&body, 200)
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| TrackerError::MalformedUpstreamPayload(format!("{}: {e}", url.path())))
    }
}

/// Base URL plus percent-encoded path segments.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, TrackerError> {
    let mut url = Url::parse(base).map_err(|e| TrackerError::UpstreamUnavailable(format!("bad base url {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| TrackerError::UpstreamUnavailable(format!("base url {base} cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl MatchApi for RiotClient {
    async fn latest_match_id(&self, player_id: &str) -> Result<Option<String>, TrackerError> {
        Ok(self.match_ids(player_id, 1).await?.into_iter().next())
    }

    async fn match_details(&self, match_id: &str) -> Result<MatchSummary, TrackerError> {
        let url = endpoint(&self.match_base, &["lol", "match", "v5", "matches", match_id])?;
        let dto: MatchDto = self.get_json(url).await?;
        Ok(dto.into())
    }

    async fn match_timeline(&self, match_id: &str) -> Result<Timeline, TrackerError> {
        let url = endpoint(&self.match_base, &["lol", "match", "v5", "matches", match_id, "timeline"])?;
        let dto: TimelineDto = self.get_json(url).await?;
        Ok(dto.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_tracker::MemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one canned response and hands back the raw request head.
    async fn serve_once(status: &'static str, body: impl Into<String>) -> (String, oneshot::Receiver<String>) {
        let body: String = body.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            tx.send(String::from_utf8_lossy(&head).to_string()).ok();
        });
        (base, rx)
    }

    fn client(base: &str) -> RiotClient {
        RiotClient::new(RiotConfig {
            api_key:          "RGAPI-test".into(),
            account_base_url: base.to_string(),
            match_base_url:   base.to_string(),
            timeout:          Duration::from_secs(5),
        })
    }

    #[test]
    fn endpoint_escapes_riot_ids() {
        let url = endpoint("https://asia.api.riotgames.com", &["riot", "account", "v1", "accounts", "by-riot-id", "Hide on bush", "KR/1"]).unwrap();
        assert_eq!(url.path(), "/riot/account/v1/accounts/by-riot-id/Hide%20on%20bush/KR%2F1");
    }

    #[tokio::test]
    async fn latest_match_sends_token_and_takes_first_id() {
        let (base, head) = serve_once("200 OK", r#"["VN2_9","VN2_8"]"#).await;
        let latest = client(&base).latest_match_id("puuid-1").await.unwrap();
        assert_eq!(latest.as_deref(), Some("VN2_9"));

        let head = head.await.unwrap().to_lowercase();
        assert!(head.starts_with("get /lol/match/v5/matches/by-puuid/puuid-1/ids?start=0&count=1"));
        assert!(head.contains("x-riot-token: rgapi-test"));
    }

    #[tokio::test]
    async fn empty_history_is_none() {
        let (base, _head) = serve_once("200 OK", "[]").await;
        assert_eq!(client(&base).latest_match_id("puuid-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let (base, _head) = serve_once("503 Service Unavailable", r#"{"status":{"message":"busy"}}"#).await;
        let err = client(&base).match_details("VN2_1").await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
    }

    #[tokio::test]
    async fn non_ascii_error_body_is_unavailable() {
        let (base, _head) = serve_once("500 Internal Server Error", format!("xxxxx{}", "Phân tích ".repeat(40))).await;
        let err = client(&base).match_details("VN2_1").await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
        assert!(err.to_string().contains("Phân tích"));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let (base, _head) = serve_once("200 OK", r#"{"metadata": 5}"#).await;
        let err = client(&base).match_details("VN2_1").await.unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[tokio::test]
    async fn resolved_puuid_is_cached() {
        let (base, _head) = serve_once("200 OK", r#"{"puuid":"abc","gameName":"Zoe","tagLine":"VN2"}"#).await;
        let store = Arc::new(MemoryStore::new());
        let riot = client(&base).with_store(store.clone());

        assert_eq!(riot.resolve_puuid("Zoe", "VN2").await.unwrap(), "abc");
        assert_eq!(store.get("puuid:zoe#vn2").await.unwrap().as_deref(), Some("abc"));
        // second lookup never reaches the (now closed) server
        assert_eq!(riot.resolve_puuid("ZOE", "vn2").await.unwrap(), "abc");
    }
}
