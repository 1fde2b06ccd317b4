use anyhow::{Context, Result};
use match_tracker::{CycleReport, MatchService, NotificationLedger, SchedulerStatus, TargetRegistry};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone)]
pub struct HealthState {
    pub started_at: String,
    pub registry:   Arc<TargetRegistry>,
    pub service:    Arc<MatchService>,
    pub ledger:     NotificationLedger,
    pub scheduler:  Arc<SchedulerStatus>,
}

#[derive(Serialize)]
struct StateSnapshot {
    started_at:       String,
    tracked_targets:  usize,
    cycles:           u64,
    notified_matches: usize,
    cached_analyses:  usize,
    reply_contexts:   usize,
    last_cycle:       Option<CycleReport>,
}

fn build_state_snapshot(state: &HealthState) -> StateSnapshot {
    StateSnapshot {
        started_at:       state.started_at.clone(),
        tracked_targets:  state.registry.len(),
        cycles:           state.scheduler.cycles(),
        notified_matches: state.ledger.len(),
        cached_analyses:  state.service.cached_analysis_count(),
        reply_contexts:   state.service.contexts().len(),
        last_cycle:       state.scheduler.last_cycle(),
    }
}

#[derive(Serialize)]
struct TargetView {
    name:          String,
    player_id:     String,
    destination:   String,
    last_match_id: Option<String>,
}

fn build_target_views(registry: &TargetRegistry) -> Vec<TargetView> {
    registry
        .snapshot()
        .into_iter()
        .map(|t| TargetView {
            name:          t.name,
            player_id:     t.player_id,
            destination:   t.destination,
            last_match_id: Some(t.last_match_id).filter(|id| !id.is_empty()),
        })
        .collect()
}

async fn handle_http_connection(mut stream: TcpStream, state: HealthState) -> Result<()> {
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await.context("http read")?;
    if n == 0 {
        return Ok(());
    }

    let req = String::from_utf8_lossy(&buf[..n]);
    let first_line = req.lines().next().unwrap_or_default();
    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");

    let (status_line, content_type, body) = match (method, path) {
        ("GET", "/health") => ("HTTP/1.1 200 OK", "text/plain; charset=utf-8", "ok".to_string()),
        ("GET", "/state") => {
            let snap = build_state_snapshot(&state);
            let json = serde_json::to_string_pretty(&snap).unwrap_or_else(|_| "{}".to_string());
            ("HTTP/1.1 200 OK", "application/json; charset=utf-8", json)
        }
        ("GET", "/targets") => {
            let views = build_target_views(&state.registry);
            let json = serde_json::to_string_pretty(&views).unwrap_or_else(|_| "[]".to_string());
            ("HTTP/1.1 200 OK", "application/json; charset=utf-8", json)
        }
        _ => ("HTTP/1.1 404 Not Found", "text/plain; charset=utf-8", "not found".to_string()),
    };

    let resp = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(resp.as_bytes()).await.context("http write")?;
    Ok(())
}

pub async fn start_http_server(bind: SocketAddr, state: HealthState, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(bind).await.context("http bind")?;
    info!("health http listening on http://{} (GET /health, /state, /targets)", bind);
    serve(listener, state, shutdown).await
}

async fn serve(listener: TcpListener, state: HealthState, shutdown: CancellationToken) -> Result<()> {
    loop {
        let (stream, peer) = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted.context("http accept")?,
        };
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_http_connection(stream, state).await {
                debug!("http handler err {}: {}", peer, e);
            }
        });
    }
    info!("health http stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_pipeline::MatchTransformer;
    use match_tracker::{MemoryStore, ReplyContextCache, TrackedTarget};
    use std::time::Duration;

    fn state() -> HealthState {
        let registry = Arc::new(TargetRegistry::new(Arc::new(MemoryStore::new()), "players"));
        registry.track(TrackedTarget::new("p1", "chan", "Alpha"));
        registry.track(TrackedTarget::new("p2", "chan-b", "Beta"));
        registry.update_last_match("p2", "VN2_42");
        let riot = Arc::new(riot_api::RiotClient::new(riot_api::RiotConfig::new("unused")));
        let service = Arc::new(MatchService::new(
            riot,
            Arc::new(crate::analyzer::DisabledAnalyzer),
            MatchTransformer::default(),
            Duration::from_secs(1),
            20,
            Arc::new(ReplyContextCache::new(100, Duration::from_secs(60))),
        ));
        HealthState {
            started_at: "2026-01-01T00:00:00Z".into(),
            registry,
            service,
            ledger: NotificationLedger::new(50),
            scheduler: Arc::new(SchedulerStatus::default()),
        }
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
            .await
            .unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn serves_health_state_and_targets_until_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let server = tokio::spawn(serve(listener, state(), token.clone()));

        let health = get(addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200 OK"));
        assert!(health.ends_with("ok"));

        let snapshot = get(addr, "/state").await;
        assert!(snapshot.contains("\"tracked_targets\": 2"));
        assert!(snapshot.contains("\"last_cycle\": null"));

        let targets = get(addr, "/targets").await;
        assert!(targets.starts_with("HTTP/1.1 200 OK"));
        let body = targets.split("\r\n\r\n").nth(1).unwrap();
        let views: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(views[0]["name"], "Alpha");
        assert_eq!(views[0]["last_match_id"], serde_json::Value::Null);
        assert_eq!(views[1]["destination"], "chan-b");
        assert_eq!(views[1]["last_match_id"], "VN2_42");

        assert!(get(addr, "/nope").await.starts_with("HTTP/1.1 404"));

        token.cancel();
        server.await.unwrap().unwrap();
    }
}
