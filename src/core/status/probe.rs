use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::core::address::{Edition, ServerQuery};
use crate::core::config::AppConfig;
use crate::core::error::AppResult;
use crate::core::protocol::{bedrock, java};

use super::model::ServerStatus;

/// Run one status query.
///
/// With `Edition::Unknown` both clients run side by side: a Java answer wins
/// and drops the Bedrock probe, otherwise a Bedrock answer is used, otherwise
/// the Java error is reported.
#[instrument(skip(config), fields(host = %query.host, edition = %query.edition))]
pub async fn probe(config: &AppConfig, query: &ServerQuery) -> AppResult<ServerStatus> {
    let status = match query.edition {
        Edition::Java => probe_java(config, query).await?,
        Edition::Bedrock => probe_bedrock(config, query).await?,
        Edition::Unknown => probe_any(config, query).await?,
    };

    info!(
        "{} answered as {} in {}ms ({}/{} players)",
        query.host, status.edition, status.latency_ms, status.player_count, status.max_players
    );
    Ok(status)
}

async fn probe_java(config: &AppConfig, query: &ServerQuery) -> AppResult<ServerStatus> {
    let raw = java::query(&query.host, query.java_port(), &config.java).await?;
    Ok(raw.into())
}

async fn probe_bedrock(config: &AppConfig, query: &ServerQuery) -> AppResult<ServerStatus> {
    let raw = bedrock::query(&query.host, query.bedrock_port(), &config.bedrock).await?;
    Ok(raw.into())
}

async fn probe_any(config: &AppConfig, query: &ServerQuery) -> AppResult<ServerStatus> {
    let bedrock_handle = {
        let host = query.host.clone();
        let port = query.bedrock_port();
        let bedrock_config = config.bedrock.clone();
        tokio::spawn(async move { bedrock::query(&host, port, &bedrock_config).await })
    };

    match probe_java(config, query).await {
        Ok(status) => {
            bedrock_handle.abort();
            Ok(status)
        }
        Err(java_err) => {
            debug!("Java probe of {} failed ({}), waiting for Bedrock", query.host, java_err);
            match bedrock_handle.await {
                Ok(Ok(raw)) => Ok(raw.into()),
                Ok(Err(bedrock_err)) => {
                    debug!("Bedrock probe of {} failed: {}", query.host, bedrock_err);
                    Err(java_err)
                }
                Err(join_err) => {
                    warn!("Bedrock probe task for {} died: {}", query.host, join_err);
                    Err(java_err)
                }
            }
        }
    }
}

/// Parse and probe every address concurrently. Results come back in input
/// order; one address failing never affects the others.
pub async fn probe_many(
    config: &AppConfig,
    addresses: Vec<String>,
) -> Vec<(String, AppResult<ServerStatus>)> {
    info!(
        "Probing {} servers, concurrency={}",
        addresses.len(),
        config.batch_concurrency()
    );

    stream::iter(addresses)
        .map(|address| async move {
            let result = match ServerQuery::parse(&address, None, Edition::Unknown) {
                Ok(query) => probe(config, &query).await,
                Err(e) => Err(e),
            };
            (address, result)
        })
        .buffered(config.batch_concurrency())
        .collect()
        .await
}

/// Keep only the successful statuses of a batch, logging the failures.
pub fn successful(results: Vec<(String, AppResult<ServerStatus>)>) -> Vec<ServerStatus> {
    results
        .into_iter()
        .filter_map(|(address, result)| match result {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Failed to fetch {}: {}", address, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, UdpSocket};

    use super::*;
    use crate::core::error::AppError;
    use crate::core::protocol::bedrock::OFFLINE_MAGIC;
    use crate::core::protocol::packet::{PacketReader, PacketWriter};

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.java.connect_timeout_ms = 200;
        config.java.exchange_timeout_ms = 400;
        config.java.measure_ping = false;
        config.bedrock.response_timeout_ms = 100;
        config
    }

    /// Java server answering every connection with the same status.
    async fn java_server(motd: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    PacketReader::read_frame(&mut socket).await.unwrap();
                    PacketReader::read_frame(&mut socket).await.unwrap();
                    let json = serde_json::json!({"description": motd}).to_string();
                    let frame = PacketWriter::new(0x00).string(&json).frame();
                    socket.write_all(&frame).await.unwrap();
                });
            }
        });
        addr
    }

    /// Bedrock server bound to `port` on loopback.
    async fn bedrock_server(port: u16) {
        let socket = UdpSocket::bind(("127.0.0.1", port)).await.unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            while let Ok((_, peer)) = socket.recv_from(&mut buf).await {
                let payload = b"MCPE;Bedrock World;712;1.21.20;1;10";
                let mut pong = vec![0x1C];
                pong.extend_from_slice(&buf[1..9]);
                pong.extend_from_slice(&[0u8; 8]);
                pong.extend_from_slice(&OFFLINE_MAGIC);
                pong.extend_from_slice(&(payload.len() as u16).to_be_bytes());
                pong.extend_from_slice(payload);
                let _ = socket.send_to(&pong, peer).await;
            }
        });
    }

    fn closed_tcp_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn explicit_java_edition() {
        let addr = java_server("hi").await;
        let query = ServerQuery::parse(&addr.to_string(), None, Edition::Java).unwrap();
        let status = probe(&fast_config(), &query).await.unwrap();
        assert_eq!(status.edition, Edition::Java);
        assert_eq!(status.motd, "hi");
    }

    #[tokio::test]
    async fn unknown_edition_prefers_java() {
        let addr = java_server("java wins").await;
        bedrock_server(addr.port()).await;
        let query = ServerQuery::parse(&addr.to_string(), None, Edition::Unknown).unwrap();
        let status = probe(&fast_config(), &query).await.unwrap();
        assert_eq!(status.edition, Edition::Java);
    }

    #[tokio::test]
    async fn unknown_edition_falls_back_to_bedrock() {
        let port = closed_tcp_port();
        bedrock_server(port).await;
        let query = ServerQuery::parse("127.0.0.1", Some(port), Edition::Unknown).unwrap();
        let status = probe(&fast_config(), &query).await.unwrap();
        assert_eq!(status.edition, Edition::Bedrock);
        assert_eq!(status.name, "Bedrock World");
    }

    #[tokio::test]
    async fn unknown_edition_reports_java_error() {
        let port = closed_tcp_port();
        let query = ServerQuery::parse("127.0.0.1", Some(port), Edition::Unknown).unwrap();
        let err = probe(&fast_config(), &query).await.unwrap_err();
        assert!(matches!(err, AppError::ConnectionRefused { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn batch_isolates_failures_and_keeps_order() {
        let first = java_server("first").await;
        let second = java_server("second").await;
        let dead = closed_tcp_port();

        let addresses = vec![
            first.to_string(),
            format!("127.0.0.1:{dead}"),
            String::new(),
            second.to_string(),
        ];
        let results = probe_many(&fast_config(), addresses.clone()).await;

        assert_eq!(results.len(), 4);
        for ((address, _), expected) in results.iter().zip(&addresses) {
            assert_eq!(address, expected);
        }
        assert!(matches!(results[2].1, Err(AppError::InvalidAddress(_))));

        let statuses = successful(results);
        let motds: Vec<_> = statuses.iter().map(|s| s.motd.as_str()).collect();
        assert_eq!(motds, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn batch_timeout_is_bounded() {
        let config = fast_config();
        let started = std::time::Instant::now();
        let results = probe_many(&config, vec!["no-such-host.invalid".into()]).await;
        assert!(results[0].1.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
