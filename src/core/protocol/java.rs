// ─── Java Edition Status ───
// Handshake (next state = status), status request/response, then an
// optional ping/pong to measure latency. One TCP stream per query.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::packet::{PacketReader, PacketWriter};
use crate::core::config::JavaProbeConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::text::ChatComponent;

const HANDSHAKE_ID: u32 = 0x00;
const STATUS_REQUEST_ID: u32 = 0x00;
const STATUS_RESPONSE_ID: u32 = 0x00;
const PING_ID: u32 = 0x01;
const PONG_ID: u32 = 0x01;

/// Protocol version sent when the client does not care which one the
/// server speaks.
const ANY_PROTOCOL_VERSION: i32 = -1;
const NEXT_STATE_STATUS: u32 = 1;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusVersion {
    pub name: String,
    pub protocol: i64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusPlayer {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusPlayers {
    pub max: i64,
    pub online: i64,
    #[serde(deserialize_with = "null_as_empty")]
    pub sample: Vec<StatusPlayer>,
}

/// JSON body of the status response. Only the fields the browser shows.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusResponse {
    pub version: StatusVersion,
    pub players: StatusPlayers,
    pub description: Option<ChatComponent>,
    #[serde(deserialize_with = "string_or_none")]
    pub favicon: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Anything but a JSON string becomes `None`.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(value) => Ok(Some(value)),
        _ => Ok(None),
    }
}

/// Raw outcome of a successful Java status query.
#[derive(Debug, Clone)]
pub struct JavaStatus {
    pub host: String,
    pub response: StatusResponse,
    pub latency: Duration,
}

/// Query a Java Edition server.
///
/// The connect is bounded by `connect_timeout`, the whole exchange by
/// `exchange_timeout` measured from the start of the connect. Once the status
/// has arrived, a failed or late ping only costs the latency measurement. The
/// stream is dropped, and so closed, on every return path.
#[instrument(skip(config), level = "debug")]
pub async fn query(host: &str, port: u16, config: &JavaProbeConfig) -> AppResult<JavaStatus> {
    let started = Instant::now();
    let deadline = started + config.exchange_timeout();

    let mut stream = connect(host, port, config.connect_timeout()).await?;
    debug!("Connected to {}:{} in {:?}", host, port, started.elapsed());

    let exchange = status_exchange(&mut stream, host, port, started);
    let (response, status_latency) = match tokio::time::timeout_at(deadline, exchange).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(AppError::Timeout {
                stage: "status exchange",
                elapsed: started.elapsed(),
            })
        }
    };

    let latency = if config.measure_ping {
        match tokio::time::timeout_at(deadline, ping(&mut stream)).await {
            Ok(Ok(latency)) => latency,
            Ok(Err(e)) => {
                debug!("Ping to {}:{} failed, keeping status latency: {}", host, port, e);
                status_latency
            }
            Err(_) => {
                debug!("Ping to {}:{} timed out, keeping status latency", host, port);
                status_latency
            }
        }
    } else {
        status_latency
    };

    Ok(JavaStatus {
        host: host.to_string(),
        response,
        latency,
    })
}

async fn connect(host: &str, port: u16, timeout: Duration) -> AppResult<TcpStream> {
    connect_with(host, port, timeout, TcpStream::connect::<SocketAddr>).await
}

/// Resolve `host` and try each address with `dial`, all within `timeout`.
async fn connect_with<F, Fut>(
    host: &str,
    port: u16,
    timeout: Duration,
    dial: F,
) -> AppResult<TcpStream>
where
    F: Fn(SocketAddr) -> Fut,
    Fut: Future<Output = std::io::Result<TcpStream>>,
{
    let started = Instant::now();

    let addrs: Vec<SocketAddr> = match tokio::time::timeout(timeout, lookup_host((host, port))).await
    {
        Ok(Ok(addrs)) => addrs.collect(),
        Ok(Err(e)) => {
            debug!("DNS lookup for {} failed: {}", host, e);
            Vec::new()
        }
        Err(_) => {
            return Err(AppError::Timeout {
                stage: "dns lookup",
                elapsed: started.elapsed(),
            })
        }
    };
    if addrs.is_empty() {
        return Err(AppError::DnsResolutionFailed {
            host: host.to_string(),
        });
    }

    let mut last_error = None;
    for addr in addrs {
        let remaining = timeout.saturating_sub(started.elapsed());
        match tokio::time::timeout(remaining, dial(addr)).await {
            Ok(Ok(stream)) => {
                let _ = stream.set_nodelay(true);
                return Ok(stream);
            }
            Ok(Err(e)) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
            Err(_) => break,
        }
    }

    match last_error {
        Some(e) if started.elapsed() < timeout => Err(AppError::ConnectionRefused {
            address: format!("{host}:{port}"),
            reason: e.to_string(),
        }),
        _ => Err(AppError::Timeout {
            stage: "connect",
            elapsed: started.elapsed(),
        }),
    }
}

async fn status_exchange(
    stream: &mut TcpStream,
    host: &str,
    port: u16,
    started: Instant,
) -> AppResult<(StatusResponse, Duration)> {
    let mut outgoing = PacketWriter::new(HANDSHAKE_ID)
        .varint(ANY_PROTOCOL_VERSION as u32)
        .string(host)
        .u16(port)
        .varint(NEXT_STATE_STATUS)
        .frame();
    outgoing.extend(PacketWriter::new(STATUS_REQUEST_ID).frame());
    send(stream, &outgoing).await?;

    let mut packet = PacketReader::read_frame(stream).await?;
    packet.expect_id(STATUS_RESPONSE_ID)?;
    let json = packet.string()?;
    let status_latency = started.elapsed();

    let response: StatusResponse = serde_json::from_str(&json)
        .map_err(|e| AppError::protocol(format!("invalid status JSON: {e}")))?;

    Ok((response, status_latency))
}

/// Round-trip one ping/pong and return its latency.
async fn ping(stream: &mut TcpStream) -> AppResult<Duration> {
    let payload: i64 = rand::random();
    let sent = Instant::now();
    send(stream, &PacketWriter::new(PING_ID).i64(payload).frame()).await?;

    let mut pong = PacketReader::read_frame(stream).await?;
    pong.expect_id(PONG_ID)?;
    let echoed = pong.i64()?;
    if echoed != payload {
        return Err(AppError::protocol(format!(
            "pong payload {echoed} does not match ping {payload}"
        )));
    }

    Ok(sent.elapsed())
}

async fn send(stream: &mut TcpStream, bytes: &[u8]) -> AppResult<()> {
    stream
        .write_all(bytes)
        .await
        .map_err(|e| AppError::protocol(format!("write failed: {e}")))
}
