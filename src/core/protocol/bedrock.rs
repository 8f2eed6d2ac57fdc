// ─── Bedrock Edition Status ───
// RakNet "unconnected ping" / "unconnected pong" over one UDP socket.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::core::config::BedrockProbeConfig;
use crate::core::error::{AppError, AppResult};

const UNCONNECTED_PING_ID: u8 = 0x01;
const UNCONNECTED_PONG_ID: u8 = 0x1C;

/// RakNet offline message marker.
pub const OFFLINE_MAGIC: [u8; 16] = [
    0x00, 0xFF, 0xFF, 0x00, 0xFE, 0xFE, 0xFE, 0xFE, 0xFD, 0xFD, 0xFD, 0xFD, 0x12, 0x34, 0x56, 0x78,
];

/// id + time + server guid + magic + string length
const PONG_HEADER_LEN: usize = 1 + 8 + 8 + OFFLINE_MAGIC.len() + 2;
const MAX_DATAGRAM_LEN: usize = 2048;

/// Fields of the `;`-separated pong payload. Servers are free to leave out
/// trailing fields; missing ones are empty or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BedrockPong {
    /// `MCPE` or `MCEE`.
    pub edition: String,
    pub motd: String,
    pub protocol_version: i64,
    pub version_name: String,
    pub player_count: i64,
    pub max_players: i64,
    pub server_id: String,
    pub sub_motd: String,
    pub game_mode: String,
    pub game_mode_numeric: i64,
    pub port_v4: u16,
    pub port_v6: u16,
}

/// Raw outcome of a successful Bedrock status query.
#[derive(Debug, Clone)]
pub struct BedrockStatus {
    pub host: String,
    pub pong: BedrockPong,
    pub latency: Duration,
}

/// Query a Bedrock Edition server, retrying the ping once per extra
/// configured attempt before giving up with `Timeout`.
#[instrument(skip(config), level = "debug")]
pub async fn query(host: &str, port: u16, config: &BedrockProbeConfig) -> AppResult<BedrockStatus> {
    let started = Instant::now();
    let addr = resolve(host, port, config.response_timeout()).await?;

    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local)
        .await
        .map_err(|e| AppError::Other(format!("cannot bind UDP socket: {e}")))?;
    socket
        .connect(addr)
        .await
        .map_err(|e| refused(host, port, e))?;

    let client_guid: i64 = rand::random();
    let attempts = config.attempts();

    for attempt in 1..=attempts {
        let ping_time = started.elapsed().as_millis() as i64;
        let ping = unconnected_ping(ping_time, client_guid);
        let sent = Instant::now();
        socket
            .send(&ping)
            .await
            .map_err(|e| refused(host, port, e))?;

        let pong = receive_pong(&socket, host, port, ping_time);
        match tokio::time::timeout(config.response_timeout(), pong).await {
            Ok(Ok(pong)) => {
                return Ok(BedrockStatus {
                    host: host.to_string(),
                    pong,
                    latency: sent.elapsed(),
                })
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => debug!("No pong from {} (attempt {}/{})", addr, attempt, attempts),
        }
    }

    Err(AppError::Timeout {
        stage: "unconnected ping",
        elapsed: started.elapsed(),
    })
}

async fn resolve(host: &str, port: u16, timeout: Duration) -> AppResult<SocketAddr> {
    let started = Instant::now();
    match tokio::time::timeout(timeout, lookup_host((host, port))).await {
        Ok(Ok(mut addrs)) => addrs.next().ok_or_else(|| AppError::DnsResolutionFailed {
            host: host.to_string(),
        }),
        Ok(Err(e)) => {
            debug!("DNS lookup for {} failed: {}", host, e);
            Err(AppError::DnsResolutionFailed {
                host: host.to_string(),
            })
        }
        Err(_) => Err(AppError::Timeout {
            stage: "dns lookup",
            elapsed: started.elapsed(),
        }),
    }
}

fn refused(host: &str, port: u16, e: std::io::Error) -> AppError {
    AppError::ConnectionRefused {
        address: format!("{host}:{port}"),
        reason: e.to_string(),
    }
}

/// Wait for the pong answering the ping sent at `ping_time`, skipping
/// unrelated datagrams and late answers to earlier attempts.
async fn receive_pong(
    socket: &UdpSocket,
    host: &str,
    port: u16,
    ping_time: i64,
) -> AppResult<BedrockPong> {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    loop {
        let len = socket.recv(&mut buf).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::ConnectionRefused => refused(host, port, e),
            _ => AppError::protocol(format!("receive failed: {e}")),
        })?;

        let datagram = &buf[..len];
        if datagram.first() != Some(&UNCONNECTED_PONG_ID) {
            debug!("Ignoring {} byte datagram that is not a pong", len);
            continue;
        }
        if echoed_ping_time(datagram) != Some(ping_time) {
            debug!("Ignoring pong for an earlier ping");
            continue;
        }
        return parse_pong_datagram(datagram);
    }
}

/// Ping time the server copied into bytes 1..9 of its pong.
fn echoed_ping_time(datagram: &[u8]) -> Option<i64> {
    let bytes: [u8; 8] = datagram.get(1..9)?.try_into().ok()?;
    Some(i64::from_be_bytes(bytes))
}

pub fn unconnected_ping(time_ms: i64, client_guid: i64) -> Vec<u8> {
    let mut packet = Vec::with_capacity(1 + 8 + OFFLINE_MAGIC.len() + 8);
    packet.push(UNCONNECTED_PING_ID);
    packet.extend_from_slice(&time_ms.to_be_bytes());
    packet.extend_from_slice(&OFFLINE_MAGIC);
    packet.extend_from_slice(&client_guid.to_be_bytes());
    packet
}

/// Parse a whole pong datagram. The binary header must be intact; a payload
/// shorter than its announced length is taken as-is.
pub fn parse_pong_datagram(datagram: &[u8]) -> AppResult<BedrockPong> {
    if datagram.len() < PONG_HEADER_LEN {
        return Err(AppError::protocol(format!(
            "pong of {} bytes is shorter than its {} byte header",
            datagram.len(),
            PONG_HEADER_LEN
        )));
    }
    if datagram[0] != UNCONNECTED_PONG_ID {
        return Err(AppError::protocol(format!(
            "unexpected packet id {:#04x}",
            datagram[0]
        )));
    }
    if datagram[17..33] != OFFLINE_MAGIC {
        return Err(AppError::protocol("pong is missing the offline magic"));
    }

    let announced = u16::from_be_bytes([datagram[33], datagram[34]]) as usize;
    let payload = &datagram[PONG_HEADER_LEN..];
    let payload = &payload[..announced.min(payload.len())];

    Ok(parse_pong_payload(&String::from_utf8_lossy(payload)))
}

/// Split `edition;motd;protocol;version;players;max;serverId;motd2;gamemode;
/// gamemodeNumeric;portV4;portV6`. Never fails.
pub fn parse_pong_payload(payload: &str) -> BedrockPong {
    let mut fields = payload.split(';');
    let mut text = || fields.next().unwrap_or_default().to_string();

    let edition = text();
    let motd = text();
    let protocol_version = number(&text());
    let version_name = text();
    let player_count = number(&text());
    let max_players = number(&text());
    let server_id = text();
    let sub_motd = text();
    let game_mode = text();
    let game_mode_numeric = number(&text());
    let port_v4 = text().trim().parse().unwrap_or(0);
    let port_v6 = text().trim().parse().unwrap_or(0);

    BedrockPong {
        edition,
        motd,
        protocol_version,
        version_name,
        player_count,
        max_players,
        server_id,
        sub_motd,
        game_mode,
        game_mode_numeric,
        port_v4,
        port_v6,
    }
}

fn number(field: &str) -> i64 {
    field.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAYLOAD: &str = "MCPE;§bDedicated Server;712;1.21.20;3;20;13253860892328930865;Bedrock level;Survival;1;19132;19133;";

    fn pong_datagram(payload: &str) -> Vec<u8> {
        pong_datagram_at(1234, payload)
    }

    fn pong_datagram_at(ping_time: i64, payload: &str) -> Vec<u8> {
        let mut datagram = vec![UNCONNECTED_PONG_ID];
        datagram.extend_from_slice(&ping_time.to_be_bytes());
        datagram.extend_from_slice(&99i64.to_be_bytes());
        datagram.extend_from_slice(&OFFLINE_MAGIC);
        datagram.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        datagram.extend_from_slice(payload.as_bytes());
        datagram
    }

    fn fast_config(attempts: u32) -> BedrockProbeConfig {
        BedrockProbeConfig {
            response_timeout_ms: 150,
            attempts,
        }
    }

    #[test]
    fn ping_layout() {
        let ping = unconnected_ping(5, -2);
        assert_eq!(ping.len(), 33);
        assert_eq!(ping[0], UNCONNECTED_PING_ID);
        assert_eq!(&ping[1..9], &5i64.to_be_bytes());
        assert_eq!(&ping[9..25], &OFFLINE_MAGIC);
        assert_eq!(&ping[25..33], &(-2i64).to_be_bytes());
    }

    #[test]
    fn full_payload() {
        let pong = parse_pong_payload(FULL_PAYLOAD);
        assert_eq!(pong.edition, "MCPE");
        assert_eq!(pong.motd, "§bDedicated Server");
        assert_eq!(pong.protocol_version, 712);
        assert_eq!(pong.version_name, "1.21.20");
        assert_eq!(pong.player_count, 3);
        assert_eq!(pong.max_players, 20);
        assert_eq!(pong.sub_motd, "Bedrock level");
        assert_eq!(pong.game_mode, "Survival");
        assert_eq!(pong.game_mode_numeric, 1);
        assert_eq!(pong.port_v4, 19132);
        assert_eq!(pong.port_v6, 19133);
    }

    #[test]
    fn truncated_payload_defaults_missing_fields() {
        let pong = parse_pong_payload("MCPE;Only a name;448");
        assert_eq!(pong.motd, "Only a name");
        assert_eq!(pong.protocol_version, 448);
        assert_eq!(pong.version_name, "");
        assert_eq!(pong.player_count, 0);
        assert_eq!(pong.port_v6, 0);

        assert_eq!(parse_pong_payload(""), BedrockPong::default());
    }

    #[test]
    fn garbage_numbers_become_zero() {
        let pong = parse_pong_payload("MCPE;x;abc;1.0;-5;lots");
        assert_eq!(pong.protocol_version, 0);
        assert_eq!(pong.player_count, -5);
        assert_eq!(pong.max_players, 0);
    }

    #[test]
    fn datagram_header_is_validated() {
        assert!(matches!(
            parse_pong_datagram(&[UNCONNECTED_PONG_ID, 0, 0]),
            Err(AppError::ProtocolError(_))
        ));

        let mut bad_magic = pong_datagram("MCPE");
        bad_magic[21] = 0;
        assert!(matches!(
            parse_pong_datagram(&bad_magic),
            Err(AppError::ProtocolError(_))
        ));
    }

    #[test]
    fn datagram_with_short_payload_is_accepted() {
        let mut datagram = pong_datagram(FULL_PAYLOAD);
        datagram.truncate(PONG_HEADER_LEN + 12);
        let pong = parse_pong_datagram(&datagram).unwrap();
        assert_eq!(pong.edition, "MCPE");
        assert_eq!(pong.motd, "§bDedi");
        assert_eq!(pong.max_players, 0);
    }

    /// Loopback server that ignores the first `skip` pings.
    async fn fake_server(skip: usize) -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let mut seen = 0;
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                assert_eq!(len, 33);
                assert_eq!(&buf[9..25], &OFFLINE_MAGIC);
                let ping_time = echoed_ping_time(&buf[..len]).unwrap();
                seen += 1;
                if seen <= skip {
                    continue;
                }
                socket
                    .send_to(&[0xFE, 0x00], peer)
                    .await
                    .unwrap();
                socket
                    .send_to(&pong_datagram_at(ping_time, FULL_PAYLOAD), peer)
                    .await
                    .unwrap();
            }
        });
        port
    }

    #[tokio::test]
    async fn query_round_trip() {
        let port = fake_server(0).await;
        let status = query("127.0.0.1", port, &fast_config(2)).await.unwrap();
        assert_eq!(status.pong.version_name, "1.21.20");
        assert!(status.latency < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn retries_once_after_a_lost_ping() {
        let port = fake_server(1).await;
        let started = std::time::Instant::now();
        let status = query("127.0.0.1", port, &fast_config(2)).await.unwrap();
        assert_eq!(status.pong.player_count, 3);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    /// Answers the first ping only once the second arrives, stale answer first.
    async fn late_server() -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, _) = socket.recv_from(&mut buf).await.unwrap();
            let first = echoed_ping_time(&buf[..len]).unwrap();
            let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
            let second = echoed_ping_time(&buf[..len]).unwrap();

            let stale = pong_datagram_at(first, "MCPE;Stale;1;old;99;99");
            socket.send_to(&stale, peer).await.unwrap();
            let fresh = pong_datagram_at(second, FULL_PAYLOAD);
            socket.send_to(&fresh, peer).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn late_pong_from_first_attempt_is_ignored() {
        let port = late_server().await;
        let status = query("127.0.0.1", port, &fast_config(2)).await.unwrap();
        assert_eq!(status.pong.motd, "§bDedicated Server");
        assert_eq!(status.pong.player_count, 3);
    }

    #[tokio::test]
    async fn silent_server_times_out_after_retry() {
        let port = fake_server(usize::MAX).await;
        let started = std::time::Instant::now();
        let err = query("127.0.0.1", port, &fast_config(2)).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }), "{err:?}");
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
