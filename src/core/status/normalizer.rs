// Pure mapping from either client's raw answer into `ServerStatus`.
// Server input is untrusted: negative counts clamp to zero.

use crate::core::address::Edition;
use crate::core::protocol::{BedrockStatus, JavaStatus};
use crate::core::text::strip_formatting;

use super::model::{Favicon, ServerStatus};

fn clamp_count(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

fn latency_ms(latency: std::time::Duration) -> u64 {
    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)
}

impl From<JavaStatus> for ServerStatus {
    fn from(status: JavaStatus) -> Self {
        let JavaStatus {
            host,
            response,
            latency,
        } = status;

        let favicon = response.favicon.as_deref().and_then(|raw| {
            let decoded = Favicon::from_data_uri(raw);
            if decoded.is_none() {
                tracing::debug!("Dropping invalid favicon from {}", host);
            }
            decoded
        });

        Self {
            name: host,
            motd: response
                .description
                .map(|description| description.to_legacy())
                .unwrap_or_default(),
            version: response.version.name,
            player_count: clamp_count(response.players.online),
            max_players: clamp_count(response.players.max),
            player_sample: response
                .players
                .sample
                .into_iter()
                .map(|player| player.name)
                .filter(|name| !name.is_empty())
                .collect(),
            favicon,
            latency_ms: latency_ms(latency),
            online: true,
            edition: Edition::Java,
        }
    }
}

impl From<BedrockStatus> for ServerStatus {
    fn from(status: BedrockStatus) -> Self {
        let BedrockStatus {
            host,
            pong,
            latency,
        } = status;

        let name = match strip_formatting(&pong.motd).trim() {
            "" => host,
            plain => plain.to_string(),
        };
        let motd = if pong.sub_motd.is_empty() {
            pong.motd
        } else {
            format!("{}\n{}", pong.motd, pong.sub_motd)
        };

        Self {
            name,
            motd,
            version: pong.version_name,
            player_count: clamp_count(pong.player_count),
            max_players: clamp_count(pong.max_players),
            player_sample: Vec::new(),
            favicon: None,
            latency_ms: latency_ms(latency),
            online: true,
            edition: Edition::Bedrock,
        }
    }
}
