use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Serialize, Serializer};

use crate::core::address::Edition;

/// First eight bytes of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Validated PNG server icon.
///
/// Serialized for the UI as a `data:image/png;base64,...` URI so it can be
/// dropped straight into an `<img>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favicon(Vec<u8>);

impl Favicon {
    /// Accepts raw bytes only if they start with the PNG signature.
    pub fn from_png(bytes: Vec<u8>) -> Option<Self> {
        bytes.starts_with(&PNG_SIGNATURE).then_some(Self(bytes))
    }

    /// Decode the `favicon` field of a Java status response.
    ///
    /// Accepts a full data URI or bare base64; embedded line breaks (sent by
    /// some older servers) are ignored. Anything that does not decode to a PNG
    /// yields `None`.
    pub fn from_data_uri(raw: &str) -> Option<Self> {
        let encoded = match raw.find("base64,") {
            Some(idx) => &raw[idx + "base64,".len()..],
            None => raw,
        };
        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD.decode(cleaned).ok()?;
        Self::from_png(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.0))
    }
}

impl Serialize for Favicon {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.data_uri())
    }
}

/// Unified status of a Java or Bedrock server.
///
/// Built once per query by the normalizer and never mutated afterwards.
/// Player counts are whatever the server reported; they are not checked
/// against `player_sample`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServerStatus {
    pub name: String,
    /// Legacy-coded (`§`) message of the day.
    pub motd: String,
    pub version: String,
    pub player_count: u32,
    pub max_players: u32,
    pub player_sample: Vec<String>,
    pub favicon: Option<Favicon>,
    pub latency_ms: u64,
    pub online: bool,
    pub edition: Edition,
}
