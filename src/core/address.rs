// ─── Address Resolver ───
// Turns whatever the user typed into a host plus an optional port.

use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, AppResult};

/// Default port of a Java Edition server.
pub const JAVA_DEFAULT_PORT: u16 = 25565;
/// Default port of a Bedrock Edition server.
pub const BEDROCK_DEFAULT_PORT: u16 = 19132;

/// Game edition a query targets.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Java,
    Bedrock,
    /// Probe both editions and keep whichever answers.
    #[default]
    Unknown,
}

impl std::fmt::Display for Edition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edition::Java => write!(f, "java"),
            Edition::Bedrock => write!(f, "bedrock"),
            Edition::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of [`normalize`]: a bare host and the port, if one was typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
}

/// One status request. Created per call, never shared between queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerQuery {
    pub host: String,
    pub port: Option<u16>,
    pub edition: Edition,
}

impl ServerQuery {
    /// Build a query from free-form input. An explicit `port` overrides any
    /// port embedded in `input`.
    pub fn parse(input: &str, port: Option<u16>, edition: Edition) -> AppResult<Self> {
        let address = normalize(input)?;
        let port = match port {
            Some(0) => {
                return Err(AppError::InvalidAddress(
                    "port must be between 1 and 65535".into(),
                ))
            }
            Some(explicit) => Some(explicit),
            None => address.port,
        };

        Ok(Self {
            host: address.host,
            port,
            edition,
        })
    }

    pub fn java_port(&self) -> u16 {
        self.port.unwrap_or(JAVA_DEFAULT_PORT)
    }

    pub fn bedrock_port(&self) -> u16 {
        self.port.unwrap_or(BEDROCK_DEFAULT_PORT)
    }
}

/// Normalize a user supplied address.
///
/// - strips a leading scheme (`minecraft://`, `http://`, ...)
/// - drops everything after the first `/`
/// - splits a trailing `:<digits>` into the port
/// - accepts bracketed IPv6 literals (`[::1]:25565`); a bare IPv6 literal
///   keeps all of its colons in the host
pub fn normalize(input: &str) -> AppResult<ServerAddress> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidAddress("address is empty".into()));
    }

    // Only a scheme ahead of the first `/` counts.
    let without_scheme = match trimmed.find("://") {
        Some(idx) if !trimmed[..idx].contains('/') => &trimmed[idx + 3..],
        _ => trimmed,
    };
    let authority = without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .trim();

    let (host, port) = split_host_port(authority)?;
    let host = host.trim();

    if host.is_empty() {
        return Err(AppError::InvalidAddress(format!(
            "no host in {trimmed:?}"
        )));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidAddress(format!(
            "host {host:?} contains whitespace"
        )));
    }

    Ok(ServerAddress {
        host: host.to_string(),
        port,
    })
}

fn split_host_port(authority: &str) -> AppResult<(&str, Option<u16>)> {
    if let Some(rest) = authority.strip_prefix('[') {
        let Some((host, tail)) = rest.split_once(']') else {
            return Err(AppError::InvalidAddress(format!(
                "unterminated IPv6 literal in {authority:?}"
            )));
        };
        return match tail {
            "" => Ok((host, None)),
            _ => match tail.strip_prefix(':') {
                Some(digits) => Ok((host, Some(parse_port(digits)?))),
                None => Err(AppError::InvalidAddress(format!(
                    "unexpected {tail:?} after IPv6 literal"
                ))),
            },
        };
    }

    // More than one colon and no brackets: a bare IPv6 literal.
    if authority.matches(':').count() > 1 {
        return Ok((authority, None));
    }

    match authority.rsplit_once(':') {
        Some((host, digits)) => Ok((host, Some(parse_port(digits)?))),
        None => Ok((authority, None)),
    }
}

fn parse_port(digits: &str) -> AppResult<u16> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::InvalidAddress(format!(
            "port {digits:?} is not a number"
        )));
    }

    match digits.parse::<u32>() {
        Ok(port @ 1..=65535) => Ok(port as u16),
        _ => Err(AppError::InvalidAddress(format!(
            "port {digits} is outside 1-65535"
        ))),
    }
}
