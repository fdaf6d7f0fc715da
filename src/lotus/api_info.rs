//! API Info Parsing
//!
//! Lotus hands out connection strings of the form `TOKEN:/ip4/127.0.0.1/tcp/1234/http`
//! (the `FULLNODE_API_INFO` / `MINER_API_INFO` variables). This module turns them
//! into a WebSocket endpoint for the JSON-RPC `v0` API plus an optional bearer token.

use crate::error::{ExporterError, Result};
use secrecy::SecretString;

/// RPC API version path segment
pub const API_VERSION: &str = "v0";

/// A parsed Lotus API endpoint
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    /// WebSocket URL, e.g. `ws://127.0.0.1:1234/rpc/v0`
    pub url: String,
    /// Bearer token, when the info string carried one
    pub token: Option<SecretString>,
}

impl ApiEndpoint {
    pub fn is_tls(&self) -> bool {
        self.url.starts_with("wss://")
    }
}

/// Parse a `TOKEN:ADDRESS` or bare `ADDRESS` API info string.
pub fn parse_api_info(info: &str) -> Result<ApiEndpoint> {
    let info = info.trim();
    if info.is_empty() {
        return Err(ExporterError::Config("API info is empty".to_string()));
    }

    let (token, address) = match info.split_once(':') {
        Some((token, rest)) if looks_like_jwt(token) => (Some(token), rest),
        _ => (None, info),
    };

    let url = if address.starts_with('/') {
        multiaddr_to_url(address)?
    } else {
        url_to_ws(address)?
    };

    Ok(ApiEndpoint {
        url,
        token: token.map(|t| SecretString::from(t.to_string())),
    })
}

/// Three dot-separated base64url segments; the signature segment may be empty.
fn looks_like_jwt(candidate: &str) -> bool {
    let segments: Vec<&str> = candidate.split('.').collect();
    if segments.len() != 3 {
        return false;
    }
    let token_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    segments[0].chars().all(token_char)
        && !segments[0].is_empty()
        && segments[1].chars().all(token_char)
        && !segments[1].is_empty()
        && segments[2].chars().all(token_char)
}

fn multiaddr_to_url(multiaddr: &str) -> Result<String> {
    let parts: Vec<&str> = multiaddr.trim_start_matches('/').split('/').collect();
    let invalid = || ExporterError::Config(format!("Unsupported multiaddr: {}", multiaddr));

    if parts.len() < 4 || parts[2] != "tcp" {
        return Err(invalid());
    }

    let host = match parts[0] {
        "ip4" | "dns" | "dns4" | "dns6" => parts[1].to_string(),
        "ip6" => format!("[{}]", parts[1]),
        _ => return Err(invalid()),
    };
    let port: u16 = parts[3].parse().map_err(|_| invalid())?;

    let scheme = match parts.get(4).copied() {
        None | Some("http") | Some("ws") => "ws",
        Some("https") | Some("wss") | Some("tls") => "wss",
        Some(_) => return Err(invalid()),
    };

    Ok(format!("{}://{}:{}/rpc/{}", scheme, host, port, API_VERSION))
}

fn url_to_ws(address: &str) -> Result<String> {
    let (scheme, rest) = address
        .split_once("://")
        .ok_or_else(|| ExporterError::Config(format!("Unsupported API address: {}", address)))?;

    let scheme = match scheme {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ExporterError::Config(format!(
                "Unsupported API address scheme: {}",
                other
            )))
        }
    };

    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(ExporterError::Config(format!(
            "API address has no host: {}",
            address
        )));
    }

    if rest.ends_with(&format!("/rpc/{}", API_VERSION)) {
        Ok(format!("{}://{}", scheme, rest))
    } else {
        Ok(format!("{}://{}/rpc/{}", scheme, rest, API_VERSION))
    }
}
