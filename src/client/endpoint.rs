use crate::types::constants::{DEV_BACKEND_PORT, TOKEN_QUERY_PARAM, WS_NOTIFICATIONS_PATH};
use crate::types::{NotificationError, Result};
use std::net::IpAddr;
use url::Url;

const TUNNEL_SUFFIXES: &[&str] = &[
    ".ngrok.io",
    ".ngrok-free.app",
    ".ngrok.app",
    ".trycloudflare.com",
    ".loca.lt",
    ".devtunnels.ms",
    ".gitpod.io",
    ".github.dev",
];

/// Where the notification socket lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointStrategy {
    /// Full URL; `http(s)` is turned into `ws(s)`, a bare origin gets the
    /// notifications path
    Explicit(String),
    /// Derived from the host the application was served from
    Inferred { host: String, secure: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClass {
    Loopback,
    PrivateNetwork,
    Tunnel,
    Public,
}

pub fn classify_host(host: &str) -> HostClass {
    let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();

    if host == "localhost" || host.ends_with(".localhost") {
        return HostClass::Loopback;
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) if v4.is_loopback() => HostClass::Loopback,
            IpAddr::V4(v4) if v4.is_private() || v4.is_link_local() => HostClass::PrivateNetwork,
            IpAddr::V6(v6) if v6.is_loopback() => HostClass::Loopback,
            _ => HostClass::Public,
        };
    }
    if host.ends_with(".local") {
        return HostClass::PrivateNetwork;
    }
    if TUNNEL_SUFFIXES.iter().any(|suffix| host.ends_with(suffix)) {
        return HostClass::Tunnel;
    }
    HostClass::Public
}

impl EndpointStrategy {
    pub fn explicit(url: impl Into<String>) -> Self {
        Self::Explicit(url.into())
    }

    pub fn inferred(host: impl Into<String>, secure: bool) -> Self {
        Self::Inferred {
            host: host.into(),
            secure,
        }
    }

    /// WebSocket URL without credential
    pub fn resolve(&self) -> Result<Url> {
        match self {
            Self::Explicit(raw) => {
                let mut url = Url::parse(raw)?;
                let scheme = match url.scheme() {
                    "ws" | "http" => "ws",
                    "wss" | "https" => "wss",
                    other => {
                        return Err(NotificationError::Config(format!(
                            "unsupported endpoint scheme: {}",
                            other
                        )));
                    }
                };
                url.set_scheme(scheme).map_err(|()| {
                    NotificationError::Config(format!("cannot use {} as websocket endpoint", raw))
                })?;
                if url.path().is_empty() || url.path() == "/" {
                    url.set_path(WS_NOTIFICATIONS_PATH);
                }
                Ok(url)
            }
            Self::Inferred { host, secure } => {
                if host.is_empty() {
                    return Err(NotificationError::Config("empty host".to_string()));
                }
                let bare = host.trim_start_matches('[').trim_end_matches(']');
                let authority = if bare.parse::<std::net::Ipv6Addr>().is_ok() {
                    format!("[{}]", bare)
                } else {
                    bare.to_string()
                };

                let raw = match classify_host(bare) {
                    HostClass::Loopback | HostClass::PrivateNetwork => format!(
                        "ws://{}:{}{}",
                        authority, DEV_BACKEND_PORT, WS_NOTIFICATIONS_PATH
                    ),
                    HostClass::Tunnel => format!("wss://{}{}", authority, WS_NOTIFICATIONS_PATH),
                    HostClass::Public => format!(
                        "{}://{}{}",
                        if *secure { "wss" } else { "ws" },
                        authority,
                        WS_NOTIFICATIONS_PATH
                    ),
                };
                tracing::debug!("Inferred notification endpoint {} for host {}", raw, host);
                Ok(Url::parse(&raw)?)
            }
        }
    }
}

/// Appends the credential as the `token` query parameter, replacing any previous one
pub fn with_token(endpoint: &Url, token: &str) -> Url {
    let mut url = endpoint.clone();
    let retained: Vec<(String, String)> = endpoint
        .query_pairs()
        .filter(|(key, _)| key != TOKEN_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(TOKEN_QUERY_PARAM, token);
    }
    url
}
