//! Proxy configuration accepted by `set_proxy_override`.

use std::fmt;

/// Kind of proxy server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    /// HTTP CONNECT proxy.
    Http,
    /// SOCKS5 proxy.
    Socks5,
}

impl ProxyKind {
    fn scheme(self) -> &'static str {
        match self {
            ProxyKind::Http => "http",
            ProxyKind::Socks5 => "socks5",
        }
    }
}

/// Proxy every HTTP round trip goes through.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy kind.
    pub kind: ProxyKind,
    /// Proxy host name or address.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Optional user name for proxy authentication.
    pub user: Option<String>,
    /// Optional password for proxy authentication.
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Create an unauthenticated proxy config.
    pub fn new(kind: ProxyKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: host.into(),
            port,
            user: None,
            password: None,
        }
    }

    /// Attach proxy credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Proxy URL without credentials, e.g. `socks5://10.0.0.1:1080`.
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("{}://[{}]:{}", self.kind.scheme(), self.host, self.port)
        } else {
            format!("{}://{}:{}", self.kind.scheme(), self.host, self.port)
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
