//! Target address handling and request URL construction.

use std::net::Ipv6Addr;

use crate::core::AddressFamily;
use crate::core::constants::{API_PATH, FORCED_HTTP_PORT};

/// Host the transport contacts.
///
/// Always paired with [`FORCED_HTTP_PORT`], whatever port the endpoint
/// advertises.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetAddress {
    host: String,
}

impl TargetAddress {
    /// Wrap a host name or IP literal.
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Host as given to `connect`.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Address family; host names count as IPv4.
    pub fn family(&self) -> AddressFamily {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            AddressFamily::Ipv6
        } else {
            AddressFamily::Ipv4
        }
    }

    /// Request URL, with IPv6 literals bracketed.
    pub fn url(&self) -> String {
        match self.family() {
            AddressFamily::Ipv6 => format!("http://[{}]:{}{}", self.host, FORCED_HTTP_PORT, API_PATH),
            AddressFamily::Ipv4 => format!("http://{}:{}{}", self.host, FORCED_HTTP_PORT, API_PATH),
        }
    }
}
