//! Value types shared by every layer of the transport.

use std::fmt;

use rand::{CryptoRng, RngCore};

use super::constants::{NONCE_SIZE, PRIME_SIZE};

/// One primitive wire unit.
pub type Prime = i32;

/// A framed protocol buffer, as exchanged with the session layer.
pub type PrimeBuffer = Vec<Prime>;

/// Serialize units to their little-endian wire bytes.
pub fn primes_to_bytes(primes: &[Prime]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(primes.len() * PRIME_SIZE);
    for prime in primes {
        bytes.extend_from_slice(&prime.to_le_bytes());
    }
    bytes
}

/// Random 128-bit value proving a handshake reply answers our request.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BootstrapNonce([u8; NONCE_SIZE]);

impl BootstrapNonce {
    /// Draw a fresh nonce from a cryptographically secure generator.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap raw nonce bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// The nonce as four wire units.
    pub fn to_primes(&self) -> [Prime; 4] {
        let mut primes = [0; 4];
        for (prime, chunk) in primes.iter_mut().zip(self.0.chunks_exact(PRIME_SIZE)) {
            *prime = Prime::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        primes
    }

    /// Rebuild a nonce from four wire units.
    pub fn from_primes(primes: &[Prime; 4]) -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        for (chunk, prime) in bytes.chunks_exact_mut(PRIME_SIZE).zip(primes) {
            chunk.copy_from_slice(&prime.to_le_bytes());
        }
        Self(bytes)
    }
}

impl fmt::Debug for BootstrapNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BootstrapNonce({})", hex_preview(&self.0))
    }
}

/// Opaque identifier of one HTTP round trip, issued by the request client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Create a request id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request #{}", self.0)
    }
}

/// Address family of the target host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4 literal or host name.
    Ipv4,
    /// IPv6 literal.
    Ipv6,
}

/// Label identifying the transport kind and address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportTag {
    /// No verified connection yet.
    Unconnected,
    /// HTTP transport over the given family.
    Http(AddressFamily),
}

impl fmt::Display for TransportTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportTag::Unconnected => Ok(()),
            TransportTag::Http(AddressFamily::Ipv4) => f.write_str("HTTP/IPv4"),
            TransportTag::Http(AddressFamily::Ipv6) => f.write_str("HTTP/IPv6"),
        }
    }
}

/// Short hex rendering of a byte slice for log lines.
pub(crate) fn hex_preview(bytes: &[u8]) -> String {
    if bytes.len() <= 16 {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    } else {
        format!(
            "{}... ({} bytes)",
            bytes[..16].iter().map(|b| format!("{:02x}", b)).collect::<String>(),
            bytes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_nonce_generate_differs() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = BootstrapNonce::generate(&mut rng);
        let b = BootstrapNonce::generate(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_nonce_primes_are_little_endian() {
        let bytes = hex::decode("0100000002000000030000000400000f").unwrap();
        let nonce = BootstrapNonce::from_bytes(bytes.try_into().unwrap());
        assert_eq!(nonce.to_primes(), [1, 2, 3, 0x0f00_0004]);
        assert_eq!(BootstrapNonce::from_primes(&nonce.to_primes()), nonce);
    }

    #[test]
    fn test_primes_to_bytes() {
        assert_eq!(hex::encode(primes_to_bytes(&[1, -1])), "01000000ffffffff");
    }

    #[test]
    fn test_transport_tag_display() {
        assert_eq!(TransportTag::Unconnected.to_string(), "");
        assert_eq!(TransportTag::Http(AddressFamily::Ipv4).to_string(), "HTTP/IPv4");
        assert_eq!(TransportTag::Http(AddressFamily::Ipv6).to_string(), "HTTP/IPv6");
    }

    #[test]
    fn test_hex_preview_truncates() {
        assert_eq!(hex_preview(&[0xab, 0xcd]), "abcd");
        assert!(hex_preview(&[0u8; 40]).ends_with("(40 bytes)"));
    }
}
