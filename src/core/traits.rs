//! Core traits for the transport and its collaborators.
//!
//! [`Transport`] is the uniform contract the session layer drives. The HTTP
//! transport in turn relies on two collaborators it does not implement
//! itself: a [`RequestClient`] that executes HTTP round trips and a
//! [`HandshakeCodec`] that knows the wire shape of the bootstrap exchange.

use std::time::Duration;

use super::config::ProxyConfig;
use super::error::{CodecError, RequestFailure, TransportResult};
use super::types::{BootstrapNonce, Prime, PrimeBuffer, RequestId, TransportTag};

/// One outbound HTTP POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute request URL.
    pub url: String,
    /// Value of the `Content-Type` header.
    pub content_type: &'static str,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Value of the `Content-Length` header.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Result of one HTTP round trip, delivered back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Request this completion belongs to.
    pub id: RequestId,
    /// Response body on success, classified failure otherwise.
    pub outcome: Result<Vec<u8>, RequestFailure>,
}

/// Executes HTTP round trips on behalf of a transport.
///
/// `post` must not block: it registers the request and returns its id. The
/// outcome is later handed to the transport as a [`Completion`], on the same
/// execution context that owns the transport.
pub trait RequestClient {
    /// Start a POST and return its identifier. Ids are never reused.
    fn post(&mut self, request: HttpRequest) -> RequestId;

    /// Abort an in-flight request. No completion is delivered for it.
    fn abort(&mut self, id: RequestId);

    /// Route subsequent requests through `proxy`, or directly when `None`.
    fn set_proxy(&mut self, proxy: Option<ProxyConfig>);

    /// Stop delivering completions to the transport.
    fn detach(&mut self) {}
}

/// Encodes and decodes the synthetic bootstrap exchange.
pub trait HandshakeCodec {
    /// Build the full outbound buffer (framing units included) for the
    /// identity request carrying `nonce`.
    fn encode_request(&self, nonce: &BootstrapNonce) -> PrimeBuffer;

    /// Extract the nonce echoed by the identity reply.
    fn decode_reply(&self, reply: &[Prime]) -> Result<BootstrapNonce, CodecError>;
}

/// Uniform contract every transport presents to the session layer.
pub trait Transport {
    /// Use `proxy` for all subsequent traffic.
    fn set_proxy_override(&mut self, proxy: Option<ProxyConfig>);

    /// Start connecting to `address`.
    ///
    /// `port`, `protocol_secret` and `protocol_dc_id` exist for symmetry with
    /// socket transports; a transport may ignore them.
    fn connect(&mut self, address: &str, port: u16, protocol_secret: &[u8], protocol_dc_id: i16);

    /// Hand one framed buffer to the transport.
    fn send(&mut self, buffer: &[Prime]) -> TransportResult<()>;

    /// Tear the transport down. Idempotent.
    fn disconnect(&mut self);

    /// Whether the transport has verified its endpoint.
    fn is_connected(&self) -> bool;

    /// Handshake round-trip time, zero when not connected.
    fn ping_time(&self) -> Duration;

    /// Whether the layer above must poll for server-initiated data.
    fn uses_idle_probe(&self) -> bool;

    /// Whether an idle poll should be issued right now.
    fn needs_idle_probe(&self) -> bool;

    /// Transport-specific diagnostic code.
    fn debug_state(&self) -> i32;

    /// Transport kind and address family, `Unconnected` until connected.
    fn transport_tag(&self) -> TransportTag;

    /// Transport kind and address family of the configured target.
    fn tag(&self) -> TransportTag;

    /// Drain every buffer received so far, in arrival order.
    fn take_received(&mut self) -> Vec<PrimeBuffer>;
}
