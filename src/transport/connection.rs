//! HTTP transport connection.
//!
//! Presents a stream of independent HTTP round trips to the session layer as
//! one logical connection.
//!
//! # State Machine
//!
//! ```text
//! ┌───────────────────┐  handshake reply   ┌───────┐
//! │ AwaitingHandshake │───────────────────>│ Ready │
//! └───────────────────┘   (nonce match)    └───────┘
//!           │                                  │
//!           │ disconnect                       │ disconnect
//!           ↓                                  ↓
//!      ┌──────────┐                       ┌──────────┐
//!      │ Finished │                       │ Finished │
//!      └──────────┘                       └──────────┘
//! ```
//!
//! Every outbound buffer becomes one POST. Replies complete in any order and
//! are fed back through [`HttpConnection::handle_completion`] by whoever owns
//! the connection. The owner must deliver completions one at a time; the
//! connection itself holds no locks.
//!
//! Cancellation works by forgetting: [`Transport::disconnect`] aborts and
//! clears the pending set, so a completion racing with it finds no matching
//! id and is dropped.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use rand::{CryptoRng, RngCore};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::address::TargetAddress;
use super::event::TransportEvent;
use super::response::{DecodedResponse, decode_response};
use crate::core::constants::{
    CONTENT_TYPE, DEBUG_STATE_SENTINEL, ERROR_CODE_OTHER, FRAMING_PRIMES, MIN_OUTBOUND_PRIMES,
    PRIME_SIZE,
};
use crate::core::{
    BootstrapNonce, CodecError, Completion, FailureKind, HandshakeCodec, HttpRequest, Prime,
    PrimeBuffer, ProxyConfig, RequestClient, RequestFailure, RequestId, Transport,
    TransportError, TransportResult, TransportTag, hex_preview, primes_to_bytes,
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Waiting for the bootstrap reply.
    AwaitingHandshake,
    /// Endpoint verified, data flows.
    Ready,
    /// Disconnected. Terminal.
    Finished,
}

/// HTTP transport connection.
///
/// Generic over the [`RequestClient`] executing round trips and the
/// [`HandshakeCodec`] shaping the bootstrap exchange.
#[derive(Debug)]
pub struct HttpConnection<C, P> {
    client: C,
    codec: P,
    status: ConnectionStatus,
    /// Fixed for the lifetime of the connection.
    nonce: BootstrapNonce,
    address: TargetAddress,
    /// Round trips issued and neither completed nor aborted.
    requests: HashSet<RequestId>,
    /// Decoded replies in arrival order.
    received: VecDeque<PrimeBuffer>,
    /// Set when the handshake is sent.
    handshake_sent_at: Option<Instant>,
    ping_time: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl<C: RequestClient, P: HandshakeCodec> HttpConnection<C, P> {
    /// Create a connection awaiting its handshake.
    ///
    /// The bootstrap nonce is drawn from `rng`. Events are delivered on the
    /// returned receiver.
    pub fn new<R>(client: C, codec: P, rng: &mut R) -> (Self, mpsc::UnboundedReceiver<TransportEvent>)
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let (events, events_rx) = mpsc::unbounded_channel();
        let connection = Self {
            client,
            codec,
            status: ConnectionStatus::AwaitingHandshake,
            nonce: BootstrapNonce::generate(rng),
            address: TargetAddress::default(),
            requests: HashSet::new(),
            received: VecDeque::new(),
            handshake_sent_at: None,
            ping_time: Duration::ZERO,
            events,
        };
        (connection, events_rx)
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Nonce the handshake reply must echo.
    pub fn nonce(&self) -> &BootstrapNonce {
        &self.nonce
    }

    /// Target recorded by `connect`.
    pub fn address(&self) -> &TargetAddress {
        &self.address
    }

    /// Number of round trips in flight.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Whether `id` is still in flight.
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.requests.contains(&id)
    }

    /// Shared access to the request client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Exclusive access to the request client.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Pop the oldest received buffer.
    pub fn pop_received(&mut self) -> Option<PrimeBuffer> {
        self.received.pop_front()
    }

    /// Dispatch one completion from the request client.
    pub fn handle_completion(&mut self, completion: Completion) {
        match completion.outcome {
            Ok(body) => self.on_request_succeeded(completion.id, &body),
            Err(failure) => self.on_request_failed(completion.id, &failure),
        }
    }

    /// A round trip returned a response body.
    pub fn on_request_succeeded(&mut self, id: RequestId, body: &[u8]) {
        if self.status == ConnectionStatus::Finished {
            return;
        }
        if !self.requests.remove(&id) {
            trace!(error = %TransportError::StaleCompletion(id), "HTTP Info: ignoring completion");
            return;
        }

        trace!(id = id.get(), len = body.len(), "HTTP Info: read response");
        let data = match decode_response(body) {
            DecodedResponse::Empty => return,
            DecodedResponse::Malformed { len } => {
                let error = TransportError::MalformedResponse { len };
                warn!(%error, "HTTP Error: bad response size");
                self.emit(TransportEvent::Error(error.code()));
                return;
            },
            DecodedResponse::Data(data) => data,
        };

        match self.status {
            ConnectionStatus::Ready => {
                self.received.push_back(data);
                self.emit(TransportEvent::DataAvailable);
            },
            ConnectionStatus::AwaitingHandshake => self.handle_handshake_reply(&data),
            ConnectionStatus::Finished => {},
        }
    }

    /// A round trip failed.
    pub fn on_request_failed(&mut self, id: RequestId, failure: &RequestFailure) {
        if self.status == ConnectionStatus::Finished {
            return;
        }
        if !self.requests.remove(&id) {
            trace!(error = %TransportError::StaleCompletion(id), "HTTP Info: ignoring failure");
            return;
        }

        let code = self.classify(failure);
        self.emit(TransportEvent::Error(code));
    }

    fn handle_handshake_reply(&mut self, data: &[Prime]) {
        let verified = self.codec.decode_reply(data).and_then(|nonce| {
            if nonce == self.nonce {
                Ok(())
            } else {
                Err(CodecError::NonceMismatch)
            }
        });

        match verified {
            Ok(()) => {
                self.status = ConnectionStatus::Ready;
                self.ping_time = self
                    .handshake_sent_at
                    .map(|sent| sent.elapsed())
                    .unwrap_or_default();
                debug!(
                    address = self.address.host(),
                    ping_ms = self.ping_time.as_millis() as u64,
                    "Connection Info: HTTP transport connected by handshake reply"
                );
                self.emit(TransportEvent::Connected);
            },
            Err(codec_error) => {
                let error = TransportError::Handshake(codec_error);
                debug!(%error, "Connection Error: bad HTTP handshake reply");
                self.emit(TransportEvent::Error(error.code()));
            },
        }
    }

    /// Map a failure to the code reported upward, logging its category.
    fn classify(&self, failure: &RequestFailure) -> i32 {
        let detail = &failure.message;
        match failure.kind {
            FailureKind::ConnectionRefused => warn!(%detail, "HTTP Error: connection refused"),
            FailureKind::RemoteHostClosed => warn!(%detail, "HTTP Error: remote host closed"),
            FailureKind::HostNotFound => warn!(%detail, "HTTP Error: host not found"),
            FailureKind::Timeout => warn!(%detail, "HTTP Error: timeout"),
            FailureKind::Cancelled => warn!(%detail, "HTTP Error: cancelled"),
            FailureKind::Unreachable | FailureKind::Network => {
                warn!(kind = %failure.kind, %detail, "HTTP Error: network error")
            },
            FailureKind::Proxy => warn!(%detail, "HTTP Error: proxy error"),
            FailureKind::Content => {
                warn!(status = ?failure.status, %detail, "HTTP Error: content error")
            },
            FailureKind::Protocol => warn!(%detail, "HTTP Error: protocol error"),
        }

        let code = TransportError::Request(failure.clone()).code();
        debug!(code, tag = %self.tag(), "HTTP Error: request failed");
        code
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            trace!(?event, "HTTP Info: event receiver dropped");
        }
    }
}

impl<C: RequestClient, P: HandshakeCodec> Transport for HttpConnection<C, P> {
    fn set_proxy_override(&mut self, proxy: Option<ProxyConfig>) {
        self.client.set_proxy(proxy);
    }

    fn connect(&mut self, address: &str, _port: u16, _protocol_secret: &[u8], _protocol_dc_id: i16) {
        if self.status == ConnectionStatus::Finished {
            return;
        }

        self.address = TargetAddress::new(address);
        debug!(url = %self.address.url(), "HTTP Info: address set");

        let buffer = self.codec.encode_request(&self.nonce);
        debug!(
            address,
            "Connection Info: sending handshake request through HTTP transport"
        );

        self.handshake_sent_at = Some(Instant::now());
        if let Err(error) = self.send(&buffer) {
            warn!(%error, "Connection Error: handshake request not sent");
        }
    }

    fn send(&mut self, buffer: &[Prime]) -> TransportResult<()> {
        if self.status == ConnectionStatus::Finished {
            return Ok(());
        }

        if buffer.len() < MIN_OUTBOUND_PRIMES {
            let error = TransportError::Framing {
                len: buffer.len() * PRIME_SIZE,
            };
            warn!(%error, "HTTP Error: writing bad packet");
            trace!(packet = %hex_preview(&primes_to_bytes(buffer)), "HTTP Error: bad packet");
            self.emit(TransportEvent::Error(ERROR_CODE_OTHER));
            return Err(error);
        }

        let request = HttpRequest {
            url: self.address.url(),
            content_type: CONTENT_TYPE,
            body: primes_to_bytes(&buffer[FRAMING_PRIMES..]),
        };
        trace!(
            len = request.content_length(),
            body = %hex_preview(&request.body),
            "HTTP Info: sending request"
        );

        let id = self.client.post(request);
        self.requests.insert(id);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.status == ConnectionStatus::Finished {
            return;
        }
        self.status = ConnectionStatus::Finished;

        for id in self.requests.drain() {
            self.client.abort(id);
        }
        self.client.detach();
        debug!(address = self.address.host(), "HTTP Info: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Ready
    }

    fn ping_time(&self) -> Duration {
        if self.is_connected() {
            self.ping_time
        } else {
            Duration::ZERO
        }
    }

    fn uses_idle_probe(&self) -> bool {
        true
    }

    fn needs_idle_probe(&self) -> bool {
        self.requests.is_empty()
    }

    fn debug_state(&self) -> i32 {
        DEBUG_STATE_SENTINEL
    }

    fn transport_tag(&self) -> TransportTag {
        if self.is_connected() {
            self.tag()
        } else {
            TransportTag::Unconnected
        }
    }

    fn tag(&self) -> TransportTag {
        TransportTag::Http(self.address.family())
    }

    fn take_received(&mut self) -> Vec<PrimeBuffer> {
        self.received.drain(..).collect()
    }
}
