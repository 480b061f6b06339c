//! Notifications from a transport to the session layer.

/// Event delivered to the owner of a transport.
///
/// Events of one transport are delivered in order, one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake succeeded; the transport is ready for traffic.
    Connected,
    /// At least one buffer was added to the received queue.
    DataAvailable,
    /// A failure the layer above should act on.
    Error(i32),
}
