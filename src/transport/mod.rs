//! HTTP transport.
//!
//! Carries framed protocol buffers over plain HTTP POST round trips. It
//! provides:
//!
//! - **Connection state machine**: [`HttpConnection`] with bootstrap handshake
//!   and pending-request tracking
//! - **Response decoding**: [`decode_response`] re-chunking bodies into units
//! - **Addressing**: [`TargetAddress`] with the forced HTTP port
//! - **Events**: [`TransportEvent`] notifications to the session layer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Session Layer                  │
//! ├─────────────────────────────────────────┤
//! │         HTTP Transport                  │  ← This module
//! │   handshake, pending set, decoding      │
//! ├─────────────────────────────────────────┤
//! │         Request Client                  │
//! ├─────────────────────────────────────────┤
//! │            HTTP / TCP                   │
//! └─────────────────────────────────────────┘
//! ```

mod address;
mod connection;
mod event;
mod response;

pub use address::TargetAddress;
pub use connection::{ConnectionStatus, HttpConnection};
pub use event::TransportEvent;
pub use response::{DecodedResponse, decode_response};
