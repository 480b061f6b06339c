//! # RPC HTTP Transport
//!
//! A pluggable transport that carries the framed buffers of a binary RPC
//! protocol over plain HTTP POST round trips, for networks where direct
//! socket transports are blocked. It provides:
//!
//! - **Uniform contract**: the [`Transport`](crate::core::Transport) trait shared
//!   with socket transports
//! - **Endpoint check**: a synthetic bootstrap handshake that proves the
//!   endpoint speaks the protocol and measures round-trip time
//! - **One logical connection**: any number of concurrent, unordered round
//!   trips tracked by request id
//! - **Small error vocabulary**: every failure collapses to one integer code
//!
//! ## Feature Flags
//!
//! - `client` (default): reqwest-backed [`HttpClient`](crate::client::HttpClient)
//!
//! ## Modules
//!
//! - [`core`](crate::core): Traits, value types, constants and error types
//! - [`transport`]: The HTTP connection state machine
//! - [`client`]: Handshake codec and request client
//!
//! ## Example Usage
//!
//! ```no_run
//! # #[cfg(feature = "client")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use rpc_http_transport::prelude::*;
//!
//! let (client, mut completions) = HttpClient::builder().build()?;
//! let (mut conn, mut events) =
//!     HttpConnection::new(client, ReqPqCodec::new(), &mut rand::rngs::OsRng);
//!
//! conn.connect("149.154.167.51", 443, &[], 2);
//!
//! loop {
//!     tokio::select! {
//!         Some(completion) = completions.recv() => conn.handle_completion(completion),
//!         Some(event) = events.recv() => match event {
//!             TransportEvent::Connected => println!("connected, ping {:?}", conn.ping_time()),
//!             TransportEvent::DataAvailable => {
//!                 for buffer in conn.take_received() {
//!                     println!("received {} units", buffer.len());
//!                 }
//!             },
//!             TransportEvent::Error(code) => {
//!                 conn.disconnect();
//!                 return Err(format!("transport error {code}").into());
//!             },
//!         },
//!         else => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod core;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::client::ReqPqCodec;
    #[cfg(feature = "client")]
    pub use crate::client::{Completions, HttpClient, HttpClientBuilder};

    pub use crate::transport::{
        ConnectionStatus, DecodedResponse, HttpConnection, TargetAddress, TransportEvent,
        decode_response,
    };
}

pub use crate::core::{RequestClient, Transport, TransportError, TransportResult};
pub use crate::transport::{ConnectionStatus, HttpConnection, TransportEvent};
