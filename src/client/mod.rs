//! Concrete collaborators of the HTTP transport.
//!
//! - [`ReqPqCodec`]: bootstrap handshake codec
//! - [`HttpClient`]: reqwest request client (requires `client` feature)

mod bootstrap;
#[cfg(feature = "client")]
mod http;

pub use bootstrap::*;
#[cfg(feature = "client")]
pub use http::*;
