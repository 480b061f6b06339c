//! Core traits, value types, constants and errors.
//!
//! Everything in this module is independent of the HTTP client in use.

pub mod constants;
mod config;
mod error;
mod traits;
mod types;

pub use config::*;
pub use error::*;
pub use traits::*;
pub use types::*;

pub(crate) use types::hex_preview;
