//! Protocol constants for the HTTP transport.
//!
//! These values are fixed by the wire protocol and MUST NOT be changed.

// =============================================================================
// WIRE UNITS
// =============================================================================

/// Size in bytes of one primitive unit on the wire.
pub const PRIME_SIZE: usize = 4;

/// Leading framing units of an outbound buffer that are not sent over HTTP.
pub const FRAMING_PRIMES: usize = 2;

/// Smallest outbound buffer the transport accepts, in primitive units.
pub const MIN_OUTBOUND_PRIMES: usize = 3;

/// Smallest well-formed response body, in bytes.
pub const MIN_RESPONSE_SIZE: usize = 8;

// =============================================================================
// HTTP ENDPOINT
// =============================================================================

/// Port every request is sent to. The endpoint port is never used.
pub const FORCED_HTTP_PORT: u16 = 80;

/// Request path on the remote endpoint.
pub const API_PATH: &str = "/api";

/// Content type advertised on every request. The body is raw binary.
pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// =============================================================================
// ERROR CODES
// =============================================================================

/// Generic error code for failures without a more specific code.
pub const ERROR_CODE_OTHER: i32 = -999;

/// Code carried by the sentinel buffer for a malformed response body.
pub const MALFORMED_RESPONSE_CODE: i32 = -500;

/// Value reported by `debug_state`. Carries no meaning for this transport.
pub const DEBUG_STATE_SENTINEL: i32 = -1;

// =============================================================================
// HANDSHAKE (unencrypted identity request)
// =============================================================================

/// Bootstrap nonce size (128-bit).
pub const NONCE_SIZE: usize = 16;

/// `req_pq` constructor.
pub const REQ_PQ_CONSTRUCTOR: i32 = 0x6046_9778;

/// `resPQ` constructor.
pub const RES_PQ_CONSTRUCTOR: i32 = 0x0516_2463;
