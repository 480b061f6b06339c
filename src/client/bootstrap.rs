//! Bootstrap handshake codec.
//!
//! The HTTP transport proves its endpoint by sending an unencrypted `req_pq`
//! identity request and checking that the `resPQ` reply echoes our nonce.
//! Captive portals and other intermediaries cannot produce that echo.
//!
//! Unencrypted message layout, in units:
//!
//! ```text
//! ┌──────────────┬──────────────┬────────┬─────────────┬───────────┐
//! │ auth_key_id  │  message_id  │ length │ constructor │   body    │
//! │   2 (zero)   │      2       │   1    │      1      │    ...    │
//! └──────────────┴──────────────┴────────┴─────────────┴───────────┘
//! ```
//!
//! Outbound buffers carry two extra leading framing units which the
//! transport strips before the bytes hit the wire.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::constants::{
    FRAMING_PRIMES, NONCE_SIZE, PRIME_SIZE, REQ_PQ_CONSTRUCTOR, RES_PQ_CONSTRUCTOR,
};
use crate::core::{BootstrapNonce, CodecError, HandshakeCodec, Prime, PrimeBuffer};

/// Units before the constructor: auth key id, message id, length.
const HEADER_PRIMES: usize = 5;

/// Units of a nonce.
const NONCE_PRIMES: usize = NONCE_SIZE / PRIME_SIZE;

/// Smallest reply that can carry the echoed nonce.
const MIN_REPLY_PRIMES: usize = HEADER_PRIMES + 1 + NONCE_PRIMES;

/// Codec for the unencrypted `req_pq` / `resPQ` exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqPqCodec;

impl ReqPqCodec {
    /// Create the codec.
    pub fn new() -> Self {
        Self
    }

    /// Build a minimal `resPQ` reply body, as a server would send it.
    ///
    /// The result is what arrives in an HTTP response: no framing units.
    pub fn encode_reply(nonce: &BootstrapNonce, server_nonce: &BootstrapNonce) -> PrimeBuffer {
        let body_len = (1 + 2 * NONCE_PRIMES) * PRIME_SIZE;
        let mut reply = Vec::with_capacity(HEADER_PRIMES + 1 + 2 * NONCE_PRIMES);
        reply.extend_from_slice(&[0, 0]);
        push_message_id(&mut reply, message_id(SystemTime::now()) | 1);
        reply.push(body_len as Prime);
        reply.push(RES_PQ_CONSTRUCTOR);
        reply.extend_from_slice(&nonce.to_primes());
        reply.extend_from_slice(&server_nonce.to_primes());
        reply
    }
}

impl HandshakeCodec for ReqPqCodec {
    fn encode_request(&self, nonce: &BootstrapNonce) -> PrimeBuffer {
        let body_len = (1 + NONCE_PRIMES) * PRIME_SIZE;
        let mut buffer = Vec::with_capacity(FRAMING_PRIMES + HEADER_PRIMES + 1 + NONCE_PRIMES);
        buffer.extend_from_slice(&[0; FRAMING_PRIMES]);
        buffer.extend_from_slice(&[0, 0]);
        push_message_id(&mut buffer, message_id(SystemTime::now()));
        buffer.push(body_len as Prime);
        buffer.push(REQ_PQ_CONSTRUCTOR);
        buffer.extend_from_slice(&nonce.to_primes());
        buffer
    }

    fn decode_reply(&self, reply: &[Prime]) -> Result<BootstrapNonce, CodecError> {
        if reply.len() < MIN_REPLY_PRIMES {
            return Err(CodecError::TooShort(reply.len()));
        }
        if reply[0] != 0 || reply[1] != 0 {
            return Err(CodecError::EncryptedReply);
        }

        let length = reply[4];
        let available = (reply.len() - HEADER_PRIMES) * PRIME_SIZE;
        let fits = usize::try_from(length)
            .is_ok_and(|len| len >= (1 + NONCE_PRIMES) * PRIME_SIZE && len <= available);
        if !fits {
            return Err(CodecError::BadLength(length));
        }

        if reply[HEADER_PRIMES] != RES_PQ_CONSTRUCTOR {
            return Err(CodecError::UnexpectedConstructor(reply[HEADER_PRIMES] as u32));
        }

        let start = HEADER_PRIMES + 1;
        let mut nonce = [0; NONCE_PRIMES];
        nonce.copy_from_slice(&reply[start..start + NONCE_PRIMES]);
        Ok(BootstrapNonce::from_primes(&nonce))
    }
}

/// Message id for an unencrypted message sent at `now`.
///
/// Unix time in units of 2^-32 seconds, divisible by 4 for client messages.
fn message_id(now: SystemTime) -> i64 {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let fraction = (u64::from(since_epoch.subsec_nanos()) << 32) / 1_000_000_000;
    let id = (since_epoch.as_secs() << 32) | fraction;
    (id & !3) as i64
}

fn push_message_id(buffer: &mut PrimeBuffer, id: i64) {
    buffer.push(id as Prime);
    buffer.push((id >> 32) as Prime);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_nonce(byte: u8) -> BootstrapNonce {
        BootstrapNonce::from_bytes([byte; NONCE_SIZE])
    }

    #[test]
    fn test_request_layout() {
        let nonce = BootstrapNonce::from_bytes(
            hex::decode("00112233445566778899aabbccddeeff").unwrap().try_into().unwrap(),
        );
        let buffer = ReqPqCodec::new().encode_request(&nonce);

        assert_eq!(buffer.len(), 12);
        assert_eq!(&buffer[..4], &[0, 0, 0, 0]);
        assert_eq!(buffer[6], 20);
        assert_eq!(buffer[7], REQ_PQ_CONSTRUCTOR);
        assert_eq!(&buffer[8..12], &nonce.to_primes());
    }

    #[test]
    fn test_message_id_is_client_aligned() {
        let id = message_id(UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789));
        assert_eq!(id & 3, 0);
        assert_eq!(id >> 32, 1_700_000_000);
    }

    #[test]
    fn test_decode_reply() {
        let reply = ReqPqCodec::encode_reply(&test_nonce(7), &test_nonce(9));
        assert_eq!(ReqPqCodec::new().decode_reply(&reply), Ok(test_nonce(7)));
    }

    #[test]
    fn test_decode_reply_too_short() {
        let reply = ReqPqCodec::encode_reply(&test_nonce(7), &test_nonce(9));
        assert_eq!(
            ReqPqCodec::new().decode_reply(&reply[..8]),
            Err(CodecError::TooShort(8))
        );
    }

    #[test]
    fn test_decode_reply_rejects_auth_key() {
        let mut reply = ReqPqCodec::encode_reply(&test_nonce(7), &test_nonce(9));
        reply[1] = 0x55;
        assert_eq!(
            ReqPqCodec::new().decode_reply(&reply),
            Err(CodecError::EncryptedReply)
        );
    }

    #[test]
    fn test_decode_reply_rejects_constructor() {
        let mut reply = ReqPqCodec::encode_reply(&test_nonce(7), &test_nonce(9));
        reply[5] = REQ_PQ_CONSTRUCTOR;
        assert_eq!(
            ReqPqCodec::new().decode_reply(&reply),
            Err(CodecError::UnexpectedConstructor(REQ_PQ_CONSTRUCTOR as u32))
        );
    }

    #[test]
    fn test_decode_reply_rejects_length() {
        let mut reply = ReqPqCodec::encode_reply(&test_nonce(7), &test_nonce(9));
        reply[4] = 4096;
        assert_eq!(
            ReqPqCodec::new().decode_reply(&reply),
            Err(CodecError::BadLength(4096))
        );

        reply[4] = -1;
        assert_eq!(ReqPqCodec::new().decode_reply(&reply), Err(CodecError::BadLength(-1)));
    }
}
