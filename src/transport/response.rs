//! Response body decoding.
//!
//! HTTP replies arrive as raw bytes; the session layer wants whole units.

use crate::core::constants::{MALFORMED_RESPONSE_CODE, MIN_RESPONSE_SIZE, PRIME_SIZE};
use crate::core::{Prime, PrimeBuffer};

/// Outcome of decoding one response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedResponse {
    /// Zero-length body. Dropped without notification.
    Empty,
    /// Body size not a multiple of the unit size, or too small.
    Malformed {
        /// Body length in bytes.
        len: usize,
    },
    /// Well-formed body as little-endian units.
    Data(PrimeBuffer),
}

impl DecodedResponse {
    /// Buffer form expected by the session layer.
    ///
    /// A malformed body becomes the single-unit sentinel buffer.
    pub fn into_buffer(self) -> PrimeBuffer {
        match self {
            DecodedResponse::Empty => PrimeBuffer::new(),
            DecodedResponse::Malformed { .. } => vec![MALFORMED_RESPONSE_CODE],
            DecodedResponse::Data(data) => data,
        }
    }
}

/// Decode a response body into units.
pub fn decode_response(body: &[u8]) -> DecodedResponse {
    if body.is_empty() {
        return DecodedResponse::Empty;
    }

    if body.len() % PRIME_SIZE != 0 || body.len() < MIN_RESPONSE_SIZE {
        return DecodedResponse::Malformed { len: body.len() };
    }

    let data = body
        .chunks_exact(PRIME_SIZE)
        .map(|chunk| Prime::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    DecodedResponse::Data(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body() {
        assert_eq!(decode_response(&[]), DecodedResponse::Empty);
        assert!(DecodedResponse::Empty.into_buffer().is_empty());
    }

    #[test]
    fn test_seven_bytes_is_sentinel() {
        let decoded = decode_response(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(decoded, DecodedResponse::Malformed { len: 7 });
        assert_eq!(decoded.into_buffer(), vec![-500]);
    }

    #[test]
    fn test_single_unit_is_too_small() {
        assert_eq!(decode_response(&[0; 4]), DecodedResponse::Malformed { len: 4 });
    }

    #[test]
    fn test_unaligned_body() {
        assert_eq!(decode_response(&[0; 13]), DecodedResponse::Malformed { len: 13 });
    }

    #[test]
    fn test_units_keep_byte_order() {
        let body = hex::decode("01000000feffffff78974660").unwrap();
        assert_eq!(
            decode_response(&body),
            DecodedResponse::Data(vec![1, -2, 0x6046_9778])
        );
    }
}
