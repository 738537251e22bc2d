//! QUIC header protection (RFC 9001 §5.4): masks the packet number and the
//! low protected bits of the first byte using a sample of the protected
//! payload and a key derived alongside the packet-protection AEAD key.

use ring::aead::quic as ring_quic;

use crate::error::QuicError;

const SAMPLE_LEN: usize = 16;

pub struct HeaderProtectionKey(ring_quic::HeaderProtectionKey);

impl HeaderProtectionKey {
    pub fn new(algorithm: &'static ring_quic::Algorithm, key_bytes: &[u8]) -> Result<Self, QuicError> {
        let key = ring_quic::HeaderProtectionKey::new(algorithm, key_bytes).map_err(|_| QuicError::DecryptFailure)?;
        Ok(Self(key))
    }

    fn mask(&self, sample: &[u8]) -> Result<[u8; 5], QuicError> {
        self.0.new_mask(sample).map_err(|_| QuicError::DecryptFailure)
    }

    /// Removes header protection in place. `first_byte` is the packet's
    /// first byte; `pn_bytes` is the (up to 4-byte) region immediately
    /// following the header where the protected packet number lives,
    /// already over-sized to its maximum; `sample` is the 16-byte sample
    /// taken 4 bytes into that region per RFC 9001 §5.4.2. Returns the
    /// packet number's true encoded length (1-4).
    pub fn remove(&self, first_byte: &mut u8, pn_bytes: &mut [u8], sample: &[u8], long_header: bool) -> Result<usize, QuicError> {
        if sample.len() != SAMPLE_LEN {
            return Err(QuicError::ProtocolViolation("header protection sample must be 16 bytes"));
        }
        let mask = self.mask(sample)?;
        let pn_length_bits_mask = if long_header { 0x0f } else { 0x1f };
        *first_byte ^= mask[0] & pn_length_bits_mask;
        let pn_len = (*first_byte & 0x03) as usize + 1;
        for (byte, m) in pn_bytes.iter_mut().take(pn_len).zip(&mask[1..]) {
            *byte ^= m;
        }
        Ok(pn_len)
    }

    /// Applies header protection in place, mirroring `remove`.
    pub fn apply(&self, first_byte: &mut u8, pn_bytes: &mut [u8], pn_len: usize, sample: &[u8], long_header: bool) -> Result<(), QuicError> {
        if sample.len() != SAMPLE_LEN {
            return Err(QuicError::ProtocolViolation("header protection sample must be 16 bytes"));
        }
        let mask = self.mask(sample)?;
        let pn_length_bits_mask = if long_header { 0x0f } else { 0x1f };
        *first_byte ^= mask[0] & pn_length_bits_mask;
        for (byte, m) in pn_bytes.iter_mut().take(pn_len).zip(&mask[1..]) {
            *byte ^= m;
        }
        Ok(())
    }
}

/// Extracts the 16-byte sample used for header protection, starting 4
/// bytes into the region following the (over-sized, 4-byte) packet-number
/// field, per RFC 9001 §5.4.2.
pub fn sample_from(payload_after_pn_start: &[u8]) -> Result<&[u8], QuicError> {
    payload_after_pn_start.get(4..4 + SAMPLE_LEN).ok_or(QuicError::PacketTooShort)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> HeaderProtectionKey {
        HeaderProtectionKey::new(&ring_quic::AES_128, &[0x42; 16]).unwrap()
    }

    #[test]
    fn apply_then_remove_round_trips_the_packet_number() {
        let key = test_key();
        let original_pn_len = 2usize;
        let sample = [0x11u8; SAMPLE_LEN];

        let mut first_byte = 0b1100_0001u8; // long header, pn_len bits = 01 (2 bytes)
        let mut pn_bytes = [0xAB, 0xCD, 0, 0];

        let unprotected_first_byte = first_byte;
        let unprotected_pn = pn_bytes;

        key.apply(&mut first_byte, &mut pn_bytes, original_pn_len, &sample, true).unwrap();
        assert_ne!(first_byte, unprotected_first_byte);
        assert_ne!(&pn_bytes[..original_pn_len], &unprotected_pn[..original_pn_len]);

        let pn_len = key.remove(&mut first_byte, &mut pn_bytes, &sample, true).unwrap();
        assert_eq!(pn_len, original_pn_len);
        assert_eq!(first_byte, unprotected_first_byte);
        assert_eq!(&pn_bytes[..pn_len], &unprotected_pn[..pn_len]);
    }

    #[test]
    fn rejects_a_sample_of_the_wrong_length() {
        let key = test_key();
        let mut first_byte = 0u8;
        let mut pn_bytes = [0u8; 4];
        assert!(key.remove(&mut first_byte, &mut pn_bytes, &[0u8; 8], true).is_err());
    }
}
