//! Connection IDs: opaque, 0–20 bytes, fixed length per connection after
//! the handshake.

use arrayvec::ArrayVec;

pub const MAX_CID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(ArrayVec<u8, MAX_CID_LEN>);

impl ConnectionId {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, crate::error::QuicError> {
        if bytes.len() > MAX_CID_LEN {
            return Err(crate::error::QuicError::ConnectionIdTooLong(bytes.len()));
        }
        let mut inner = ArrayVec::new();
        inner.try_extend_from_slice(bytes).expect("length checked above");
        Ok(Self(inner))
    }

    #[must_use]
    pub fn random(len: usize) -> Self {
        use rand::RngCore;
        let len = len.min(MAX_CID_LEN);
        let mut bytes = [0u8; MAX_CID_LEN];
        rand::rng().fill_bytes(&mut bytes[..len]);
        Self::from_slice(&bytes[..len]).expect("len bounded above")
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_cids_over_20_bytes() {
        let bytes = [0u8; 21];
        assert!(ConnectionId::from_slice(&bytes).is_err());
    }

    #[test]
    fn random_cids_of_the_same_length_are_distinct() {
        let a = ConnectionId::random(16);
        let b = ConnectionId::random(16);
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn zero_length_cid_is_allowed() {
        let cid = ConnectionId::from_slice(&[]).unwrap();
        assert!(cid.is_empty());
    }
}
