//! Offset-indexed reassembly of CRYPTO frame data. Each packet-number
//! space carries its own CRYPTO stream; TLS flight bytes arrive out of
//! order across retransmitted packets and must be delivered to the TLS
//! engine strictly in offset order.

use std::collections::BTreeMap;

/// Reassembles a single CRYPTO stream for one packet-number space.
///
/// - Data at the expected offset is handed back immediately.
/// - Data at a higher offset is buffered until the gap closes.
/// - Data entirely below the expected offset is a duplicate retransmission
///   and is dropped without altering any state.
/// - Data that partially overlaps the expected offset is accepted for its
///   new bytes only.
#[derive(Debug, Default)]
pub struct CryptoStream {
    expected_offset: u64,
    buffered: BTreeMap<u64, Vec<u8>>,
}

impl CryptoStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a `(offset, data)` CRYPTO frame into the stream. Returns the
    /// bytes now ready for delivery to TLS, in order, which may include
    /// previously buffered frames that this one's arrival made
    /// contiguous. Returns an empty vector if nothing new is ready.
    pub fn receive(&mut self, offset: u64, data: &[u8]) -> Vec<u8> {
        if data.is_empty() {
            return self.drain_ready();
        }
        let end = offset + data.len() as u64;
        if end <= self.expected_offset {
            // Fully covered by what we've already delivered.
            return self.drain_ready();
        }
        let (start, data) = if offset < self.expected_offset {
            let skip = (self.expected_offset - offset) as usize;
            (self.expected_offset, &data[skip..])
        } else {
            (offset, data)
        };
        self.buffered.entry(start).or_insert_with(|| data.to_vec());
        self.drain_ready()
    }

    fn drain_ready(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let Some((&start, _)) = self.buffered.iter().find(|(&start, _)| start <= self.expected_offset) else {
                break;
            };
            let chunk = self.buffered.remove(&start).expect("key came from iteration");
            let chunk_end = start + chunk.len() as u64;
            if chunk_end <= self.expected_offset {
                continue; // stale duplicate, already superseded
            }
            let skip = (self.expected_offset - start) as usize;
            out.extend_from_slice(&chunk[skip..]);
            self.expected_offset = chunk_end;
        }
        out
    }

    #[must_use]
    pub fn expected_offset(&self) -> u64 {
        self.expected_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_frames_are_delivered_immediately() {
        let mut stream = CryptoStream::new();
        assert_eq!(stream.receive(0, b"hello"), b"hello");
        assert_eq!(stream.receive(5, b" world"), b" world");
    }

    #[test]
    fn out_of_order_frame_is_buffered_until_the_gap_closes() {
        let mut stream = CryptoStream::new();
        assert!(stream.receive(5, b" world").is_empty());
        assert_eq!(stream.receive(0, b"hello"), b"hello world");
    }

    #[test]
    fn fully_duplicate_frame_does_not_alter_state() {
        let mut stream = CryptoStream::new();
        stream.receive(0, b"hello");
        assert_eq!(stream.expected_offset(), 5);
        assert!(stream.receive(0, b"hello").is_empty());
        assert_eq!(stream.expected_offset(), 5);
    }

    #[test]
    fn partially_overlapping_frame_contributes_only_new_bytes() {
        let mut stream = CryptoStream::new();
        stream.receive(0, b"hel");
        let delivered = stream.receive(2, b"llo");
        assert_eq!(delivered, b"lo");
        assert_eq!(stream.expected_offset(), 5);
    }

    #[test]
    fn multiple_buffered_gaps_close_in_order() {
        let mut stream = CryptoStream::new();
        assert!(stream.receive(10, b"!!").is_empty());
        assert!(stream.receive(5, b"world").is_empty());
        assert_eq!(stream.receive(0, b"hello "), b"hello world!!");
    }
}
