//! Per-stream reassembly for QUIC STREAM frames, multiplexed by
//! stream ID. HTTP/3 request/response and control-stream data rides on
//! top of this; the reassembly rules are the same ones CRYPTO data
//! follows: in-order data flows straight through, out-of-order
//! data buffers until the gap closes, and anything already delivered is
//! dropped as a duplicate.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct ReassemblyBuffer {
    expected_offset: u64,
    buffered: BTreeMap<u64, Vec<u8>>,
    fin_offset: Option<u64>,
}

impl ReassemblyBuffer {
    fn receive(&mut self, offset: u64, data: &[u8], fin: bool) -> Vec<u8> {
        if fin {
            self.fin_offset = Some(offset + data.len() as u64);
        }
        if !data.is_empty() {
            let end = offset + data.len() as u64;
            if end > self.expected_offset {
                let (start, data) = if offset < self.expected_offset {
                    let skip = (self.expected_offset - offset) as usize;
                    (self.expected_offset, &data[skip..])
                } else {
                    (offset, data)
                };
                self.buffered.entry(start).or_insert_with(|| data.to_vec());
            }
        }
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
                continue;
            }
            let skip = (self.expected_offset - start) as usize;
            out.extend_from_slice(&chunk[skip..]);
            self.expected_offset = chunk_end;
        }
        out
    }

    fn is_finished(&self) -> bool {
        self.fin_offset == Some(self.expected_offset) && self.buffered.is_empty()
    }
}

/// Tracks reassembly state for every stream a connection has seen data on.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    streams: HashMap<u64, ReassemblyBuffer>,
}

impl StreamReassembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a STREAM frame's payload in. Returns the newly-ready,
    /// in-order bytes for this stream (possibly empty).
    pub fn receive(&mut self, stream_id: u64, offset: u64, data: &[u8], fin: bool) -> Vec<u8> {
        self.streams.entry(stream_id).or_default().receive(offset, data, fin)
    }

    #[must_use]
    pub fn is_finished(&self, stream_id: u64) -> bool {
        self.streams.get(&stream_id).is_some_and(ReassemblyBuffer::is_finished)
    }

    pub fn remove(&mut self, stream_id: u64) {
        self.streams.remove(&stream_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_for_different_streams_does_not_interleave() {
        let mut r = StreamReassembler::new();
        assert_eq!(r.receive(0, 0, b"stream zero", false), b"stream zero");
        assert_eq!(r.receive(4, 0, b"stream four", false), b"stream four");
    }

    #[test]
    fn out_of_order_stream_data_buffers_until_contiguous() {
        let mut r = StreamReassembler::new();
        assert!(r.receive(0, 5, b"world", false).is_empty());
        assert_eq!(r.receive(0, 0, b"hello", false), b"helloworld");
    }

    #[test]
    fn fin_marks_the_stream_finished_once_all_bytes_arrive() {
        let mut r = StreamReassembler::new();
        assert!(!r.is_finished(0));
        r.receive(0, 0, b"done", true);
        assert!(r.is_finished(0));
    }

    #[test]
    fn fin_before_trailing_gap_closes_does_not_finish_early() {
        let mut r = StreamReassembler::new();
        r.receive(0, 5, b"!", true);
        assert!(!r.is_finished(0));
        r.receive(0, 0, b"hello", false);
        assert!(r.is_finished(0));
    }
}
