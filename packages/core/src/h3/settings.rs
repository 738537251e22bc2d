//! SETTINGS frame payload: a sequence of `(varint id, varint value)` pairs.
//! Duplicates are permitted; the last occurrence wins.

use std::collections::HashMap;

use crate::varint;

/// A decoded SETTINGS payload, collapsed so the last value for a given id
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings(HashMap<u64, u64>);

impl Settings {
    #[must_use]
    pub fn get(&self, id: u64) -> Option<u64> {
        self.0.get(&id).copied()
    }

    pub fn set(&mut self, id: u64, value: u64) {
        self.0.insert(id, value);
    }

    /// Parses a SETTINGS payload, applying pairs in order so later
    /// duplicates overwrite earlier ones.
    #[must_use]
    pub fn parse(mut payload: &[u8]) -> Self {
        let mut settings = Settings::default();
        while !payload.is_empty() {
            let Ok((id, id_len)) = varint::decode(payload) else { break };
            payload = &payload[id_len..];
            let Ok((value, value_len)) = varint::decode(payload) else { break };
            payload = &payload[value_len..];
            settings.set(id, value);
        }
        settings
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (&id, &value) in &self.0 {
            let _ = varint::encode(id, &mut out);
            let _ = varint::encode(value, &mut out);
        }
        out
    }
}
