//! JWT header and claims shapes (RFC 7519), decoded just enough to
//! validate the baseline (HS256, `exp`/`nbf`/`iss`/`aud`, named-claim
//! authorization) without committing to an open-ended claim schema.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub typ: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Claims {
    pub exp: Option<i64>,
    pub nbf: Option<i64>,
    pub iss: Option<String>,
    pub aud: Option<String>,
    #[serde(flatten)]
    pub other: HashMap<String, Value>,
}

impl Claims {
    /// Reads a named claim as a string, for authorization checks against
    /// an arbitrary configured claim (only string-valued claims are
    /// supported).
    #[must_use]
    pub fn string_claim(&self, name: &str) -> Option<&str> {
        match name {
            "iss" => self.iss.as_deref(),
            "aud" => self.aud.as_deref(),
            _ => self.other.get(name).and_then(Value::as_str),
        }
    }
}
