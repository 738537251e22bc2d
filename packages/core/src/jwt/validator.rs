//! Compact-form JWT validation: HS256 signature verification in
//! constant time via `ring::hmac`, followed by `exp`/`nbf`/`iss`/`aud`
//! claim checks.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::hmac;
use zeroize::Zeroizing;

use super::claims::{Claims, JwtHeader};
use crate::error::JwtError;

pub struct JwtValidatorConfig {
    pub secret: Zeroizing<Vec<u8>>,
    pub leeway_seconds: i64,
    pub expected_issuer: Option<String>,
    pub expected_audience: Option<String>,
}

pub struct JwtValidator {
    key: hmac::Key,
    config: JwtValidatorConfig,
}

impl JwtValidator {
    #[must_use]
    pub fn new(config: JwtValidatorConfig) -> Self {
        let key = hmac::Key::new(hmac::HMAC_SHA256, &config.secret);
        Self { key, config }
    }

    /// Validates a compact JWT (`header64.payload64.signature64`) and
    /// returns the decoded claims on success.
    pub fn validate(&self, token: &str, now_unix: i64) -> Result<Claims, JwtError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(JwtError::InvalidToken)?;
        let payload_b64 = parts.next().ok_or(JwtError::InvalidToken)?;
        let signature_b64 = parts.next().ok_or(JwtError::InvalidToken)?;
        if parts.next().is_some() {
            return Err(JwtError::InvalidToken);
        }

        let header_bytes = URL_SAFE_NO_PAD.decode(header_b64).map_err(|_| JwtError::InvalidBase64)?;
        let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| JwtError::InvalidBase64)?;
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| JwtError::InvalidBase64)?;

        let header: JwtHeader = serde_json::from_slice(&header_bytes).map_err(|_| JwtError::InvalidHeader)?;
        if header.alg != "HS256" {
            return Err(JwtError::UnsupportedAlgorithm(header.alg));
        }

        let signed_input = format!("{header_b64}.{payload_b64}");
        hmac::verify(&self.key, signed_input.as_bytes(), &signature).map_err(|_| JwtError::InvalidSignature)?;

        let claims: Claims = serde_json::from_slice(&payload_bytes).map_err(|_| JwtError::InvalidPayload)?;

        if let Some(exp) = claims.exp {
            if exp <= now_unix - self.config.leeway_seconds {
                return Err(JwtError::TokenExpired);
            }
        }
        if let Some(nbf) = claims.nbf {
            if nbf > now_unix + self.config.leeway_seconds {
                return Err(JwtError::TokenNotYetValid);
            }
        }
        if let Some(expected) = &self.config.expected_issuer {
            if claims.iss.as_deref() != Some(expected.as_str()) {
                return Err(JwtError::InvalidIssuer);
            }
        }
        if let Some(expected) = &self.config.expected_audience {
            if claims.aud.as_deref() != Some(expected.as_str()) {
                return Err(JwtError::InvalidAudience);
            }
        }

        Ok(claims)
    }
}
