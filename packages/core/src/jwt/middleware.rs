//! JWT authentication middleware: extracts a bearer token
//! from a configured header, validates it, and checks a named claim
//! against a required value when the route demands authorization.

use super::claims::Claims;
use super::validator::JwtValidator;
use crate::error::JwtError;

pub struct AuthMiddlewareConfig {
    pub header_name: String,
    pub scheme_prefix: String,
    pub required_claim: Option<(String, String)>,
}

impl Default for AuthMiddlewareConfig {
    fn default() -> Self {
        Self { header_name: "Authorization".to_string(), scheme_prefix: "Bearer ".to_string(), required_claim: None }
    }
}

pub struct AuthMiddleware {
    validator: JwtValidator,
    config: AuthMiddlewareConfig,
}

impl AuthMiddleware {
    #[must_use]
    pub fn new(validator: JwtValidator, config: AuthMiddlewareConfig) -> Self {
        Self { validator, config }
    }

    /// Authenticates one request given the raw value of the configured
    /// header (case-insensitive lookup is the caller's responsibility,
    /// as in [`crate::http1::Request::header`]).
    pub fn authenticate(&self, header_value: Option<&str>, now_unix: i64) -> Result<Claims, JwtError> {
        let raw = header_value.ok_or(JwtError::InvalidToken)?;
        let token = raw.strip_prefix(&self.config.scheme_prefix).ok_or(JwtError::InvalidToken)?.trim();

        let claims = self.validator.validate(token, now_unix)?;

        if let Some((claim_name, required_value)) = &self.config.required_claim {
            if claims.string_claim(claim_name) != Some(required_value.as_str()) {
                return Err(JwtError::AuthorizationDenied(claim_name.clone()));
            }
        }

        Ok(claims)
    }

    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.config.header_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validator::JwtValidatorConfig;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use ring::hmac;
    use zeroize::Zeroizing;

    fn token(secret: &[u8], claims_json: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload_b64 = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
        let tag = hmac::sign(&key, format!("{header_b64}.{payload_b64}").as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(tag.as_ref());
        format!("{header_b64}.{payload_b64}.{sig_b64}")
    }

    fn middleware(secret: &[u8], required_claim: Option<(&str, &str)>) -> AuthMiddleware {
        let validator = JwtValidator::new(JwtValidatorConfig {
            secret: Zeroizing::new(secret.to_vec()),
            leeway_seconds: 0,
            expected_issuer: None,
            expected_audience: None,
        });
        AuthMiddleware::new(
            validator,
            AuthMiddlewareConfig {
                required_claim: required_claim.map(|(k, v)| (k.to_string(), v.to_string())),
                ..Default::default()
            },
        )
    }

    #[test]
    fn missing_header_is_rejected() {
        let mw = middleware(b"s", None);
        assert_eq!(mw.authenticate(None, 0).unwrap_err(), JwtError::InvalidToken);
    }

    #[test]
    fn wrong_scheme_prefix_is_rejected() {
        let mw = middleware(b"s", None);
        assert_eq!(mw.authenticate(Some("Basic abc"), 0).unwrap_err(), JwtError::InvalidToken);
    }

    #[test]
    fn valid_bearer_token_authenticates() {
        let secret = b"s";
        let jwt = token(secret, r#"{"sub":"alice"}"#);
        let mw = middleware(secret, None);
        let header = format!("Bearer {jwt}");
        assert!(mw.authenticate(Some(&header), 0).is_ok());
    }

    #[test]
    fn required_claim_mismatch_is_an_authorization_denial() {
        let secret = b"s";
        let jwt = token(secret, r#"{"role":"viewer"}"#);
        let mw = middleware(secret, Some(("role", "admin")));
        let header = format!("Bearer {jwt}");
        assert_eq!(mw.authenticate(Some(&header), 0).unwrap_err(), JwtError::AuthorizationDenied("role".to_string()));
    }

    #[test]
    fn required_claim_match_authorizes() {
        let secret = b"s";
        let jwt = token(secret, r#"{"role":"admin"}"#);
        let mw = middleware(secret, Some(("role", "admin")));
        let header = format!("Bearer {jwt}");
        assert!(mw.authenticate(Some(&header), 0).is_ok());
    }
}
