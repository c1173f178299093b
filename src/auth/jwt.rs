//! Access token payload decoding
//!
//! Reads the claims of a compact `header.payload.signature` token without
//! verifying the signature. Only the expiry is consumed locally.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::{Map, Value};

use super::AuthError;

/// Standard alphabet, padding optional and lax trailing bits, like browser `atob`.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decoded token claims.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSet {
    /// Expiry as Unix seconds; `None` when the token carries no `exp`
    pub exp: Option<f64>,
    pub claims: Map<String, Value>,
}

impl ClaimSet {
    /// Strictly past expiry; a token without `exp` never expires.
    pub fn is_expired_at(&self, now_secs: f64) -> bool {
        match self.exp {
            Some(exp) => now_secs > exp,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_secs())
    }
}

/// Wall clock as fractional Unix seconds.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Decode the payload segment of `token` into a claim set.
pub fn decode(token: &str) -> Result<ClaimSet, AuthError> {
    let segment = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::MalformedToken("missing payload segment".to_string()))?;

    let base64 = segment.replace('-', "+").replace('_', "/");
    let bytes = LENIENT_STANDARD
        .decode(base64.as_bytes())
        .map_err(|e| AuthError::MalformedToken(format!("invalid base64 payload: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| AuthError::MalformedToken(format!("payload is not UTF-8: {}", e)))?;

    let claims = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(AuthError::MalformedToken(
                "payload is not a JSON object".to_string(),
            ))
        }
        Err(e) => return Err(AuthError::MalformedToken(format!("invalid payload JSON: {}", e))),
    };

    let exp = claims.get("exp").and_then(coerce_exp);
    Ok(ClaimSet { exp, claims })
}

/// Numeric reading of an `exp` claim, loose the way a JavaScript `now > exp`
/// comparison is: `null` and `false` are 0, `true` is 1, numeric strings are
/// parsed. Anything else compares false against every clock, i.e. no expiry.
fn coerce_exp(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(0.0);
            }
            s.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Build an unsigned (`alg: none`) compact token carrying `claims`.
pub fn encode_unsigned(claims: &Value) -> String {
    let header = serde_json::json!({"alg": "none", "typ": "JWT"});
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}
