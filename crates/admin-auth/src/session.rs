//! Unverified access-token claim decoding
//!
//! Reads the `exp` claim out of a bearer token's payload segment without
//! checking the signature. This is a client-side hint used to skip a request
//! that would certainly be rejected; the backend remains the authority.
//!
//! Decoding fails closed: anything that is not a three-part token with a
//! base64url JSON payload carrying a finite numeric `exp` yields `None`, and callers
//! treat `None` exactly like an expired token.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;

/// Standard-alphabet decoder that tolerates missing padding and stray
/// trailing bits, the way browser `atob` does.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Claims recovered from an access token. Only expiry is read.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the unix epoch; may carry a fraction
    pub exp: f64,
}

impl Claims {
    /// Whether the token is expired at `now` (millisecond precision; a token
    /// expiring exactly now counts as expired).
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        let now_millis = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as f64;
        self.exp * 1000.0 <= now_millis
    }
}

/// Decode the payload segment of `token`.
pub fn decode(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;

    let standard: String = payload
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    let bytes = LENIENT_STANDARD.decode(standard.as_bytes()).ok()?;
    let json = String::from_utf8(bytes).ok()?;
    let claims: Claims = serde_json::from_str(&json).ok()?;
    claims.exp.is_finite().then_some(claims)
}

/// True only if `token` decodes and has not expired at `now`.
pub fn is_usable(token: &str, now: SystemTime) -> bool {
    decode(token).is_some_and(|claims| !claims.is_expired_at(now))
}
