//! Card processor webhook signatures.
//!
//! The `stripe-signature` header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`
//! where each `v1` value is `HMAC-SHA256(secret, "<t>.<raw body>")`. Any
//! matching `v1` entry is accepted as long as `t` is within the tolerance
//! window of the current time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default replay window in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Why a webhook was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// No webhook secret is configured.
    #[error("webhook secret is not configured")]
    MissingSecret,

    /// The request carried no signature header.
    #[error("missing stripe-signature header")]
    MissingHeader,

    /// The header could not be parsed.
    #[error("malformed signature header: {0}")]
    Malformed(&'static str),

    /// No `v1` entry matched the payload.
    #[error("signature does not match payload")]
    Mismatch,

    /// The timestamp is outside the tolerance window.
    #[error("signature timestamp outside tolerance ({age_secs}s)")]
    Expired {
        /// Distance between now and the signed timestamp.
        age_secs: i64,
    },
}

#[derive(Debug)]
struct ParsedHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<ParsedHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::Malformed("timestamp is not an integer"))?,
                );
            }
            // Undecodable entries are skipped; another v1 may still match.
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed("no timestamp"))?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed("no v1 signature"));
    }
    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::MissingSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verifies `header` against the raw request body.
///
/// `now` is the current unix time in seconds.
///
/// # Errors
///
/// Returns a [`SignatureError`] describing the first check that failed.
pub fn verify(
    payload: &[u8],
    header: Option<&str>,
    secret: Option<&str>,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::MissingSecret)?;
    let header = header
        .filter(|h| !h.trim().is_empty())
        .ok_or(SignatureError::MissingHeader)?;
    let parsed = parse_header(header)?;

    let age_secs = now.saturating_sub(parsed.timestamp);
    if age_secs.abs() > tolerance_secs {
        return Err(SignatureError::Expired { age_secs });
    }

    let mac = mac_for(secret, parsed.timestamp, payload)?;
    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Builds a header value for `payload`, as the processor would send it.
///
/// # Errors
///
/// Returns [`SignatureError::MissingSecret`] if the key is rejected.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mac = mac_for(secret, timestamp, payload)?;
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={digest}"))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    fn signed(payload: &[u8], timestamp: i64) -> String {
        let Ok(header) = sign(payload, SECRET, timestamp) else {
            panic!("signing failed");
        };
        header
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let header = signed(body, NOW);
        assert_eq!(
            verify(body, Some(&header), Some(SECRET), 300, NOW + 10),
            Ok(())
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let header = signed(b"original", NOW);
        assert_eq!(
            verify(b"tampered", Some(&header), Some(SECRET), 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = signed(b"{}", NOW - 600);
        assert_eq!(
            verify(b"{}", Some(&header), Some(SECRET), 300, NOW),
            Err(SignatureError::Expired { age_secs: 600 })
        );
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let header = signed(b"{}", NOW);
        let rotated = format!("{header},v1=deadbeef");
        let reordered = format!("t={NOW},v1=zz,{}", header.replace(&format!("t={NOW},"), ""));
        assert!(verify(b"{}", Some(&rotated), Some(SECRET), 300, NOW).is_ok());
        assert!(verify(b"{}", Some(&reordered), Some(SECRET), 300, NOW).is_ok());
    }

    #[test]
    fn missing_inputs_are_reported() {
        let header = signed(b"{}", NOW);
        assert_eq!(
            verify(b"{}", Some(&header), None, 300, NOW),
            Err(SignatureError::MissingSecret)
        );
        assert_eq!(
            verify(b"{}", None, Some(SECRET), 300, NOW),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verify(b"{}", Some("v1=abcd"), Some(SECRET), 300, NOW),
            Err(SignatureError::Malformed("no timestamp"))
        );
        assert_eq!(
            verify(b"{}", Some("t=123"), Some(SECRET), 300, NOW),
            Err(SignatureError::Malformed("no v1 signature"))
        );
    }
}
