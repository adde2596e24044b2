// storefront/src/payments/signature.rs

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `t=<unix seconds>,v1=<hex hmac>[,v1=...]`.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Allowed clock skew for timestamps ahead of ours.
const MAX_FUTURE_SKEW_SECS: i64 = 60;

/// Checks webhook authenticity: HMAC-SHA256 over `"{t}.{raw body}"` keyed by
/// the endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
  secret: String,
  tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WebhookVerifier")
      .field("secret", &"[REDACTED]")
      .field("tolerance_secs", &self.tolerance_secs)
      .finish()
  }
}

struct SignatureHeader<'a> {
  timestamp: &'a str,
  signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>> {
  let mut timestamp = None;
  let mut signatures = Vec::new();
  for part in header.split(',') {
    match part.trim().split_once('=') {
      Some(("t", value)) => timestamp = Some(value),
      Some(("v1", value)) => signatures.push(value),
      _ => {}
    }
  }
  match timestamp {
    Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader { timestamp, signatures }),
    _ => Err(AppError::InvalidSignature("malformed signature header".to_string())),
  }
}

impl WebhookVerifier {
  pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
    Self {
      secret: secret.into(),
      tolerance_secs,
    }
  }

  pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<()> {
    self.verify_at(payload, header, Utc::now().timestamp())
  }

  /// `verify` against an explicit clock.
  pub fn verify_at(&self, payload: &[u8], header: Option<&str>, now: i64) -> Result<()> {
    let header = header
      .filter(|h| !h.trim().is_empty())
      .ok_or_else(|| AppError::InvalidSignature("missing signature header".to_string()))?;
    let parsed = parse_header(header)?;

    let timestamp: i64 = parsed
      .timestamp
      .parse()
      .map_err(|_| AppError::InvalidSignature("invalid timestamp in signature header".to_string()))?;
    let age = now
      .checked_sub(timestamp)
      .ok_or_else(|| AppError::InvalidSignature("timestamp outside tolerance".to_string()))?;
    if age > self.tolerance_secs {
      warn!(age_secs = age, max_secs = self.tolerance_secs, "Webhook signature timestamp too old");
      return Err(AppError::InvalidSignature("timestamp outside tolerance".to_string()));
    }
    if age < -MAX_FUTURE_SKEW_SECS {
      warn!(age_secs = age, "Webhook signature timestamp in the future");
      return Err(AppError::InvalidSignature("timestamp outside tolerance".to_string()));
    }

    let expected = self.expected_signature(parsed.timestamp, payload)?;
    let matched = parsed
      .signatures
      .iter()
      .any(|candidate| candidate.len() == expected.len() && bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));
    if matched {
      Ok(())
    } else {
      Err(AppError::InvalidSignature("no matching signature".to_string()))
    }
  }

  fn expected_signature(&self, timestamp: &str, payload: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
      .map_err(|_| AppError::Config("invalid webhook secret".to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
  }
}
