use std::time::{Duration, SystemTime};

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use super::TokenEnvelope;

/// Read-only view of the credential store used for health reporting.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub has_token: bool,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_until_expiry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiring_soon: Option<bool>,
}

impl TokenStatus {
    pub fn empty() -> Self {
        Self {
            has_token: false,
            is_valid: false,
            issued_at: None,
            expires_at: None,
            time_until_expiry: None,
            expiring_soon: None,
        }
    }

    pub(crate) fn observe(envelope: &TokenEnvelope, now: SystemTime, safety_margin: Duration) -> Self {
        let remaining = signed_between(now, envelope.expires_at());
        let margin = SignedDuration::try_from(safety_margin).unwrap_or(SignedDuration::MAX);
        Self {
            has_token: true,
            is_valid: envelope.is_usable(now, safety_margin),
            issued_at: Timestamp::try_from(envelope.issued_at()).ok(),
            expires_at: Timestamp::try_from(envelope.expires_at()).ok(),
            time_until_expiry: Some(format!("{remaining:#}")),
            expiring_soon: Some(remaining < margin),
        }
    }
}

fn signed_between(from: SystemTime, to: SystemTime) -> SignedDuration {
    let (forward, magnitude) = match to.duration_since(from) {
        Ok(ahead) => (true, ahead),
        Err(behind) => (false, behind.duration()),
    };
    let magnitude = SignedDuration::try_from(magnitude).unwrap_or(SignedDuration::MAX);
    if forward { magnitude } else { -magnitude }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARGIN: Duration = Duration::from_secs(300);

    fn status_for(expires_in_secs: i64) -> TokenStatus {
        let now = SystemTime::now();
        let issued = now - Duration::from_secs(3600);
        let expires = if expires_in_secs >= 0 {
            now + Duration::from_secs(expires_in_secs as u64)
        } else {
            now - Duration::from_secs(expires_in_secs.unsigned_abs())
        };
        let envelope = TokenEnvelope::try_new("tok".into(), issued, expires).unwrap();
        TokenStatus::observe(&envelope, now, MARGIN)
    }

    #[test]
    fn expiring_within_margin_is_invalid() {
        let status = status_for(180);
        assert!(status.has_token);
        assert!(!status.is_valid);
        assert_eq!(status.expiring_soon, Some(true));
    }

    #[test]
    fn comfortably_valid_token() {
        let status = status_for(600);
        assert!(status.is_valid);
        assert_eq!(status.expiring_soon, Some(false));
        assert!(status.time_until_expiry.is_some());
    }

    #[test]
    fn expired_token_reports_negative_remaining() {
        let status = status_for(-60);
        assert!(!status.is_valid);
        assert_eq!(status.expiring_soon, Some(true));
        let rendered = status.time_until_expiry.unwrap();
        assert!(rendered.starts_with('-') || rendered.ends_with("ago"), "{rendered}");
    }

    #[test]
    fn empty_status_serializes_only_flags() {
        let json = serde_json::to_value(TokenStatus::empty()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "hasToken": false, "isValid": false })
        );
    }

    #[test]
    fn populated_status_uses_camel_case() {
        let json = serde_json::to_value(status_for(600)).unwrap();
        assert!(json.get("issuedAt").and_then(|v| v.as_str()).is_some());
        assert!(json.get("expiresAt").is_some());
        assert!(json.get("timeUntilExpiry").is_some());
        assert_eq!(json["expiringSoon"], serde_json::json!(false));
    }
}
