//! Browser upload policies
//!
//! A policy is a JSON document listing the conditions a browser form upload
//! must satisfy. It is base64-encoded and signed with HMAC-SHA1 so the
//! storage service can check that the form was issued by us.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha1::Sha1;

use crate::error::{StorageError, StorageResult};

type HmacSha1 = Hmac<Sha1>;

/// Largest upload a policy allows, in bytes (10 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Status the storage service answers a successful form upload with
pub const SUCCESS_ACTION_STATUS: &str = "201";

/// Canned ACL used when none is given
pub const DEFAULT_ACL: &str = "private";

/// How far ahead of "now" a policy expires, before truncation to the hour
const EXPIRY_OFFSET_HOURS: i64 = 24 + 3;

/// Rendering of the policy `expiration` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiryFormat {
    /// Zero-padded ISO-8601, e.g. `2024-01-06T09:00:00.000Z`
    #[default]
    Iso8601,
    /// Unpadded components, e.g. `2024-1-6T9:00:00.000Z`, for consumers
    /// of the older format
    Legacy,
}

/// Expiration timestamp for a policy issued at `now`
///
/// Tomorrow, three hours past the current hour, with minutes and seconds
/// zeroed. Day, month and year roll over with the calendar.
#[must_use]
pub fn expiry_at(now: DateTime<Utc>, format: ExpiryFormat) -> String {
    let at = now + TimeDelta::hours(EXPIRY_OFFSET_HOURS);
    match format {
        ExpiryFormat::Iso8601 => format!(
            "{:04}-{:02}-{:02}T{:02}:00:00.000Z",
            at.year(),
            at.month(),
            at.day(),
            at.hour()
        ),
        ExpiryFormat::Legacy => format!(
            "{}-{}-{}T{}:00:00.000Z",
            at.year(),
            at.month(),
            at.day(),
            at.hour()
        ),
    }
}

/// Policy document as sent to the browser (before encoding)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// When the policy stops being accepted
    pub expiration: String,
    /// Upload conditions, in the order the service documents them
    pub conditions: Vec<Value>,
}

impl PolicyDocument {
    /// Builds the fixed set of upload conditions
    #[must_use]
    pub fn new(expiration: String, bucket: &str, acl: &str, content_type: &str) -> Self {
        Self {
            expiration,
            conditions: vec![
                json!(["starts-with", "$key", ""]),
                json!({ "bucket": bucket }),
                json!({ "acl": acl }),
                json!({ "success_action_status": SUCCESS_ACTION_STATUS }),
                json!(["starts-with", "$Content-Type", content_type]),
                json!(["starts-with", "$filename", ""]),
                json!(["content-length-range", 0, MAX_UPLOAD_BYTES]),
            ],
        }
    }

    /// Compact JSON, base64-encoded
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the document cannot be serialized
    pub fn encode(&self) -> StorageResult<String> {
        let json = serde_json::to_string(self)?;
        Ok(STANDARD.encode(json))
    }

    /// Parses a base64-encoded policy back into a document
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidArgument` if the input is not base64 and
    /// `StorageError::Serialization` if it is not a policy document
    pub fn decode(encoded: &str) -> StorageResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| StorageError::InvalidArgument(format!("policy is not base64: {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Credentials a browser form needs to upload directly to the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPolicy {
    /// Base64-encoded policy document
    #[serde(rename = "s3Policy")]
    pub policy: String,
    /// Base64-encoded HMAC-SHA1 of `policy`
    #[serde(rename = "s3Signature")]
    pub signature: String,
    /// Access key id matching the signing secret
    #[serde(rename = "AWSAccessKeyId")]
    pub access_key_id: Option<String>,
}

/// Signs a base64-encoded policy with `secret`, returning the base64 signature
///
/// # Errors
///
/// Returns `StorageError::Signing` if the HMAC rejects the key
pub fn sign_policy(encoded_policy: &str, secret: &str) -> StorageResult<String> {
    let mut mac = new_mac(secret)?;
    mac.update(encoded_policy.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against `encoded_policy` in constant time
///
/// A signature that is not valid base64 is reported as not matching.
///
/// # Errors
///
/// Returns `StorageError::Signing` if the HMAC rejects the key
pub fn verify_policy_signature(
    encoded_policy: &str,
    signature: &str,
    secret: &str,
) -> StorageResult<bool> {
    let Ok(signature) = STANDARD.decode(signature) else {
        return Ok(false);
    };
    let mut mac = new_mac(secret)?;
    mac.update(encoded_policy.as_bytes());
    Ok(mac.verify_slice(&signature).is_ok())
}

fn new_mac(secret: &str) -> StorageResult<HmacSha1> {
    HmacSha1::new_from_slice(secret.as_bytes()).map_err(|e| StorageError::Signing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const ENCODED_FIXTURE: &str = "eyJleHBpcmF0aW9uIjoiMjAyNC0wMS0wNlQxMDowMDowMC4wMDBaIiwiY29uZGl0aW9ucyI6W1sic3RhcnRzLXdpdGgiLCIka2V5IiwiIl0seyJidWNrZXQiOiJ0ZXN0LWJ1Y2tldCJ9LHsiYWNsIjoicHVibGljLXJlYWQifSx7InN1Y2Nlc3NfYWN0aW9uX3N0YXR1cyI6IjIwMSJ9LFsic3RhcnRzLXdpdGgiLCIkQ29udGVudC1UeXBlIiwiaW1hZ2UvcG5nIl0sWyJzdGFydHMtd2l0aCIsIiRmaWxlbmFtZSIsIiJdLFsiY29udGVudC1sZW5ndGgtcmFuZ2UiLDAsMTA0ODU3NjBdXX0=";
    const SIGNATURE_FIXTURE: &str = "/5KC3hPHassQ3NNR9pJdMvLKrYo=";

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 42).unwrap()
    }

    fn fixture_document() -> PolicyDocument {
        PolicyDocument::new(
            "2024-01-06T10:00:00.000Z".to_string(),
            "test-bucket",
            "public-read",
            "image/png",
        )
    }

    #[test]
    fn test_expiry_iso_is_zero_padded() {
        let now = utc(2024, 1, 5, 7, 30);
        assert_eq!(
            expiry_at(now, ExpiryFormat::Iso8601),
            "2024-01-06T10:00:00.000Z"
        );
    }

    #[test]
    fn test_expiry_legacy_is_not_padded() {
        let now = utc(2024, 1, 5, 7, 30);
        assert_eq!(expiry_at(now, ExpiryFormat::Legacy), "2024-1-6T10:00:00.000Z");

        let now = utc(2024, 3, 2, 1, 5);
        assert_eq!(expiry_at(now, ExpiryFormat::Legacy), "2024-3-3T4:00:00.000Z");
    }

    #[test]
    fn test_expiry_rolls_over_calendar() {
        // Late evening on the last day of the month lands two days later
        let now = utc(2024, 1, 31, 22, 10);
        assert_eq!(
            expiry_at(now, ExpiryFormat::Iso8601),
            "2024-02-02T01:00:00.000Z"
        );

        // Leap day
        let now = utc(2024, 2, 28, 12, 0);
        assert_eq!(
            expiry_at(now, ExpiryFormat::Iso8601),
            "2024-02-29T15:00:00.000Z"
        );

        // Year end
        let now = utc(2023, 12, 31, 23, 59);
        assert_eq!(expiry_at(now, ExpiryFormat::Legacy), "2024-1-2T2:00:00.000Z");
    }

    #[test]
    fn test_document_serializes_in_order() {
        let json = serde_json::to_string(&fixture_document()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"expiration":"2024-01-06T10:00:00.000Z","conditions":["#,
                r#"["starts-with","$key",""],"#,
                r#"{"bucket":"test-bucket"},"#,
                r#"{"acl":"public-read"},"#,
                r#"{"success_action_status":"201"},"#,
                r#"["starts-with","$Content-Type","image/png"],"#,
                r#"["starts-with","$filename",""],"#,
                r#"["content-length-range",0,10485760]]}"#
            )
        );
    }

    #[test]
    fn test_encode_matches_fixture() {
        let encoded = fixture_document().encode().unwrap();
        assert_eq!(encoded, ENCODED_FIXTURE);
        assert_eq!(PolicyDocument::decode(&encoded).unwrap(), fixture_document());
    }

    #[test]
    fn test_sign_matches_fixture() {
        let signature = sign_policy(ENCODED_FIXTURE, "test-secret").unwrap();
        assert_eq!(signature, SIGNATURE_FIXTURE);
    }

    #[test]
    fn test_verify_signature() {
        assert!(verify_policy_signature(ENCODED_FIXTURE, SIGNATURE_FIXTURE, "test-secret").unwrap());
        assert!(!verify_policy_signature(ENCODED_FIXTURE, SIGNATURE_FIXTURE, "other").unwrap());
        assert!(!verify_policy_signature("tampered", SIGNATURE_FIXTURE, "test-secret").unwrap());
        assert!(!verify_policy_signature(ENCODED_FIXTURE, "%%%", "test-secret").unwrap());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            PolicyDocument::decode("not base64!"),
            Err(StorageError::InvalidArgument(_))
        ));
        let not_json = STANDARD.encode("plain text");
        assert!(matches!(
            PolicyDocument::decode(&not_json),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_signed_policy_field_names() {
        let signed = SignedPolicy {
            policy: "p".to_string(),
            signature: "s".to_string(),
            access_key_id: Some("AKIDEXAMPLE".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&signed).unwrap(),
            json!({ "s3Policy": "p", "s3Signature": "s", "AWSAccessKeyId": "AKIDEXAMPLE" })
        );
    }
}
