use crate::constants::TIMESTAMP_FORMAT;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthType {
    #[serde(rename = "idc")]
    IdC,
    #[serde(rename = "social")]
    Social,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::IdC => write!(f, "idc"),
            AuthType::Social => write!(f, "social"),
        }
    }
}

/// Credential file written by Kiro into the SSO cache directory.
///
/// Fields we do not interpret are kept in `extra` so that a restored
/// backup is byte-for-byte what Kiro originally wrote (modulo formatting).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KiroToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_arn: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl KiroToken {
    pub fn auth_type(&self) -> AuthType {
        if self.client_id_hash.trim().is_empty() {
            AuthType::Social
        } else {
            AuthType::IdC
        }
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.expires_at)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdcCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for IdcCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdcCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshedToken {
    /// Stamps the new token with `now + expires_in_secs`. Negative values
    /// mean "already expired"; values past chrono's range are rejected.
    pub fn expires_in(access_token: String, expires_in_secs: i64) -> AppResult<Self> {
        let expires_at = TimeDelta::try_seconds(expires_in_secs.max(0))
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .ok_or_else(|| {
                AppError::RefreshFailed(format!("invalid expiresIn: {}", expires_in_secs))
            })?;
        Ok(Self {
            access_token,
            expires_at,
        })
    }

    pub fn expires_at_string(&self) -> String {
        format_timestamp(self.expires_at)
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter writing `DateTime<Utc>` in the millisecond wire format.
pub mod wire_timestamp {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(*at))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

/// `Option` flavour of [`wire_timestamp`]; `None` is written as `null`.
pub mod wire_timestamp_opt {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(at: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match at {
            Some(at) => serializer.serialize_some(&format_timestamp(*at)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token_json() -> serde_json::Value {
        serde_json::json!({
            "accessToken": "atk",
            "refreshToken": "rtk",
            "expiresAt": "2025-01-15T10:30:00.000Z",
            "authMethod": "social",
            "provider": "Github",
            "profileArn": "arn:aws:codewhisperer:us-east-1:1:profile/X",
            "someFutureField": {"nested": true}
        })
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let token: KiroToken = serde_json::from_value(token_json()).expect("parse token");
        assert_eq!(token.provider, "Github");
        assert!(token.extra.contains_key("someFutureField"));

        let value = serde_json::to_value(&token).expect("serialize token");
        assert_eq!(value["someFutureField"]["nested"], serde_json::json!(true));
        assert!(value.get("clientIdHash").is_none());
    }

    #[test]
    fn auth_type_follows_client_id_hash() {
        let mut token: KiroToken = serde_json::from_value(token_json()).expect("parse token");
        assert_eq!(token.auth_type(), AuthType::Social);
        token.client_id_hash = "abc".to_string();
        assert_eq!(token.auth_type(), AuthType::IdC);
    }

    #[test]
    fn missing_access_token_is_rejected() {
        let result = serde_json::from_value::<KiroToken>(serde_json::json!({"provider": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn timestamp_format_is_millisecond_utc() {
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_timestamp(at), "2025-01-15T10:30:00.000Z");
        assert_eq!(parse_timestamp("2025-01-15T10:30:00.000Z"), Some(at));
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn out_of_range_expires_in_is_refresh_failed() {
        let refreshed = RefreshedToken::expires_in("atk".to_string(), 3600).expect("in range");
        assert!(refreshed.expires_at > Utc::now() + chrono::Duration::minutes(59));

        let err = RefreshedToken::expires_in("atk".to_string(), i64::MAX).unwrap_err();
        assert!(matches!(err, AppError::RefreshFailed(msg) if msg.contains("expiresIn")));
        let err = RefreshedToken::expires_in("atk".to_string(), 9_000_000_000_000_000).unwrap_err();
        assert!(matches!(err, AppError::RefreshFailed(_)));
    }

    #[test]
    fn idc_credentials_debug_hides_secret() {
        let creds = IdcCredentials {
            client_id: "cid".to_string(),
            client_secret: "super-secret".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("cid"));
        assert!(!rendered.contains("super-secret"));
    }
}
