use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("encode failed: {message}")]
    Encode { message: String },
    #[error("decode failed: {message}")]
    Decode { message: String },
    #[error("not a string-encoded enum: {value}")]
    NotAnEnum { value: String },
    #[error("invalid timestamp: {value}")]
    InvalidTimestamp { value: String },
}

pub fn to_rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub fn from_rfc3339(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DbError::InvalidTimestamp {
            value: value.to_string(),
        })
}

pub fn encode_json<T: Serialize>(value: &T) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|err| DbError::Encode {
        message: err.to_string(),
    })
}

pub fn decode_json<T: DeserializeOwned>(value: &str) -> Result<T, DbError> {
    serde_json::from_str(value).map_err(|err| DbError::Decode {
        message: err.to_string(),
    })
}

/// Unit enum variants serialize as bare strings; anything else is rejected
/// so the column stays queryable.
pub fn encode_enum<T: Serialize>(value: &T) -> Result<String, DbError> {
    let json = serde_json::to_value(value).map_err(|err| DbError::Encode {
        message: err.to_string(),
    })?;
    match json {
        Value::String(value) => Ok(value),
        other => Err(DbError::NotAnEnum {
            value: other.to_string(),
        }),
    }
}

pub fn decode_enum<T: DeserializeOwned>(value: &str) -> Result<T, DbError> {
    serde_json::from_value(Value::String(value.to_string())).map_err(|err| DbError::Decode {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::types::ReviewKind;

    #[test]
    fn test_enum_round_trip() {
        let encoded = encode_enum(&ReviewKind::RequestChanges).unwrap();
        assert_eq!(encoded, "RequestChanges");
        let decoded: ReviewKind = decode_enum(&encoded).unwrap();
        assert_eq!(decoded, ReviewKind::RequestChanges);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let parsed = from_rfc3339(&to_rfc3339(&now)).unwrap();
        assert_eq!(parsed, now);
        assert!(from_rfc3339("yesterday-ish").is_err());
    }
}
