//! Field validation for notification payloads.
//!
//! Two flavours are provided for every field:
//! - `check_*` returns an error describing why a value is rejected
//! - `*_or_default` returns the supplied value when valid, otherwise the
//!   documented default (used by `NotificationBuilder`)

use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum number of recipients in one gateway request.
pub const MAX_RECIPIENTS: usize = 1000;

/// Custom data must serialize to strictly fewer bytes than this.
pub const MAX_DATA_BYTES: usize = 4096;

/// Four weeks, the longest time-to-live the gateway accepts.
pub const MAX_TIME_TO_LIVE: u32 = 2_419_200;

/// Default time-to-live in seconds.
pub const DEFAULT_TIME_TO_LIVE: u32 = MAX_TIME_TO_LIVE;

/// Errors caused by a malformed notification or recipient list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Too many recipients: {count} (max {max})", max = MAX_RECIPIENTS)]
    TooManyRecipients { count: usize },

    #[error("Custom data serializes to {size} bytes (must be below {max})", max = MAX_DATA_BYTES)]
    PayloadTooLarge { size: usize },

    #[error("Time to live {0}s is out of range (1..={max})", max = MAX_TIME_TO_LIVE)]
    InvalidTimeToLive(u32),

    #[error("Flat form requires exactly one recipient, found {0}")]
    RecipientArity(usize),

    #[error("No recipients given")]
    NoRecipients,

    #[error("Recipient identifier must not be empty")]
    EmptyRecipient,

    #[error("Payload could not be encoded: {0}")]
    Encoding(String),
}

/// Serialized size of the custom data map in bytes.
pub fn data_size(data: &Map<String, Value>) -> usize {
    // A map of JSON values always serializes; treat the impossible case as oversized
    serde_json::to_vec(data)
        .map(|bytes| bytes.len())
        .unwrap_or(usize::MAX)
}

pub fn check_data(data: &Map<String, Value>) -> Result<(), ValidationError> {
    let size = data_size(data);
    if size < MAX_DATA_BYTES {
        Ok(())
    } else {
        Err(ValidationError::PayloadTooLarge { size })
    }
}

pub fn check_time_to_live(seconds: u32) -> Result<(), ValidationError> {
    if seconds > 0 && seconds <= MAX_TIME_TO_LIVE {
        Ok(())
    } else {
        Err(ValidationError::InvalidTimeToLive(seconds))
    }
}

pub fn check_recipient(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        Err(ValidationError::EmptyRecipient)
    } else {
        Ok(())
    }
}

/// Recipient list of a single request: at most 1000 non-empty identifiers.
pub fn check_recipients(ids: &[String]) -> Result<(), ValidationError> {
    if ids.len() > MAX_RECIPIENTS {
        return Err(ValidationError::TooManyRecipients { count: ids.len() });
    }
    ids.iter().try_for_each(|id| check_recipient(id))
}

pub fn time_to_live_or_default(seconds: Option<u32>) -> u32 {
    match seconds {
        Some(seconds) if check_time_to_live(seconds).is_ok() => seconds,
        _ => DEFAULT_TIME_TO_LIVE,
    }
}

pub fn data_or_default(data: Option<Map<String, Value>>) -> Map<String, Value> {
    match data {
        Some(data) if check_data(&data).is_ok() => data,
        _ => Map::new(),
    }
}

pub fn recipients_or_default(ids: Option<Vec<String>>) -> Vec<String> {
    match ids {
        Some(ids) if check_recipients(&ids).is_ok() => ids,
        _ => Vec::new(),
    }
}

/// Empty strings are treated the same as an absent value.
pub fn text_or_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map_with_value_len(len: usize) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("k".to_string(), Value::String("x".repeat(len)));
        map
    }

    #[test]
    fn test_data_size_boundary() {
        // {"k":"..."} adds 8 bytes around the value
        let just_under = map_with_value_len(MAX_DATA_BYTES - 9);
        assert_eq!(data_size(&just_under), MAX_DATA_BYTES - 1);
        assert!(check_data(&just_under).is_ok());

        let at_limit = map_with_value_len(MAX_DATA_BYTES - 8);
        assert_eq!(data_size(&at_limit), MAX_DATA_BYTES);
        assert_eq!(
            check_data(&at_limit),
            Err(ValidationError::PayloadTooLarge {
                size: MAX_DATA_BYTES
            })
        );
    }

    #[test]
    fn test_time_to_live_range() {
        assert!(check_time_to_live(0).is_err());
        assert!(check_time_to_live(1).is_ok());
        assert!(check_time_to_live(MAX_TIME_TO_LIVE).is_ok());
        assert!(check_time_to_live(MAX_TIME_TO_LIVE + 1).is_err());
    }

    #[test]
    fn test_check_recipients() {
        assert!(check_recipients(&[]).is_ok());
        assert!(check_recipients(&vec!["a".to_string(); MAX_RECIPIENTS]).is_ok());
        assert_eq!(
            check_recipients(&vec!["a".to_string(); MAX_RECIPIENTS + 1]),
            Err(ValidationError::TooManyRecipients {
                count: MAX_RECIPIENTS + 1
            })
        );
        assert_eq!(
            check_recipients(&["a".to_string(), " ".to_string()]),
            Err(ValidationError::EmptyRecipient)
        );
    }

    #[test]
    fn test_fallbacks_use_defaults_for_invalid_values() {
        assert_eq!(time_to_live_or_default(Some(60)), 60);
        assert_eq!(time_to_live_or_default(Some(0)), DEFAULT_TIME_TO_LIVE);
        assert_eq!(time_to_live_or_default(None), DEFAULT_TIME_TO_LIVE);

        let data = json!({"a": 1}).as_object().cloned();
        assert_eq!(data_or_default(data.clone()), data.unwrap());
        assert!(data_or_default(Some(map_with_value_len(MAX_DATA_BYTES))).is_empty());

        assert!(recipients_or_default(Some(vec![String::new()])).is_empty());
        assert_eq!(
            recipients_or_default(Some(vec!["a".to_string()])),
            vec!["a".to_string()]
        );

        assert_eq!(text_or_none(Some(String::new())), None);
        assert_eq!(text_or_none(Some("k".to_string())), Some("k".to_string()));
    }
}
