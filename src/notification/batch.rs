//! Recipient arguments, request modes and chunking.

use std::slice::Chunks;

use super::validation::{ValidationError, MAX_RECIPIENTS};

/// Recipients of a send: one identifier or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn len(&self) -> usize {
        match self {
            Recipients::One(_) => 1,
            Recipients::Many(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Protocol to use for these recipients
    pub fn mode(&self) -> Result<RequestMode, ValidationError> {
        RequestMode::for_count(self.len())
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            Recipients::One(id) => vec![id],
            Recipients::Many(ids) => ids,
        }
    }
}

impl From<String> for Recipients {
    fn from(id: String) -> Self {
        Recipients::One(id)
    }
}

impl From<&str> for Recipients {
    fn from(id: &str) -> Self {
        Recipients::One(id.to_string())
    }
}

impl From<Vec<String>> for Recipients {
    fn from(ids: Vec<String>) -> Self {
        Recipients::Many(ids)
    }
}

impl From<&[String]> for Recipients {
    fn from(ids: &[String]) -> Self {
        Recipients::Many(ids.to_vec())
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(ids: Vec<&str>) -> Self {
        Recipients::Many(ids.into_iter().map(str::to_string).collect())
    }
}

/// Wire protocol of a gateway request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// `application/x-www-form-urlencoded`, exactly one recipient
    Flat,
    /// `application/json`, up to 1000 recipients per request
    Structured,
}

impl RequestMode {
    /// One recipient uses the flat protocol, several the structured one.
    pub fn for_count(count: usize) -> Result<Self, ValidationError> {
        match count {
            0 => Err(ValidationError::NoRecipients),
            1 => Ok(RequestMode::Flat),
            _ => Ok(RequestMode::Structured),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RequestMode::Flat => "application/x-www-form-urlencoded;charset=UTF-8",
            RequestMode::Structured => "application/json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Flat => "flat",
            RequestMode::Structured => "structured",
        }
    }
}

/// Split `ids` into consecutive chunks of at most 1000, preserving order.
pub fn batches(ids: &[String]) -> Chunks<'_, String> {
    ids.chunks(MAX_RECIPIENTS)
}

/// Number of gateway requests needed for `count` recipients.
pub fn batch_count(count: usize) -> usize {
    count.div_ceil(MAX_RECIPIENTS)
}
