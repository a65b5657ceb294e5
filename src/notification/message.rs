use serde::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

use super::validation::{
    check_data, check_recipient, check_recipients, check_time_to_live, data_or_default,
    recipients_or_default, text_or_none, time_to_live_or_default, ValidationError,
    DEFAULT_TIME_TO_LIVE, MAX_RECIPIENTS,
};

/// Push notification payload.
///
/// Every mutator validates its input and leaves the notification unchanged
/// when the input is rejected. Serialization re-validates all fields, so a
/// payload is either well formed or an explicit error.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    recipients: Vec<String>,
    data: Map<String, Value>,
    collapse_key: Option<String>,
    time_to_live: u32,
    delay_while_idle: bool,
    dry_run: bool,
    restricted_package_name: Option<String>,
}

/// JSON body of a multi-recipient request
#[derive(Serialize)]
struct StructuredPayload<'a> {
    registration_ids: &'a [String],
    data: &'a Map<String, Value>,
    delay_while_idle: bool,
    time_to_live: u32,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    collapse_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    restricted_package_name: Option<&'a str>,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            data: Map::new(),
            collapse_key: None,
            time_to_live: DEFAULT_TIME_TO_LIVE,
            delay_while_idle: false,
            dry_run: false,
            restricted_package_name: None,
        }
    }
}

impl Notification {
    /// Create an empty notification with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder
    pub fn builder() -> NotificationBuilder {
        NotificationBuilder::new()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn collapse_key(&self) -> Option<&str> {
        self.collapse_key.as_deref()
    }

    pub fn time_to_live(&self) -> u32 {
        self.time_to_live
    }

    pub fn delay_while_idle(&self) -> bool {
        self.delay_while_idle
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn restricted_package_name(&self) -> Option<&str> {
        self.restricted_package_name.as_deref()
    }

    /// Add one recipient.
    ///
    /// Returns `Ok(false)` when the identifier is already present (no-op).
    pub fn add_recipient(&mut self, id: impl Into<String>) -> Result<bool, ValidationError> {
        let id = id.into();
        check_recipient(&id)?;

        if self.recipients.contains(&id) {
            return Ok(false);
        }
        if self.recipients.len() >= MAX_RECIPIENTS {
            return Err(ValidationError::TooManyRecipients {
                count: self.recipients.len() + 1,
            });
        }

        self.recipients.push(id);
        Ok(true)
    }

    /// Replace the whole recipient list.
    pub fn set_recipients(&mut self, ids: Vec<String>) -> Result<(), ValidationError> {
        check_recipients(&ids)?;
        self.recipients = ids;
        Ok(())
    }

    /// Merge one entry into the custom data.
    ///
    /// An existing key keeps its current value and `Ok(false)` is returned.
    /// If the new entry would push the serialized data to 4096 bytes or more
    /// it is rolled back and an error returned.
    pub fn add_data(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<bool, ValidationError> {
        let key = key.into();
        if self.data.contains_key(&key) {
            return Ok(false);
        }

        self.data.insert(key.clone(), value.into());
        if let Err(e) = check_data(&self.data) {
            self.data.remove(&key);
            return Err(e);
        }
        Ok(true)
    }

    /// Replace the custom data wholesale if it passes the size check.
    pub fn set_data(&mut self, data: Map<String, Value>) -> Result<(), ValidationError> {
        check_data(&data)?;
        self.data = data;
        Ok(())
    }

    pub fn set_collapse_key(&mut self, key: impl Into<String>) {
        self.collapse_key = text_or_none(Some(key.into()));
    }

    pub fn clear_collapse_key(&mut self) {
        self.collapse_key = None;
    }

    pub fn set_time_to_live(&mut self, seconds: u32) -> Result<(), ValidationError> {
        check_time_to_live(seconds)?;
        self.time_to_live = seconds;
        Ok(())
    }

    pub fn set_delay_while_idle(&mut self, value: bool) {
        self.delay_while_idle = value;
    }

    pub fn set_dry_run(&mut self, value: bool) {
        self.dry_run = value;
    }

    pub fn set_restricted_package_name(&mut self, name: impl Into<String>) {
        self.restricted_package_name = text_or_none(Some(name.into()));
    }

    pub fn clear_restricted_package_name(&mut self) {
        self.restricted_package_name = None;
    }

    /// Validate every recipient-independent field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_time_to_live(self.time_to_live)?;
        check_data(&self.data)?;
        Ok(())
    }

    /// Structured (JSON) form using this notification's own recipients.
    pub fn to_json(&self) -> Result<Value, ValidationError> {
        check_recipients(&self.recipients)?;
        self.validate()?;
        encode_value(&self.structured_payload(&self.recipients))
    }

    /// Flat `key=value&...` form. Requires exactly one recipient.
    pub fn to_form(&self) -> Result<String, ValidationError> {
        match self.recipients.as_slice() {
            [recipient] => self.form_body(recipient),
            other => Err(ValidationError::RecipientArity(other.len())),
        }
    }

    /// JSON request body with `recipients` substituted for the recipient list.
    pub(crate) fn structured_body(&self, recipients: &[String]) -> Result<String, ValidationError> {
        if recipients.is_empty() {
            return Err(ValidationError::NoRecipients);
        }
        check_recipients(recipients)?;
        self.validate()?;

        encode_string(&self.structured_payload(recipients))
    }

    /// Form request body addressed to `recipient`.
    pub(crate) fn form_body(&self, recipient: &str) -> Result<String, ValidationError> {
        check_recipient(recipient)?;
        self.validate()?;

        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("registration_id", recipient);
        for (key, value) in &self.data {
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            form.append_pair(&format!("data.{key}"), &value);
        }
        form.append_pair("time_to_live", &self.time_to_live.to_string());
        form.append_pair("dry_run", bool_str(self.dry_run));
        form.append_pair("delay_while_idle", bool_str(self.delay_while_idle));
        if let Some(key) = &self.collapse_key {
            form.append_pair("collapse_key", key);
        }
        if let Some(name) = &self.restricted_package_name {
            form.append_pair("restricted_package_name", name);
        }

        Ok(form.finish())
    }

    fn structured_payload<'a>(&'a self, recipients: &'a [String]) -> StructuredPayload<'a> {
        StructuredPayload {
            registration_ids: recipients,
            data: &self.data,
            delay_while_idle: self.delay_while_idle,
            time_to_live: self.time_to_live,
            dry_run: self.dry_run,
            collapse_key: self.collapse_key.as_deref(),
            restricted_package_name: self.restricted_package_name.as_deref(),
        }
    }
}

fn encode_value<T: Serialize>(payload: &T) -> Result<Value, ValidationError> {
    serde_json::to_value(payload).map_err(|e| ValidationError::Encoding(e.to_string()))
}

fn encode_string<T: Serialize>(payload: &T) -> Result<String, ValidationError> {
    serde_json::to_string(payload).map_err(|e| ValidationError::Encoding(e.to_string()))
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Builder for creating notifications.
///
/// Invalid values do not fail the build: each field falls back to its
/// default (empty recipients, empty data, four-week time-to-live, no
/// collapse key / package name).
#[derive(Debug, Clone, Default)]
pub struct NotificationBuilder {
    recipients: Option<Vec<String>>,
    data: Option<Map<String, Value>>,
    collapse_key: Option<String>,
    time_to_live: Option<u32>,
    delay_while_idle: bool,
    dry_run: bool,
    restricted_package_name: Option<String>,
}

impl NotificationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recipient list
    pub fn recipients<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Set the custom data map
    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the custom data from a JSON object; anything else is ignored
    pub fn data_from_json(mut self, value: Value) -> Self {
        if let Value::Object(map) = value {
            self.data = Some(map);
        }
        self
    }

    pub fn collapse_key(mut self, key: impl Into<String>) -> Self {
        self.collapse_key = Some(key.into());
        self
    }

    /// Set time-to-live in seconds
    pub fn time_to_live(mut self, seconds: u32) -> Self {
        self.time_to_live = Some(seconds);
        self
    }

    pub fn delay_while_idle(mut self, value: bool) -> Self {
        self.delay_while_idle = value;
        self
    }

    pub fn dry_run(mut self, value: bool) -> Self {
        self.dry_run = value;
        self
    }

    pub fn restricted_package_name(mut self, name: impl Into<String>) -> Self {
        self.restricted_package_name = Some(name.into());
        self
    }

    /// Build the notification
    pub fn build(self) -> Notification {
        Notification {
            recipients: recipients_or_default(self.recipients),
            data: data_or_default(self.data),
            collapse_key: text_or_none(self.collapse_key),
            time_to_live: time_to_live_or_default(self.time_to_live),
            delay_while_idle: self.delay_while_idle,
            dry_run: self.dry_run,
            restricted_package_name: text_or_none(self.restricted_package_name),
        }
    }
}
