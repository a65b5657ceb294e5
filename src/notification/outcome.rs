use std::collections::BTreeMap;

use serde::Serialize;

/// Result of a single-recipient send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    /// The gateway accepted the message
    Delivered {
        /// Gateway-assigned message id
        id: String,
        /// The identifier that was submitted, set only when a replacement is reported
        #[serde(skip_serializing_if = "Option::is_none")]
        original_recipient_id: Option<String>,
        /// Canonical identifier the caller should store instead
        #[serde(skip_serializing_if = "Option::is_none")]
        replacement_recipient_id: Option<String>,
    },
    /// The gateway rejected the recipient
    Failed {
        /// Gateway error code (e.g. "NotRegistered")
        error: String,
    },
}

impl Outcome {
    pub fn delivered(id: impl Into<String>) -> Self {
        Outcome::Delivered {
            id: id.into(),
            original_recipient_id: None,
            replacement_recipient_id: None,
        }
    }

    pub fn replaced(
        id: impl Into<String>,
        original_recipient_id: impl Into<String>,
        replacement_recipient_id: impl Into<String>,
    ) -> Self {
        Outcome::Delivered {
            id: id.into(),
            original_recipient_id: Some(original_recipient_id.into()),
            replacement_recipient_id: Some(replacement_recipient_id.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Outcome::Failed {
            error: error.into(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Outcome::Delivered { id, .. } => Some(id),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Delivered { .. } => None,
            Outcome::Failed { error } => Some(error),
        }
    }

    /// `(original, replacement)` identifiers when the gateway asked for a swap
    pub fn replacement(&self) -> Option<(&str, &str)> {
        match self {
            Outcome::Delivered {
                original_recipient_id: Some(original),
                replacement_recipient_id: Some(replacement),
                ..
            } => Some((original, replacement)),
            _ => None,
        }
    }
}

/// A recipient identifier the gateway wants replaced by a canonical one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub gateway_message_id: String,
    pub original_recipient_id: String,
    pub new_recipient_id: String,
}

/// Aggregated result of a multi-recipient send.
///
/// Counts are kept in step with the collections: `failure_count` is the total
/// length of all failure lists and `replacement_count` the number of
/// replacement records. Serialization always emits the counts and omits
/// `failures` / `replacements` while they are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    gateway_batch_ids: Vec<i64>,
    success_count: u64,
    failure_count: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    failures: BTreeMap<String, Vec<String>>,
    replacement_count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    replacements: Vec<Replacement>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// One id per gateway request, in request order
    pub fn gateway_batch_ids(&self) -> &[i64] {
        &self.gateway_batch_ids
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Error code to the recipients that failed with it, in submission order
    pub fn failures(&self) -> &BTreeMap<String, Vec<String>> {
        &self.failures
    }

    pub fn replacement_count(&self) -> u64 {
        self.replacement_count
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    pub(crate) fn record_batch_id(&mut self, id: i64) {
        self.gateway_batch_ids.push(id);
    }

    pub(crate) fn add_successes(&mut self, count: u64) {
        self.success_count += count;
    }

    pub(crate) fn record_failure(&mut self, error: impl Into<String>, recipient: impl Into<String>) {
        self.failures
            .entry(error.into())
            .or_default()
            .push(recipient.into());
        self.failure_count += 1;
    }

    pub(crate) fn record_replacement(&mut self, replacement: Replacement) {
        self.replacements.push(replacement);
        self.replacement_count += 1;
    }

    /// Append a later batch's results to this one.
    pub(crate) fn merge(&mut self, other: BatchOutcome) {
        self.gateway_batch_ids.extend(other.gateway_batch_ids);
        self.success_count += other.success_count;
        for (error, recipients) in other.failures {
            self.failure_count += recipients.len() as u64;
            self.failures.entry(error).or_default().extend(recipients);
        }
        self.replacement_count += other.replacements.len() as u64;
        self.replacements.extend(other.replacements);
    }
}

/// What `Dispatcher::send` returns, depending on the request mode used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SendOutcome {
    Single(Outcome),
    Batch(BatchOutcome),
}

impl SendOutcome {
    pub fn as_single(&self) -> Option<&Outcome> {
        match self {
            SendOutcome::Single(outcome) => Some(outcome),
            SendOutcome::Batch(_) => None,
        }
    }

    pub fn as_batch(&self) -> Option<&BatchOutcome> {
        match self {
            SendOutcome::Single(_) => None,
            SendOutcome::Batch(outcome) => Some(outcome),
        }
    }

    pub fn into_single(self) -> Option<Outcome> {
        match self {
            SendOutcome::Single(outcome) => Some(outcome),
            SendOutcome::Batch(_) => None,
        }
    }

    pub fn into_batch(self) -> Option<BatchOutcome> {
        match self {
            SendOutcome::Single(_) => None,
            SendOutcome::Batch(outcome) => Some(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn replacement(message: &str, original: &str, new: &str) -> Replacement {
        Replacement {
            gateway_message_id: message.to_string(),
            original_recipient_id: original.to_string(),
            new_recipient_id: new.to_string(),
        }
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_value(Outcome::delivered("42")).unwrap(),
            json!({"id": "42"})
        );
        assert_eq!(
            serde_json::to_value(Outcome::replaced("42", "old", "new")).unwrap(),
            json!({
                "id": "42",
                "original_recipient_id": "old",
                "replacement_recipient_id": "new"
            })
        );
        assert_eq!(
            serde_json::to_value(Outcome::failed("NotRegistered")).unwrap(),
            json!({"error": "NotRegistered"})
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = Outcome::replaced("1", "A", "B");
        assert!(outcome.is_delivered());
        assert_eq!(outcome.id(), Some("1"));
        assert_eq!(outcome.error(), None);
        assert_eq!(outcome.replacement(), Some(("A", "B")));

        let failed = Outcome::failed("InvalidRegistration");
        assert!(!failed.is_delivered());
        assert_eq!(failed.id(), None);
        assert_eq!(failed.error(), Some("InvalidRegistration"));
        assert_eq!(failed.replacement(), None);
    }

    #[test]
    fn test_empty_batch_serialization_keeps_counts() {
        let mut outcome = BatchOutcome::new();
        outcome.record_batch_id(7);
        outcome.add_successes(3);

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "gateway_batch_ids": [7],
                "success_count": 3,
                "failure_count": 0,
                "replacement_count": 0
            })
        );
    }

    #[test]
    fn test_counts_track_collections() {
        let mut outcome = BatchOutcome::new();
        outcome.record_failure("NotRegistered", "A");
        outcome.record_failure("NotRegistered", "B");
        outcome.record_failure("InvalidRegistration", "C");
        outcome.record_replacement(replacement("m1", "D", "D2"));

        assert_eq!(outcome.failure_count(), 3);
        assert_eq!(outcome.failures()["NotRegistered"], vec!["A", "B"]);
        assert_eq!(outcome.replacement_count(), 1);

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["failures"]["InvalidRegistration"], json!(["C"]));
        assert_eq!(value["replacements"][0]["new_recipient_id"], json!("D2"));
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut first = BatchOutcome::new();
        first.record_batch_id(1);
        first.add_successes(2);
        first.record_failure("NotRegistered", "A");
        first.record_replacement(replacement("m1", "B", "B2"));

        let mut second = BatchOutcome::new();
        second.record_batch_id(2);
        second.add_successes(5);
        second.record_failure("NotRegistered", "C");
        second.record_failure("Unavailable", "D");
        second.record_replacement(replacement("m2", "E", "E2"));

        first.merge(second);

        assert_eq!(first.gateway_batch_ids(), &[1_i64, 2]);
        assert_eq!(first.success_count(), 7);
        assert_eq!(first.failure_count(), 3);
        assert_eq!(first.failures()["NotRegistered"], vec!["A", "C"]);
        assert_eq!(first.failures()["Unavailable"], vec!["D"]);
        assert_eq!(first.replacement_count(), 2);
        assert_eq!(first.replacements()[1].original_recipient_id, "E");
    }

    #[test]
    fn test_send_outcome_accessors() {
        let single = SendOutcome::Single(Outcome::delivered("1"));
        assert!(single.as_single().is_some());
        assert!(single.as_batch().is_none());
        assert_eq!(single.into_single(), Some(Outcome::delivered("1")));

        let batch = SendOutcome::Batch(BatchOutcome::new());
        assert!(batch.as_batch().is_some());
        assert!(batch.into_single().is_none());
    }
}
