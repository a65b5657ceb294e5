//! Notification payloads, gateway dispatching, and result reconciliation.
//!
//! # Request Modes
//!
//! The gateway accepts two request formats and the dispatcher picks one from
//! the recipient count:
//!
//! - Flat: form-encoded body, exactly one recipient, plain-text answer
//!   (`id=...`, `Error=...`, optional `registration_id=...`)
//! - Structured: JSON body with up to 1000 `registration_ids`, JSON answer
//!   with one positional result per submitted identifier
//!
//! More than 1000 recipients are split into consecutive chunks that are sent
//! in order and merged into a single `BatchOutcome`.

mod batch;
mod dispatcher;
mod message;
mod outcome;
mod validation;
mod wire;

pub use batch::{batch_count, batches, Recipients, RequestMode};
pub use dispatcher::{Dispatcher, DispatcherStats, DispatcherStatsSnapshot};
pub use message::{Notification, NotificationBuilder};
pub use outcome::{BatchOutcome, Outcome, Replacement, SendOutcome};
pub use validation::{
    check_data, check_recipient, check_recipients, check_time_to_live, data_size,
    ValidationError, DEFAULT_TIME_TO_LIVE, MAX_DATA_BYTES, MAX_RECIPIENTS, MAX_TIME_TO_LIVE,
};
pub use wire::{
    reconcile_form_response, reconcile_multicast_response, MulticastResponse, SlotResult,
};
