// Core
pub mod notification;
pub mod retry;
pub mod transport;

// Supporting modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

pub use config::{GatewayConfig, Settings};
pub use error::{GatewayError, PushError};
pub use notification::{
    BatchOutcome, Dispatcher, Notification, NotificationBuilder, Outcome, Recipients,
    Replacement, SendOutcome, ValidationError,
};
