mod settings;

pub use settings::{GatewayConfig, LoggingConfig, Settings};
