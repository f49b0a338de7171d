//! Error types for Coach Assist.

use std::time::Duration;

use crate::wizard::FlowType;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Finalization error: {0}")]
    Finalize(#[from] FinalizeError),

    #[error("Coaching error: {0}")]
    Coaching(#[from] CoachingError),

    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// State store errors. Any of these is fatal for the current request only.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Key {key} holds a {found} value, expected {expected}")]
    WrongKind {
        key: String,
        found: &'static str,
        expected: &'static str,
    },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Generation gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Wizard state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("No active {flow} flow")]
    NoActiveFlow { flow: FlowType },

    #[error("Concurrent updates to the {flow} flow kept conflicting after {attempts} attempts")]
    Contention { flow: FlowType, attempts: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Finalization pipeline errors. The wizard state is left untouched on every variant.
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("No {flow} flow is awaiting finalization")]
    NoActiveFlow { flow: FlowType },

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<WizardError> for FinalizeError {
    fn from(e: WizardError) -> Self {
        match e {
            WizardError::NoActiveFlow { flow } | WizardError::Contention { flow, .. } => {
                Self::NoActiveFlow { flow }
            }
            WizardError::Store(e) => Self::Store(e),
        }
    }
}

/// Errors from the coaching feature commands.
#[derive(Debug, thiserror::Error)]
pub enum CoachingError {
    #[error("No {record} on file")]
    Missing { record: &'static str },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from administrator commands.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Not authorized")]
    Unauthorized,

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Coaching(#[from] CoachingError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors while handling one inbound event in the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Bad or missing command arguments; the message is shown as-is.
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    #[error(transparent)]
    Coaching(#[from] CoachingError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
