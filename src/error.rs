//! Error types for BotWise.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),

    #[error("Dialog error: {0}")]
    Dialog(#[from] DialogError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("No channel registered under {0}")]
    UnknownChannel(String),
}

/// Natural-language recognizer errors.
///
/// These never reach the dialog layer: the bot turns them into an empty
/// recognition result.
#[derive(Debug, thiserror::Error)]
pub enum RecognizerError {
    #[error("Recognizer {recognizer} request failed: {reason}")]
    RequestFailed { recognizer: String, reason: String },

    #[error("Recognizer {recognizer} returned status {status}")]
    BadStatus { recognizer: String, status: u16 },

    #[error("Invalid response from {recognizer}: {reason}")]
    InvalidResponse { recognizer: String, reason: String },
}

/// Dialog sequencing errors.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Dialog {0} is not registered")]
    UnknownDialog(String),

    #[error("Dialog {dialog} exceeded {limit} step transitions in one turn")]
    StepLimitExceeded { dialog: String, limit: usize },

    #[error("Dialog {0} was registered twice")]
    DuplicateDialog(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
