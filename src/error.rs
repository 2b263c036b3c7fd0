use snafu::Snafu;

/// Error taxonomy for the reprocessing pipeline.
///
/// Decode-class errors (`Decode`, `UnknownTopic`) are recovered per message:
/// the engine records them and moves on. Dispatch-class errors
/// (`UnknownTarget`, `Dispatch`) are not caught anywhere and abort the run.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Error returned from database"))]
    Sqlx {
        #[snafu(source)]
        source: sqlx::Error,
    },

    #[snafu(display("Error running migrations"))]
    Migration {
        #[snafu(source)]
        source: sqlx::migrate::MigrateError,
    },

    #[snafu(display("Unable to decode message body for topic {topic}: {message}"))]
    Decode { topic: String, message: String },

    #[snafu(display("No schema registered for topic {topic}"))]
    UnknownTopic { topic: String },

    #[snafu(display("Unknown handler target {target}"))]
    UnknownTarget { target: String },

    #[snafu(display("Handler {target}::{method} failed for message {message_id}"))]
    Dispatch {
        target: String,
        method: String,
        message_id: i64,
        #[snafu(source(false))]
        source: Option<eyre::Report>,
    },

    #[snafu(display("Invalid handler descriptor: {message}"))]
    InvalidDescriptor { message: String },

    #[snafu(display("Invalid topology: {message}"))]
    Topology {
        message: String,
        #[snafu(source(false))]
        source: Option<eyre::Report>,
    },
}

impl From<sqlx::Error> for Error {
    fn from(source: sqlx::Error) -> Self {
        Self::Sqlx { source }
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(source: sqlx::migrate::MigrateError) -> Self {
        Self::Migration { source }
    }
}

impl Error {
    pub fn decode(topic: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            topic: topic.into(),
            message: message.to_string(),
        }
    }

    pub fn unknown_topic(topic: impl Into<String>) -> Self {
        Self::UnknownTopic {
            topic: topic.into(),
        }
    }

    pub fn unknown_target(target: impl Into<String>) -> Self {
        Self::UnknownTarget {
            target: target.into(),
        }
    }

    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            message: message.into(),
        }
    }

    pub fn topology(message: impl Into<String>, source: impl Into<eyre::Report>) -> Self {
        Self::Topology {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this error is recovered per message by the engine loop.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::UnknownTopic { .. })
    }
}
