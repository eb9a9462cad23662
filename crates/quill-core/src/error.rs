//! Error types for query building and execution.

/// Errors raised by the builder, the escaping service and the connection.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// A statement needs a target table but none was defined.
    #[error("You must set a table before calling {operation}()")]
    NoTable {
        /// The terminal operation that was attempted.
        operation: &'static str,
    },

    /// A statement needs a payload but the data was empty.
    #[error("You must supply data to {operation}()")]
    EmptyData {
        /// The terminal operation that was attempted.
        operation: &'static str,
    },

    /// Input that cannot be interpreted unambiguously.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The active dialect lacks the requested capability.
    #[error("This feature is not available for the database you are using ({feature} on {dialect})")]
    Unsupported {
        /// The feature that was requested.
        feature: &'static str,
        /// Name of the active dialect.
        dialect: &'static str,
    },

    /// A statement had to be executed but no executor is attached.
    #[error("No executor is attached to this connection")]
    NotConnected,

    /// The executor reported a failure.
    #[error("Execution error: {0}")]
    Execution(String),

    /// A serde payload could not be turned into a record.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
