//! Error types for rowbind

use thiserror::Error;

/// Result type alias for rowbind operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for connection, result and active record operations
#[derive(Debug, Error)]
pub enum DbError {
    /// No connection is registered under the requested name
    #[error("DB connection \"{0}\" does not exist")]
    ConnectionNotFound(String),

    /// The connection has not been registered under a name yet
    #[error("Database connection not named")]
    UnnamedConnection,

    /// The driver handle is closed or was never opened
    #[error("Connection handle not available for \"{connection}\" of type {driver}")]
    HandleUnavailable { connection: String, driver: String },

    /// Opening a connection failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver rejected a statement
    #[error("Query error: {message}{}", .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Query {
        message: String,
        code: Option<String>,
    },

    /// A result set was read after being freed
    #[error("DB result is not available (either null or freed)")]
    ResultExpired,

    /// Key tuple and column tuple lengths disagree
    #[error("Cardinality mismatch: {0}")]
    CardinalityMismatch(String),

    /// Write or load touches fields outside the table schema
    #[error("Fields not allowed on `{table}`: {}", .fields.join(", "))]
    FieldNotAllowed { table: String, fields: Vec<String> },

    /// A load is missing fields it was required to carry
    #[error("Active record load missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    /// More than one row matches a binding that must be unique
    #[error("Multiple records in `{table}` match active record binding {binding}")]
    DuplicateKey { table: String, binding: String },

    /// Read of a field that is neither buffered, loaded, nor part of the key
    #[error("Undefined field `{field}` on active record for `{table}`")]
    UndefinedField { table: String, field: String },

    /// Operation not valid in the record's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a query error carrying the driver's native message and code
    pub fn query(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            code,
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a cardinality mismatch error
    pub fn cardinality(message: impl Into<String>) -> Self {
        Self::CardinalityMismatch(message.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Native driver error code, if this is a query error that carries one
    pub fn query_code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Check if this is a query error
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Check if this is a duplicate key violation
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Check if this is an undefined field error
    pub fn is_undefined_field(&self) -> bool {
        matches!(self, Self::UndefinedField { .. })
    }

    /// Check if this is a field-not-allowed error
    pub fn is_field_not_allowed(&self) -> bool {
        matches!(self, Self::FieldNotAllowed { .. })
    }

    /// Check if this is a cardinality mismatch
    pub fn is_cardinality_mismatch(&self) -> bool {
        matches!(self, Self::CardinalityMismatch(_))
    }

    /// Check if this is an invalid state error
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Check if this is an expired result error
    pub fn is_result_expired(&self) -> bool {
        matches!(self, Self::ResultExpired)
    }

    /// Check if the connection handle was unavailable
    pub fn is_handle_unavailable(&self) -> bool {
        matches!(self, Self::HandleUnavailable { .. })
    }
}
