//! Error types for the cobrasql library.

use thiserror::Error;

/// Main error type for engine, table and schema operations.
#[derive(Error, Debug)]
pub enum CobraError {
    /// Configuration error (missing file path, empty credentials, bad identifier, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A column definition breaks the rules of its type descriptor.
    #[error("Invalid definition for column {column}: {violation}")]
    Integrity {
        column: String,
        violation: IntegrityViolation,
    },

    /// A second column with the same name was added to a schema.
    #[error("Column {0} is already defined")]
    DuplicateColumn(String),

    /// A second primary key column was added to a schema.
    #[error("Cannot add {rejected} as primary key: {existing} is already the primary key")]
    DuplicatePrimaryKey { existing: String, rejected: String },

    /// Introspection found a column type with no registered descriptor.
    #[error("Unsupported type '{type_name}' for column {column}")]
    UnsupportedType { column: String, type_name: String },

    /// The requested database driver was not compiled into this build.
    #[error("{0} driver is not available. Rebuild with the `{0}` feature enabled.")]
    DriverUnavailable(&'static str),

    /// Connecting to (or validating) the database failed.
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// A statement failed and was rolled back.
    #[error("Statement failed: {source}\n  Statement: {statement}")]
    Statement {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    /// Other database error (metadata queries, transaction control).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A statement referenced a column the table does not have.
    #[error("Table {table} has no column named {column}")]
    UnknownColumn { table: String, column: String },

    /// The operation needs a primary key and the table has none.
    #[error("Table {0} has no primary key")]
    NoPrimaryKey(String),

    /// Positional insert with the wrong number of values.
    #[error("Table {table} expects {expected} values, got {actual}")]
    ValueCount {
        table: String,
        expected: usize,
        actual: usize,
    },

    /// A row cannot be turned into a statement.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// The dialect has no spelling for the requested operation.
    #[error("{operation} is not supported by the {dialect} dialect")]
    Unsupported {
        operation: &'static str,
        dialect: &'static str,
    },

    /// The engine has been shut down (or dropped) and accepts no more work.
    #[error("Engine has been shut down")]
    EngineClosed,

    /// Internal error (e.g., worker join failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error (config file reads)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A single rule of a type descriptor that a column definition violated.
///
/// Rules are checked in the order the variants are declared; the first
/// violated rule is the one reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("precision for type {type_name} must be between {min} and {max}, got {actual}")]
    PrecisionOutOfRange {
        type_name: &'static str,
        min: u32,
        max: u32,
        actual: u32,
    },

    #[error("scale for type {type_name} must be between {min} and {max}, got {actual}")]
    ScaleOutOfRange {
        type_name: &'static str,
        min: u32,
        max: u32,
        actual: u32,
    },

    #[error("type {type_name} cannot be UNSIGNED")]
    UnsignedNotSupported { type_name: &'static str },

    #[error("primary key column cannot be nullable")]
    NullablePrimaryKey,

    #[error("auto increment column must be the primary key")]
    AutoincrementWithoutPrimary,

    #[error("auto increment column must be of type INTEGER, not {type_name}")]
    AutoincrementNotInteger { type_name: &'static str },

    #[error("auto increment column must be UNSIGNED")]
    AutoincrementSigned,
}

impl CobraError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        CobraError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Wrap a failed statement together with its text
    pub fn statement(statement: impl Into<String>, source: sqlx::Error) -> Self {
        CobraError::Statement {
            statement: statement.into(),
            source,
        }
    }

    /// Create an UnknownColumn error
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        CobraError::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// The integrity violation carried by this error, if any.
    pub fn violation(&self) -> Option<&IntegrityViolation> {
        match self {
            CobraError::Integrity { violation, .. } => Some(violation),
            _ => None,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for cobrasql operations.
pub type Result<T> = std::result::Result<T, CobraError>;
