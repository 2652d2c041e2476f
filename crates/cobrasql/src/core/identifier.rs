//! Identifier validation for SQL built by string concatenation.
//!
//! Table and column names are spliced into statement text unquoted, so every
//! name that reaches a statement goes through [`validate_identifier`] first
//! (either directly, or by being looked up in a table's column set, whose
//! members were validated when they were defined).
//!
//! Accepted identifiers are plain words: ASCII letters, digits, `_` and `$`,
//! not starting with a digit. That is the common subset both SQLite and MySQL
//! accept without quoting.

use crate::error::{CobraError, Result};

/// Maximum identifier length.
/// - MySQL: 64 characters
/// - SQLite: unlimited
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate a table or column name.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
/// - Anything that is not a plain word (quotes, spaces, semicolons, ...)
///
/// # Errors
///
/// Returns `CobraError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CobraError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(CobraError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(CobraError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(CobraError::Config(format!(
            "Identifier cannot start with a digit: {:?}",
            name
        )));
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$'))
    {
        return Err(CobraError::Config(format!(
            "SECURITY: Identifier contains invalid character {:?}: {:?}",
            bad, name
        )));
    }

    Ok(())
}

/// Quote an identifier with double quotes for SQLite metadata statements
/// (`PRAGMA table_info(...)`), where the name comes from the catalog itself.
pub fn quote_sqlite(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
