//! Column definitions.

use std::fmt;

use crate::core::identifier::validate_identifier;
use crate::core::types::{HostType, SqlType, TypeDescriptor};
use crate::error::{CobraError, Result};

/// The four independent column flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ColumnFlags {
    pub primary: bool,
    pub autoincrement: bool,
    pub not_null: bool,
    pub unsigned: bool,
}

/// Immutable description of one table column.
///
/// A `ColumnDef` can only be obtained through [`ColumnDef::builder`], which
/// validates the name and checks precision, scale and flags against the
/// column's [`TypeDescriptor`]. An existing definition is therefore always
/// valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDef {
    name: String,
    sql_type: SqlType,
    precision: u32,
    scale: u32,
    flags: ColumnFlags,
}

impl ColumnDef {
    /// Start defining a column of the given type.
    pub fn builder(name: impl Into<String>, sql_type: SqlType) -> ColumnDefBuilder {
        ColumnDefBuilder {
            name: name.into(),
            sql_type,
            precision: None,
            scale: None,
            flags: ColumnFlags::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.sql_type.descriptor()
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn flags(&self) -> ColumnFlags {
        self.flags
    }

    pub fn is_primary(&self) -> bool {
        self.flags.primary
    }

    pub fn is_autoincrement(&self) -> bool {
        self.flags.autoincrement
    }

    pub fn is_not_null(&self) -> bool {
        self.flags.not_null
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.unsigned
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Whether the database generates this column's value on insert.
    pub fn is_generated(&self) -> bool {
        self.flags.primary && self.flags.autoincrement
    }

    /// The host representation values of this column decode into.
    pub fn representation(&self) -> HostType {
        self.descriptor()
            .representation(self.precision, self.flags.unsigned)
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.descriptor();
        write!(f, "{} {}", self.name, d.name)?;
        if d.scaled {
            write!(f, "({},{})", self.precision, self.scale)?;
        } else if d.sized {
            write!(f, "({})", self.precision)?;
        }
        if self.flags.unsigned {
            f.write_str(" UNSIGNED")?;
        }
        if self.flags.not_null {
            f.write_str(" NOT NULL")?;
        }
        if self.flags.primary {
            f.write_str(" PRIMARY KEY")?;
        }
        if self.flags.autoincrement {
            f.write_str(" AUTOINCREMENT")?;
        }
        Ok(())
    }
}

/// Builder for [`ColumnDef`].
#[derive(Debug, Clone)]
pub struct ColumnDefBuilder {
    name: String,
    sql_type: SqlType,
    precision: Option<u32>,
    scale: Option<u32>,
    flags: ColumnFlags,
}

impl ColumnDefBuilder {
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Mark as primary key. A primary key is also NOT NULL.
    pub fn primary(mut self) -> Self {
        self.flags.primary = true;
        self.flags.not_null = true;
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.flags.autoincrement = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.flags.not_null = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.flags.unsigned = true;
        self
    }

    /// Replace all four flags at once, exactly as given.
    pub fn flags(mut self, flags: ColumnFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Validate and produce the definition.
    pub fn build(self) -> Result<ColumnDef> {
        validate_identifier(&self.name)?;

        let d = self.sql_type.descriptor();
        let precision = self.precision.unwrap_or(d.precision.default);
        let scale = self.scale.unwrap_or(d.scale.default);

        d.verify_integrity(precision, scale, self.flags)
            .map_err(|violation| CobraError::Integrity {
                column: self.name.clone(),
                violation,
            })?;

        Ok(ColumnDef {
            name: self.name,
            sql_type: self.sql_type,
            precision,
            scale,
            flags: self.flags,
        })
    }
}
