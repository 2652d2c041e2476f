//! The set of column definitions belonging to one table.

use serde::{Deserialize, Serialize};

use crate::core::column::ColumnDef;
use crate::error::{CobraError, Result};

/// What happens to the primary key slot when the primary column is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKeyPolicy {
    /// Removing the primary column frees the slot for a new primary key.
    #[default]
    ReleaseOnRemove,
    /// Once a primary key has been accepted the slot stays taken.
    Reserved,
}

/// Column definitions of one table, unique by (case-insensitive) name, with
/// at most one primary key.
///
/// Members keep insertion order; generated SQL lists columns in that order.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<ColumnDef>,
    has_primary: bool,
    policy: PrimaryKeyPolicy,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: PrimaryKeyPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build a set from caller-supplied columns, failing on the first
    /// duplicate name or second primary key.
    pub fn from_columns(
        columns: impl IntoIterator<Item = ColumnDef>,
        policy: PrimaryKeyPolicy,
    ) -> Result<Self> {
        let mut set = Self::with_policy(policy);
        for column in columns {
            set.add(column)?;
        }
        Ok(set)
    }

    pub fn policy(&self) -> PrimaryKeyPolicy {
        self.policy
    }

    /// Add a column.
    ///
    /// Returns `Ok(false)` if an identical column is already present. Fails
    /// with `DuplicatePrimaryKey` when the primary slot is taken and with
    /// `DuplicateColumn` when a different column already uses the name. The
    /// set is unchanged on failure.
    pub fn add(&mut self, column: ColumnDef) -> Result<bool> {
        if self.columns.contains(&column) {
            return Ok(false);
        }
        if column.is_primary() && self.has_primary {
            let existing = self
                .primary_key()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "a removed column".to_string());
            return Err(CobraError::DuplicatePrimaryKey {
                existing,
                rejected: column.name().to_string(),
            });
        }
        if self.contains(column.name()) {
            return Err(CobraError::DuplicateColumn(column.name().to_string()));
        }

        if column.is_primary() {
            self.has_primary = true;
        }
        self.columns.push(column);
        Ok(true)
    }

    /// Remove a column by name, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<ColumnDef> {
        let index = self.position(name)?;
        let removed = self.columns.remove(index);
        if removed.is_primary() && self.policy == PrimaryKeyPolicy::ReleaseOnRemove {
            self.has_primary = false;
        }
        Some(removed)
    }

    /// Swap in a new definition for an existing column of the same name,
    /// returning the old one. `Ok(None)` if no such column exists.
    ///
    /// The primary key rule still applies: the replacement may only be
    /// primary if no other column is and, under
    /// [`PrimaryKeyPolicy::Reserved`], the slot was not left by a removed
    /// column.
    pub fn replace(&mut self, column: ColumnDef) -> Result<Option<ColumnDef>> {
        let Some(index) = self.position(column.name()) else {
            return Ok(None);
        };

        if column.is_primary() && !self.columns[index].is_primary() && self.has_primary {
            let existing = self
                .primary_key()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "a removed column".to_string());
            return Err(CobraError::DuplicatePrimaryKey {
                existing,
                rejected: column.name().to_string(),
            });
        }

        let old = std::mem::replace(&mut self.columns[index], column);
        if self.columns[index].is_primary() {
            self.has_primary = true;
        } else if old.is_primary() && self.policy == PrimaryKeyPolicy::ReleaseOnRemove {
            self.has_primary = false;
        }
        Ok(Some(old))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.has_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether the primary key slot is taken.
    pub fn has_primary(&self) -> bool {
        self.has_primary
    }

    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_primary())
    }

    /// Columns an INSERT supplies values for (all but a generated key).
    pub fn insertable(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.is_generated())
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDef> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.has_name(name))
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnDef;
    type IntoIter = std::slice::Iter<'a, ColumnDef>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
