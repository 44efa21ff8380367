use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric sheet id assigned by the remote system.
///
/// Zero is a valid id (the first sheet of a new spreadsheet usually has it),
/// so absence is always expressed with `Option<SheetId>`, never with a
/// sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(pub i64);

impl SheetId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SheetId {
    fn from(id: i64) -> Self {
        SheetId(id)
    }
}

/// Where a sheet lives and what it is called
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetIdentity {
    /// Spreadsheet (container) id, supplied by the caller
    pub container: String,
    /// Remote-assigned id, immutable after creation
    pub sheet_id: SheetId,
    /// Tab title, mutable through rename
    pub name: String,
}

impl SheetIdentity {
    pub fn new(container: impl Into<String>, sheet_id: SheetId, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            sheet_id,
            name: name.into(),
        }
    }
}

impl fmt::Display for SheetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (#{})", self.container, self.name, self.sheet_id)
    }
}
