use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::SheetError;

bitflags! {
    /// File-style open flags for a sheet.
    ///
    /// At most one of `READ_ONLY` / `READ_WRITE` may be set; with neither,
    /// read-write is assumed. The remaining flags may be or'ed in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open the sheet read-only
        const READ_ONLY = 1 << 0;
        /// Open the sheet read-write
        const READ_WRITE = 1 << 1;
        /// Create the sheet if it does not exist
        const CREATE = 1 << 2;
        /// Fail if the sheet already exists
        const EXCLUSIVE = 1 << 3;
        /// Clear the sheet's values when it is opened
        const TRUNCATE = 1 << 4;
    }
}

/// Which credential scope the transport is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Open flags normalized into explicit fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenIntent {
    pub access: AccessMode,
    pub create: bool,
    pub exclusive: bool,
    pub truncate: bool,
}

impl OpenIntent {
    /// Normalize flags, rejecting a request for both read modes
    pub fn from_flags(flags: OpenFlags) -> Result<Self, SheetError> {
        let access = match (
            flags.contains(OpenFlags::READ_ONLY),
            flags.contains(OpenFlags::READ_WRITE),
        ) {
            (true, true) => {
                return Err(SheetError::InvalidArgument(
                    "READ_ONLY and READ_WRITE are mutually exclusive".to_string(),
                ))
            }
            (true, false) => AccessMode::ReadOnly,
            _ => AccessMode::ReadWrite,
        };

        Ok(Self {
            access,
            create: flags.contains(OpenFlags::CREATE),
            exclusive: flags.contains(OpenFlags::EXCLUSIVE),
            truncate: flags.contains(OpenFlags::TRUNCATE),
        })
    }
}

impl TryFrom<OpenFlags> for OpenIntent {
    type Error = SheetError;

    fn try_from(flags: OpenFlags) -> Result<Self, Self::Error> {
        OpenIntent::from_flags(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_access_is_read_write() {
        let intent = OpenIntent::from_flags(OpenFlags::CREATE).unwrap();
        assert_eq!(intent.access, AccessMode::ReadWrite);
        assert!(intent.create);
        assert!(!intent.exclusive);
        assert!(!intent.truncate);
    }

    #[test]
    fn test_read_only() {
        let intent = OpenIntent::from_flags(OpenFlags::READ_ONLY).unwrap();
        assert_eq!(intent.access, AccessMode::ReadOnly);
    }

    #[test]
    fn test_all_modifiers() {
        let flags = OpenFlags::CREATE | OpenFlags::EXCLUSIVE | OpenFlags::TRUNCATE;
        let intent = OpenIntent::try_from(flags).unwrap();
        assert!(intent.create && intent.exclusive && intent.truncate);
    }

    #[test]
    fn test_empty_flags() {
        let intent = OpenIntent::from_flags(OpenFlags::empty()).unwrap();
        assert_eq!(intent.access, AccessMode::ReadWrite);
        assert!(!intent.create && !intent.exclusive && !intent.truncate);
    }

    #[test]
    fn test_both_read_modes_rejected() {
        let result = OpenIntent::from_flags(OpenFlags::READ_ONLY | OpenFlags::READ_WRITE);
        assert!(matches!(result, Err(SheetError::InvalidArgument(_))));
    }
}
