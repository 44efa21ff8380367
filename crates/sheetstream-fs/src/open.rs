//! Open-flag resolution.
//!
//! Opening a sheet first looks it up by name, then [`resolve`] decides from
//! the lookup result and the normalized flags what has to happen. The
//! decision is a pure function so the whole table can be checked without a
//! remote.

use sheetstream_client::SheetDirectory;
use sheetstream_core::{OpenIntent, SheetError, SheetId, SheetIdentity};

use crate::handle::SheetHandle;

/// Result of looking the sheet up by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Exists(SheetId),
    NotExists,
}

impl From<Option<SheetId>> for Existence {
    fn from(lookup: Option<SheetId>) -> Self {
        match lookup {
            Some(id) => Existence::Exists(id),
            None => Existence::NotExists,
        }
    }
}

/// What an open call has to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Use the existing sheet as it is
    Reuse(SheetId),
    /// Clear the existing sheet's values, then use it
    Truncate(SheetId),
    /// Create the sheet, then use it
    Create,
    FailAlreadyExists,
    FailNotFound,
}

/// Decide the outcome of an open. Exclusive wins over truncate.
pub fn resolve(existence: Existence, intent: &OpenIntent) -> Resolution {
    match existence {
        Existence::Exists(_) if intent.exclusive => Resolution::FailAlreadyExists,
        Existence::Exists(id) if intent.truncate => Resolution::Truncate(id),
        Existence::Exists(id) => Resolution::Reuse(id),
        Existence::NotExists if intent.create => Resolution::Create,
        Existence::NotExists => Resolution::FailNotFound,
    }
}

/// Look the sheet up, act on the resolution and hand out a handle
pub(crate) fn open_with_directory(
    directory: SheetDirectory,
    container: &str,
    name: &str,
    intent: OpenIntent,
) -> Result<SheetHandle, SheetError> {
    let existence = Existence::from(directory.find_sheet_id(container, name)?);

    let sheet_id = match resolve(existence, &intent) {
        Resolution::FailAlreadyExists => return Err(SheetError::already_exists(container, name)),
        Resolution::FailNotFound => return Err(SheetError::not_found(container, name)),
        Resolution::Reuse(id) => id,
        Resolution::Truncate(id) => {
            directory.clear_values(container, name)?;
            tracing::info!(container, name, sheet_id = %id, "truncated sheet");
            id
        }
        Resolution::Create => directory.create_sheet(container, name)?,
    };

    Ok(SheetHandle::new(
        SheetIdentity::new(container, sheet_id, name),
        intent.access,
        directory,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetstream_core::AccessMode;

    fn intent(create: bool, exclusive: bool, truncate: bool) -> OpenIntent {
        OpenIntent {
            access: AccessMode::ReadWrite,
            create,
            exclusive,
            truncate,
        }
    }

    #[test]
    fn test_resolution_table() {
        let id = SheetId(7);
        for create in [false, true] {
            for exclusive in [false, true] {
                for truncate in [false, true] {
                    let intent = intent(create, exclusive, truncate);

                    let expected_existing = if exclusive {
                        Resolution::FailAlreadyExists
                    } else if truncate {
                        Resolution::Truncate(id)
                    } else {
                        Resolution::Reuse(id)
                    };
                    assert_eq!(
                        resolve(Existence::Exists(id), &intent),
                        expected_existing,
                        "existing sheet with {:?}",
                        intent
                    );

                    let expected_missing = if create {
                        Resolution::Create
                    } else {
                        Resolution::FailNotFound
                    };
                    assert_eq!(
                        resolve(Existence::NotExists, &intent),
                        expected_missing,
                        "missing sheet with {:?}",
                        intent
                    );
                }
            }
        }
    }

    #[test]
    fn test_exclusive_beats_truncate() {
        assert_eq!(
            resolve(Existence::Exists(SheetId(1)), &intent(true, true, true)),
            Resolution::FailAlreadyExists
        );
    }

    #[test]
    fn test_access_mode_does_not_change_outcome() {
        let mut read_only = intent(false, false, true);
        read_only.access = AccessMode::ReadOnly;
        assert_eq!(
            resolve(Existence::Exists(SheetId(0)), &read_only),
            resolve(Existence::Exists(SheetId(0)), &intent(false, false, true))
        );
    }

    #[test]
    fn test_zero_id_counts_as_existing() {
        assert_eq!(Existence::from(Some(SheetId(0))), Existence::Exists(SheetId(0)));
        assert_eq!(Existence::from(None), Existence::NotExists);
    }
}
