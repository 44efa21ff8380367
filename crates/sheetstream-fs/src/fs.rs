use sheetstream_client::{ApiConfig, ClientConfig, Connector, HttpConnector, SheetDirectory};
use sheetstream_core::{AccessMode, OpenFlags, OpenIntent, SheetError, SheetId, SheetIdentity};
use std::sync::Arc;

use crate::handle::SheetHandle;
use crate::open::open_with_directory;

/// File-system style entry point to the sheets of remote spreadsheets
#[derive(Debug, Clone)]
pub struct SheetFs {
    connector: Arc<dyn Connector>,
    api: ApiConfig,
}

impl SheetFs {
    pub fn new(connector: Arc<dyn Connector>, api: ApiConfig) -> Self {
        Self { connector, api }
    }

    /// Talk to the real API with bearer tokens from `config`
    pub fn from_config(config: ClientConfig) -> Self {
        let api = config.api.clone();
        Self::new(Arc::new(HttpConnector::new(config)), api)
    }

    /// Open a sheet by name.
    ///
    /// `CREATE` makes a missing sheet, `EXCLUSIVE` fails on an existing one
    /// and `TRUNCATE` clears an existing one. `READ_ONLY` only selects the
    /// credential scope.
    #[tracing::instrument(skip(self))]
    pub fn open(
        &self,
        container: &str,
        name: &str,
        flags: OpenFlags,
    ) -> Result<SheetHandle, SheetError> {
        let intent = OpenIntent::from_flags(flags)?;
        let directory = self.directory(intent.access)?;
        open_with_directory(directory, container, name, intent)
    }

    /// Create or truncate a sheet and open it read-write
    pub fn create(&self, container: &str, name: &str) -> Result<SheetHandle, SheetError> {
        self.open(
            container,
            name,
            OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
        )
    }

    /// Whether a sheet with this name exists
    pub fn exists(&self, container: &str, name: &str) -> Result<bool, SheetError> {
        let directory = self.directory(AccessMode::ReadOnly)?;
        Ok(directory.find_sheet_id(container, name)?.is_some())
    }

    /// Delete a sheet by id
    pub fn remove(&self, container: &str, sheet_id: SheetId) -> Result<(), SheetError> {
        self.directory(AccessMode::ReadWrite)?
            .delete_sheet(container, sheet_id)
    }

    /// Delete a sheet by name, returning the id it had
    pub fn remove_by_name(&self, container: &str, name: &str) -> Result<SheetId, SheetError> {
        let directory = self.directory(AccessMode::ReadWrite)?;
        let sheet_id = directory.sheet_id(container, name)?;
        directory.delete_sheet(container, sheet_id)?;
        Ok(sheet_id)
    }

    /// Rename a sheet. Open handles to the old name become dangling.
    pub fn rename(&self, container: &str, from: &str, to: &str) -> Result<SheetIdentity, SheetError> {
        let directory = self.directory(AccessMode::ReadWrite)?;
        let sheet_id = directory.sheet_id(container, from)?;
        directory.rename_sheet(container, sheet_id, to)?;
        Ok(SheetIdentity::new(container, sheet_id, to))
    }

    /// Directory client whose transport carries credentials for `mode`
    pub fn directory(&self, mode: AccessMode) -> Result<SheetDirectory, SheetError> {
        let transport = self.connector.connect(mode)?;
        Ok(SheetDirectory::new(transport, self.api.clone()))
    }
}
