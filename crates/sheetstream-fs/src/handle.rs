use sheetstream_client::SheetDirectory;
use sheetstream_core::{AccessMode, SheetError, SheetId, SheetIdentity, TabularMatrix};
use std::io::{self, Read, Write};

use crate::stream::SheetStream;

/// An open sheet.
///
/// The handle is not notified when the sheet is removed or renamed
/// elsewhere; later reads and writes then fail with the remote's error.
#[derive(Debug)]
pub struct SheetHandle {
    identity: SheetIdentity,
    access: AccessMode,
    stream: SheetStream,
}

impl SheetHandle {
    pub(crate) fn new(identity: SheetIdentity, access: AccessMode, directory: SheetDirectory) -> Self {
        let stream = SheetStream::new(directory, identity.container.clone(), identity.name.clone());
        Self {
            identity,
            access,
            stream,
        }
    }

    /// Remote-assigned sheet id
    pub fn id(&self) -> SheetId {
        self.identity.sheet_id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Id of the spreadsheet holding this sheet
    pub fn container(&self) -> &str {
        &self.identity.container
    }

    pub fn identity(&self) -> &SheetIdentity {
        &self.identity
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    /// Fetch all rows as a matrix
    pub fn read_matrix(&self) -> Result<TabularMatrix, SheetError> {
        self.stream.read_matrix()
    }

    /// Append rows with a single request
    pub fn write_matrix(&mut self, matrix: &TabularMatrix) -> Result<(), SheetError> {
        self.stream.write_matrix(matrix)
    }
}

impl Read for SheetHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for SheetHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
