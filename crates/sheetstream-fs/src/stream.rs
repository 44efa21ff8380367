use sheetstream_client::SheetDirectory;
use sheetstream_core::{
    matrix_to_text_table, text_table_to_matrix, SheetError, TabularMatrix,
};
use std::io::{self, Cursor, Read, Write};

/// Byte-stream view of one sheet's values.
///
/// Reading fetches the whole sheet on the first call and serves the cached
/// comma-separated rendering afterwards. Every non-empty write is parsed as
/// whole rows and appended with exactly one request; a chunk that stops
/// mid-row fails with `InvalidData` and sends nothing.
#[derive(Debug)]
pub struct SheetStream {
    directory: SheetDirectory,
    container: String,
    name: String,
    read_cache: Option<Cursor<Vec<u8>>>,
}

impl SheetStream {
    pub fn new(directory: SheetDirectory, container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            directory,
            container: container.into(),
            name: name.into(),
            read_cache: None,
        }
    }

    /// Fetch the current rows. Always goes to the remote; the read cache is
    /// neither used nor filled.
    pub fn read_matrix(&self) -> Result<TabularMatrix, SheetError> {
        self.directory.get_values(&self.container, &self.name)
    }

    /// Append rows with one request
    pub fn write_matrix(&mut self, matrix: &TabularMatrix) -> Result<(), SheetError> {
        self.directory
            .append_values(&self.container, &self.name, matrix)
    }

    fn cache(&mut self) -> Result<&mut Cursor<Vec<u8>>, SheetError> {
        if self.read_cache.is_none() {
            let matrix = self.read_matrix()?;
            let bytes = matrix_to_text_table(&matrix)?;
            tracing::debug!(
                container = %self.container,
                name = %self.name,
                rows = matrix.len(),
                bytes = bytes.len(),
                "cached sheet for reading"
            );
            self.read_cache = Some(Cursor::new(bytes));
        }
        Ok(self.read_cache.get_or_insert_with(Default::default))
    }
}

impl Read for SheetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cache()?.read(buf)
    }
}

impl Write for SheetStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let matrix = text_table_to_matrix(buf)?;
        self.write_matrix(&matrix)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetstream_testkit::{FakeSheets, RequestKind};
    use std::sync::Arc;

    fn stream(fake: &FakeSheets, name: &str) -> SheetStream {
        let directory = SheetDirectory::new(Arc::new(fake.clone()), fake.api_config());
        SheetStream::new(directory, "doc", name)
    }

    fn fake_with(rows: TabularMatrix) -> FakeSheets {
        let fake = FakeSheets::new();
        fake.add_spreadsheet("doc");
        fake.add_sheet("doc", "Data", rows);
        fake
    }

    #[test]
    fn test_read_serves_whole_table_from_one_fetch() {
        let fake = fake_with(TabularMatrix::from_rows([vec!["0", "1"], vec!["2"]]));
        let mut stream = stream(&fake, "Data");

        let mut first = [0u8; 2];
        stream.read_exact(&mut first).unwrap();
        let mut rest = String::new();
        stream.read_to_string(&mut rest).unwrap();

        assert_eq!(format!("{}{}", String::from_utf8_lossy(&first), rest), "0,1\n2\n");
        assert_eq!(fake.count(RequestKind::GetValues), 1);

        // Exhausted cache keeps reporting end of stream without refetching
        assert_eq!(stream.read(&mut [0u8; 8]).unwrap(), 0);
        assert_eq!(fake.count(RequestKind::GetValues), 1);
    }

    #[test]
    fn test_each_write_is_one_append() {
        let fake = fake_with(TabularMatrix::new());
        let mut stream = stream(&fake, "Data");

        assert_eq!(stream.write(b"a,b\nc,d\n").unwrap(), 8);
        stream.write_all(b"e\n").unwrap();

        assert_eq!(fake.count(RequestKind::AppendValues), 2);
        assert_eq!(
            fake.values("doc", "Data").unwrap(),
            TabularMatrix::from_rows([vec!["a", "b"], vec!["c", "d"], vec!["e"]])
        );
    }

    #[test]
    fn test_empty_write_sends_nothing() {
        let fake = fake_with(TabularMatrix::new());
        let mut stream = stream(&fake, "Data");
        assert_eq!(stream.write(b"").unwrap(), 0);
        assert!(fake.requests().is_empty());
    }

    #[test]
    fn test_mid_row_write_is_rejected_before_sending() {
        let fake = fake_with(TabularMatrix::new());
        let mut stream = stream(&fake, "Data");

        let err = stream.write(b"a,\"half").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            err.get_ref().and_then(|e| e.downcast_ref::<SheetError>()),
            Some(SheetError::Decode { .. })
        ));
        assert!(fake.requests().is_empty());
    }

    #[test]
    fn test_write_ending_mid_row_is_rejected() {
        let fake = fake_with(TabularMatrix::new());
        let mut stream = stream(&fake, "Data");

        let err = stream.write(b"a,b\nc,").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            err.get_ref().and_then(|e| e.downcast_ref::<SheetError>()),
            Some(SheetError::Decode { row: 2, .. })
        ));
        assert!(fake.requests().is_empty());

        stream.write_all(b"a,b\nc,d\n").unwrap();
        assert_eq!(
            fake.values("doc", "Data").unwrap(),
            TabularMatrix::from_rows([["a", "b"], ["c", "d"]])
        );
    }

    #[test]
    fn test_buffered_copy_never_splits_rows() {
        let fake = fake_with(TabularMatrix::new());
        let mut stream = stream(&fake, "Data");

        // 10-byte rows never line up with an 8 KiB buffer
        let text: String = (0..2000).map(|i| format!("r{:04},abc\n", i)).collect();
        let mut reader = io::BufReader::with_capacity(8192, text.as_bytes());

        let err = io::copy(&mut reader, &mut stream).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(fake.count(RequestKind::AppendValues), 0);
        assert!(fake.values("doc", "Data").unwrap().is_empty());

        // Chunks cut at row boundaries go through intact
        for chunk in text.as_bytes().chunks(10 * 250) {
            stream.write_all(chunk).unwrap();
        }
        let stored = fake.values("doc", "Data").unwrap();
        assert_eq!(stored.len(), 2000);
        assert_eq!(stored.cell(1999, 0), Some("r1999"));
    }

    #[test]
    fn test_read_of_deleted_sheet_fails_at_first_read() {
        let fake = FakeSheets::new();
        fake.add_spreadsheet("doc");
        let mut stream = stream(&fake, "Gone");

        let err = stream.read(&mut [0u8; 4]).unwrap_err();
        let source = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<SheetError>())
            .expect("sheet error inside io error");
        assert_eq!(source.status_code(), Some(400));
    }

    #[test]
    fn test_failed_first_read_is_retried_on_next_read() {
        let fake = fake_with(TabularMatrix::from_rows([["x"]]));
        fake.fail_next(RequestKind::GetValues, 503);
        let mut stream = stream(&fake, "Data");

        assert!(stream.read(&mut [0u8; 4]).is_err());
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "x\n");
    }
}
