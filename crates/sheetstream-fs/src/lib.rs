pub mod fs;
pub mod handle;
pub mod open;
pub mod stream;

pub use fs::SheetFs;
pub use handle::SheetHandle;
pub use open::{resolve, Existence, Resolution};
pub use stream::SheetStream;

pub use sheetstream_core::{OpenFlags, SheetError, SheetId, SheetIdentity, TabularMatrix};
