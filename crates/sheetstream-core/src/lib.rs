pub mod codec;
pub mod error;
pub mod flags;
pub mod identity;
pub mod matrix;

pub use codec::{
    decode_wire_values, encode_wire_values, matrix_to_text_table, text_table_to_matrix,
    ValueRange,
};
pub use error::{BoxError, SheetError};
pub use flags::{AccessMode, OpenFlags, OpenIntent};
pub use identity::{SheetId, SheetIdentity};
pub use matrix::{Row, TabularMatrix};
