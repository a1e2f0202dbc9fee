pub mod error;
pub mod sheet;

pub use error::AppError;
pub use sheet::{SheetRow, SheetTable, SheetTableError};
