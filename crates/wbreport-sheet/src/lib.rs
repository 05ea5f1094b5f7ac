pub mod error;
pub mod schema;
pub mod store;
pub mod table;
mod workbook;

pub use error::SheetError;
pub use schema::{normalize_header, ColumnDef, ColumnRole, TableSchema, DEFAULT_HEADERS};
pub use store::ReportStore;
pub use table::{CellValue, ManualOverrides, ReportRow, ReportTable, UpsertOutcome};
