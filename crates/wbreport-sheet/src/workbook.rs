//! Worksheet I/O: loading a [`ReportTable`] from the first sheet of an
//! `.xlsx` file and writing changed rows back in place.

use std::path::Path;

use umya_spreadsheet::{Spreadsheet, Style, Worksheet};

use crate::error::SheetError;
use crate::schema::{TableSchema, DEFAULT_HEADERS};
use crate::table::{CellValue, ReportRow, ReportTable};

const HEADER_ROW: u32 = 1;
const FIRST_DATA_ROW: u32 = 2;

pub(crate) fn read_book(path: &Path) -> Result<Spreadsheet, SheetError> {
    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| SheetError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub(crate) fn save_book(book: &Spreadsheet, path: &Path) -> Result<(), SheetError> {
    umya_spreadsheet::writer::xlsx::write(book, path).map_err(|e| SheetError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Reads the workbook and extracts its report table.
pub(crate) fn load(path: &Path) -> Result<(Spreadsheet, ReportTable), SheetError> {
    let book = read_book(path)?;
    let sheet = book.get_sheet(&0).ok_or_else(|| SheetError::MissingSheet {
        path: path.to_path_buf(),
    })?;
    let table = read_table(sheet).ok_or_else(|| SheetError::MissingDateColumn {
        path: path.to_path_buf(),
    })?;
    Ok((book, table))
}

/// Header row to schema; rows below it down to the last one with any value
/// in a schema column become the table. `None` if there is no date column.
fn read_table(sheet: &Worksheet) -> Option<ReportTable> {
    let headers =
        (1..=sheet.get_highest_column()).map(|col| (col, sheet.get_value((col, HEADER_ROW))));
    let schema = TableSchema::from_headers(headers)?;

    let last_row = (FIRST_DATA_ROW..=sheet.get_highest_row())
        .rev()
        .find(|&row| {
            schema
                .columns()
                .iter()
                .any(|c| !sheet.get_value((c.index, row)).trim().is_empty())
        })
        .unwrap_or(HEADER_ROW);

    let rows = (FIRST_DATA_ROW..=last_row)
        .map(|row| ReportRow {
            cells: schema
                .columns()
                .iter()
                .map(|c| CellValue::from_raw(&sheet.get_value((c.index, row))))
                .collect(),
        })
        .collect();

    Some(ReportTable::with_rows(schema, rows))
}

fn sheet_row(position: usize) -> Result<u32, SheetError> {
    u32::try_from(position)
        .ok()
        .and_then(|p| p.checked_add(FIRST_DATA_ROW))
        .ok_or(SheetError::RowLimit)
}

/// Writes `table` into the first sheet and saves the book to `path`.
///
/// `loaded` is the data region as it was read; cells equal to it are not
/// touched, so formulas and formatting of unchanged cells survive. Rows past
/// `loaded` are new and take each column's style from the first data row, or
/// from the header when the table had no rows.
pub(crate) fn store(
    book: &mut Spreadsheet,
    loaded: &[ReportRow],
    table: &ReportTable,
    path: &Path,
) -> Result<(), SheetError> {
    let sheet = book.get_sheet_mut(&0).ok_or_else(|| SheetError::MissingSheet {
        path: path.to_path_buf(),
    })?;
    let columns = table.schema().columns();

    let style_row = if loaded.is_empty() {
        HEADER_ROW
    } else {
        FIRST_DATA_ROW
    };
    let styles: Vec<Option<Style>> = columns
        .iter()
        .map(|c| {
            sheet
                .get_cell((c.index, style_row))
                .map(|cell| cell.get_style().clone())
        })
        .collect();

    let mut written = 0usize;
    for (position, row) in table.rows().iter().enumerate() {
        let row_number = sheet_row(position)?;
        let previous = loaded.get(position);

        for (pos, (column, value)) in columns.iter().zip(&row.cells).enumerate() {
            if previous.is_some_and(|p| p.cells.get(pos) == Some(value)) {
                continue;
            }
            let cell = sheet.get_cell_mut((column.index, row_number));
            if previous.is_none() {
                if let Some(style) = &styles[pos] {
                    cell.set_style(style.clone());
                }
            }
            match value {
                CellValue::Blank => {
                    cell.set_blank();
                }
                CellValue::Text(text) => {
                    cell.set_value_string(text.clone());
                }
                CellValue::Number(n) => {
                    cell.set_value_number(*n);
                }
            }
            written += 1;
        }
    }

    tracing::debug!(path = %path.display(), cells = written, "writing report");
    save_book(book, path)
}

/// A single-sheet book holding only the default header row.
pub(crate) fn default_book() -> Spreadsheet {
    let mut book = umya_spreadsheet::new_file();
    if let Some(sheet) = book.get_sheet_mut(&0) {
        for (col, header) in (1u32..).zip(DEFAULT_HEADERS) {
            let cell = sheet.get_cell_mut((col, HEADER_ROW));
            cell.set_value_string(header);
            let style = cell.get_style_mut();
            style.get_font_mut().set_bold(true);
            style.get_alignment_mut().set_wrap_text(true);
        }
    }
    book
}

#[cfg(test)]
mod tests {
    use wbreport_core::MetricField;

    use super::*;
    use crate::schema::ColumnRole;

    #[test]
    fn default_book_round_trips_to_default_schema() {
        let book = default_book();
        let sheet = book.get_sheet(&0).unwrap();
        let table = read_table(sheet).unwrap();
        assert_eq!(table.schema(), &TableSchema::default_schema());
        assert!(table.is_empty());
    }

    #[test]
    fn trailing_blank_rows_are_not_part_of_the_table() {
        let mut book = default_book();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.get_cell_mut((1, 2)).set_value_string("05.01.2024");
        sheet.get_cell_mut((6, 2)).set_value_number(500);
        sheet.get_cell_mut((1, 3)).set_value_string("06.01.2024");
        sheet.get_cell_mut((1, 7)).set_value_string("   ");

        let table = read_table(book.get_sheet(&0).unwrap()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].cells[5], CellValue::Number(500.0));
        assert_eq!(
            table.schema().columns()[5].role,
            ColumnRole::System(MetricField::RevenueDay)
        );
    }

    #[test]
    fn sheet_without_date_header_has_no_table() {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.get_cell_mut((1, 1)).set_value_string("показы");
        assert!(read_table(book.get_sheet(&0).unwrap()).is_none());
    }

    #[test]
    fn sheet_row_offsets_past_header() {
        assert_eq!(sheet_row(0).unwrap(), 2);
        assert!(matches!(sheet_row(usize::MAX), Err(SheetError::RowLimit)));
    }
}
