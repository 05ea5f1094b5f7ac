//! In-memory report table and the merge rules applied by an upsert.

use std::collections::HashMap;
use std::fmt;

use chrono::{Days, NaiveDate};
use wbreport_core::{normalize_date, DailyAggregate, RowMatch};

use crate::schema::{normalize_header, ColumnRole, TableSchema};

/// A single cell as the merge engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Blank,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Classifies a raw cell string: whitespace-only is blank, finite
    /// numerics are numbers, everything else is kept as text.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Blank;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }

    /// Calendar date held by the cell: a parseable date string, or a
    /// spreadsheet date serial.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Blank => None,
            Self::Text(text) => normalize_date(text),
            Self::Number(serial) => date_from_serial(*serial),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

// Spreadsheet day 0 under the 1900 date system (accounts for the leap-year bug).
fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if serial.fract() != 0.0 || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let days = serial as u64;
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days))
}

/// Operator-supplied values for manual columns, keyed by normalised header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualOverrides(HashMap<String, String>);

impl ManualOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for the column whose header normalises like `header`.
    pub fn insert(&mut self, header: &str, value: impl Into<String>) {
        self.0.insert(normalize_header(header), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ManualOverrides {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut overrides = Self::new();
        for (header, value) in iter {
            overrides.insert(header.as_ref(), value);
        }
        overrides
    }
}

/// One data row; `cells` is aligned with [`TableSchema::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub cells: Vec<CellValue>,
}

impl ReportRow {
    #[must_use]
    pub fn blank(width: usize) -> Self {
        Self {
            cells: vec![CellValue::Blank; width],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was added at the given position.
    Appended(usize),
    /// The existing row at the given position was merged.
    Updated(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    schema: TableSchema,
    rows: Vec<ReportRow>,
}

impl ReportTable {
    #[must_use]
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Rows shorter or longer than the schema are padded or cut to fit.
    #[must_use]
    pub fn with_rows(schema: TableSchema, rows: Vec<ReportRow>) -> Self {
        let width = schema.width();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.cells.resize(width, CellValue::Blank);
                row
            })
            .collect();
        Self { schema, rows }
    }

    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first row whose date cell matches.
    ///
    /// `DayToken` matches when the cell text contains `label`; `ExactDate`
    /// parses the cell and compares it with `date`.
    #[must_use]
    pub fn find_row(&self, label: &str, date: NaiveDate, mode: RowMatch) -> Option<usize> {
        let pos = self.schema.date_position();
        self.rows.iter().position(|row| {
            let cell = &row.cells[pos];
            match mode {
                RowMatch::DayToken => !cell.is_blank() && cell.to_string().contains(label),
                RowMatch::ExactDate => cell.as_date() == Some(date),
            }
        })
    }

    /// Merges `agg` into the row for `label`, appending one if none matches.
    ///
    /// System cells take the aggregate value. A field whose source was
    /// fetched but holds no value is cleared; one whose source is missing
    /// keeps the cell as it is. Manual cells are only filled while blank. An
    /// appended row carries `label` verbatim in its date cell.
    pub fn upsert(
        &mut self,
        label: &str,
        agg: &DailyAggregate,
        overrides: Option<&ManualOverrides>,
        mode: RowMatch,
    ) -> UpsertOutcome {
        if let Some(pos) = self.find_row(label, agg.date, mode) {
            let row = &mut self.rows[pos];
            for (column, cell) in self.schema.columns().iter().zip(row.cells.iter_mut()) {
                match column.role {
                    ColumnRole::Date => {}
                    ColumnRole::System(field) => match agg.value(field) {
                        Some(value) => *cell = CellValue::Number(value),
                        None if agg.has_source(field) => *cell = CellValue::Blank,
                        None => {}
                    },
                    ColumnRole::Manual => {
                        if cell.is_blank() {
                            if let Some(value) = overrides.and_then(|o| o.get(&column.key)) {
                                *cell = CellValue::from_raw(value);
                            }
                        }
                    }
                }
            }
            tracing::debug!(label, row = pos, "report row updated");
            return UpsertOutcome::Updated(pos);
        }

        let cells = self
            .schema
            .columns()
            .iter()
            .map(|column| match column.role {
                ColumnRole::Date => CellValue::Text(label.to_string()),
                ColumnRole::System(field) => {
                    agg.value(field).map_or(CellValue::Blank, CellValue::Number)
                }
                ColumnRole::Manual => overrides
                    .and_then(|o| o.get(&column.key))
                    .map_or(CellValue::Blank, CellValue::from_raw),
            })
            .collect();
        self.rows.push(ReportRow { cells });
        let pos = self.rows.len() - 1;
        tracing::debug!(label, row = pos, "report row appended");
        UpsertOutcome::Appended(pos)
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
