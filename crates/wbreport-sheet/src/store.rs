use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use umya_spreadsheet::Spreadsheet;
use wbreport_core::{AppConfig, DailyAggregate, RowMatch};

use crate::error::SheetError;
use crate::table::{ManualOverrides, ReportRow, ReportTable, UpsertOutcome};
use crate::workbook;

/// A report file on disk that daily aggregates are merged into.
///
/// The store assumes it is the only writer of its file.
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
    template_path: Option<PathBuf>,
    row_match: RowMatch,
}

/// An opened report: the workbook, its data rows as read, and the table
/// being edited.
struct Session {
    book: Spreadsheet,
    loaded: Vec<ReportRow>,
    table: ReportTable,
}

impl ReportStore {
    /// A store without a template, matching rows by day token.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            template_path: None,
            row_match: RowMatch::DayToken,
        }
    }

    /// A store for `path` using the configured template and row matching.
    #[must_use]
    pub fn from_config(config: &AppConfig, path: impl Into<PathBuf>) -> Self {
        Self::new(path)
            .with_template(config.template_path.clone())
            .with_row_match(config.row_match)
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template_path = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_row_match(mut self, row_match: RowMatch) -> Self {
        self.row_match = row_match;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the report file if it is missing or unreadable.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError`] if the file cannot be created, or is still
    /// unreadable after being recreated.
    pub fn ensure_exists(&self) -> Result<(), SheetError> {
        self.open().map(|_| ())
    }

    /// Reads the current table, bootstrapping the file first if needed.
    ///
    /// # Errors
    ///
    /// Same as [`ReportStore::ensure_exists`].
    pub fn load(&self) -> Result<ReportTable, SheetError> {
        self.open().map(|session| session.table)
    }

    /// Merges one day into the report and saves it.
    ///
    /// `label` is the date text to match and, for a new row, to write into
    /// the date column.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError`] if the report cannot be opened or saved.
    pub fn upsert(
        &self,
        label: &str,
        agg: &DailyAggregate,
        overrides: Option<&ManualOverrides>,
    ) -> Result<UpsertOutcome, SheetError> {
        let mut session = self.open()?;
        let outcome = session.table.upsert(label, agg, overrides, self.row_match);
        self.save(&mut session)?;
        Ok(outcome)
    }

    /// Merges several days with a single read and write of the file. Each
    /// day is labelled with its display date.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError`] if the report cannot be opened or saved.
    pub fn upsert_all(
        &self,
        aggregates: &[DailyAggregate],
        overrides: Option<&ManualOverrides>,
    ) -> Result<Vec<UpsertOutcome>, SheetError> {
        let mut session = self.open()?;
        let outcomes: Vec<_> = aggregates
            .iter()
            .map(|agg| {
                session
                    .table
                    .upsert(&agg.display_date(), agg, overrides, self.row_match)
            })
            .collect();
        self.save(&mut session)?;
        Ok(outcomes)
    }

    fn save(&self, session: &mut Session) -> Result<(), SheetError> {
        workbook::store(&mut session.book, &session.loaded, &session.table, &self.path)?;
        tracing::info!(
            path = %self.path.display(),
            rows = session.table.len(),
            "report saved"
        );
        Ok(())
    }

    /// Opens the report, recreating it once if it cannot be read.
    fn open(&self) -> Result<Session, SheetError> {
        let err = match self.try_open() {
            Ok(session) => return Ok(session),
            Err(err) => err,
        };

        if matches!(&err, SheetError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
        {
            tracing::info!(path = %self.path.display(), "creating report");
        } else {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "report unreadable; recreating it"
            );
        }

        self.recreate()?;
        self.try_open().map_err(|e| SheetError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn try_open(&self) -> Result<Session, SheetError> {
        let meta = fs::metadata(&self.path).map_err(|source| SheetError::Io {
            path: self.path.clone(),
            source,
        })?;
        if meta.len() == 0 {
            return Err(SheetError::Read {
                path: self.path.clone(),
                reason: "file is empty".to_string(),
            });
        }

        let (book, table) = workbook::load(&self.path)?;
        Ok(Session {
            book,
            loaded: table.rows().to_vec(),
            table,
        })
    }

    /// Replaces the file with a copy of the template, or with a default
    /// header-only workbook when the template is missing or has no report.
    fn recreate(&self) -> Result<(), SheetError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SheetError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if let Some(template) = &self.template_path {
            match workbook::load(template) {
                Ok(_) => {
                    fs::copy(template, &self.path).map_err(|source| SheetError::Io {
                        path: self.path.clone(),
                        source,
                    })?;
                    tracing::info!(
                        path = %self.path.display(),
                        template = %template.display(),
                        "report created from template"
                    );
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(
                        template = %template.display(),
                        error = %err,
                        "template unusable; using default columns"
                    );
                }
            }
        }

        workbook::save_book(&workbook::default_book(), &self.path)?;
        tracing::info!(path = %self.path.display(), "report created with default columns");
        Ok(())
    }
}
