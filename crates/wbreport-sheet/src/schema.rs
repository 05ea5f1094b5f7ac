//! Column schema of a report: which header is the date, which are filled
//! from the aggregate, and which belong to the operator.
//!
//! The schema is derived once from the header row when a table is loaded.
//! Header text is matched after [`normalize_header`], against a static
//! binding table ordered most-specific pattern first.

use wbreport_core::MetricField;

/// Token identifying the date column in a normalised header.
pub const DATE_MARKER: &str = "дата";

/// Header row used when no template is available.
pub const DEFAULT_HEADERS: [&str; 22] = [
    "акк/дата",
    "ставка/реклама",
    "комментарий",
    "К месяц/Артикул",
    "Касса месяц",
    "К день",
    "Касса день",
    "показы",
    "клики",
    "CTR",
    "цена клика АУКЦ",
    "расход АУКЦ",
    "цена клика АРК",
    "расход АРК",
    "перешли в карточку",
    "корзин",
    "заказы",
    "хран день",
    "М с 1 шт наши данные",
    "итого прибыль",
    "ЦЕНА товара",
    "остаток товар",
];

/// Normalised header pattern → bound metric. A header binds to the first
/// pattern it contains, so longer patterns must precede their substrings.
const SYSTEM_BINDINGS: &[(&str, MetricField)] = &[
    ("цена клика аукц", MetricField::ClickPriceAuction),
    ("цена клика арк", MetricField::ClickPriceCampaign),
    ("расход аукц", MetricField::SpendAuction),
    ("расход арк", MetricField::SpendCampaign),
    ("перешли в карточку", MetricField::CardViews),
    ("касса день", MetricField::CashDay),
    ("к день", MetricField::RevenueDay),
    ("показы", MetricField::Impressions),
    ("клики", MetricField::Clicks),
    ("ctr", MetricField::Ctr),
    ("корзин", MetricField::Baskets),
    ("заказы", MetricField::Orders),
    ("хран день", MetricField::StorageDays),
    ("итого прибыль", MetricField::Profit),
    ("цена товара", MetricField::Price),
    ("остаток товар", MetricField::Stock),
];

/// Collapses line breaks and whitespace runs to single spaces, trims, and
/// lowercases.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Date,
    /// Overwritten on every run from the bound metric.
    System(MetricField),
    /// Operator-entered; never overwritten once non-blank.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// 1-based worksheet column.
    pub index: u32,
    pub header: String,
    /// [`normalize_header`] of `header`; manual overrides are keyed by it.
    pub key: String,
    pub role: ColumnRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
    date_position: usize,
}

fn bind(key: &str) -> ColumnRole {
    SYSTEM_BINDINGS
        .iter()
        .find(|(pattern, _)| key.contains(pattern))
        .map_or(ColumnRole::Manual, |(_, field)| ColumnRole::System(*field))
}

impl TableSchema {
    /// Builds the schema from `(column index, header text)` pairs.
    ///
    /// Blank headers are dropped. The first header containing
    /// [`DATE_MARKER`] becomes the date column. Unbound headers are manual.
    /// Returns `None` if no date column exists.
    #[must_use]
    pub fn from_headers<I, S>(headers: I) -> Option<Self>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let mut columns = Vec::new();
        let mut date_position = None;

        for (index, header) in headers {
            let header = header.into();
            let key = normalize_header(&header);
            if key.is_empty() {
                continue;
            }
            let role = if date_position.is_none() && key.contains(DATE_MARKER) {
                date_position = Some(columns.len());
                ColumnRole::Date
            } else {
                bind(&key)
            };
            columns.push(ColumnDef {
                index,
                header,
                key,
                role,
            });
        }

        date_position.map(|date_position| Self {
            columns,
            date_position,
        })
    }

    /// Schema of [`DEFAULT_HEADERS`] laid out from column 1. The first
    /// default header is the date column.
    #[must_use]
    pub fn default_schema() -> Self {
        let columns = (1u32..)
            .zip(DEFAULT_HEADERS)
            .map(|(index, header)| {
                let key = normalize_header(header);
                let role = if index == 1 {
                    ColumnRole::Date
                } else {
                    bind(&key)
                };
                ColumnDef {
                    index,
                    header: header.to_string(),
                    key,
                    role,
                }
            })
            .collect();
        Self {
            columns,
            date_position: 0,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of the date column within [`TableSchema::columns`].
    #[must_use]
    pub fn date_position(&self) -> usize {
        self.date_position
    }

    /// The column bound to `field`, if the template has one.
    #[must_use]
    pub fn column_for(&self, field: MetricField) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.role == ColumnRole::System(field))
    }
}
