//! Group-by-day reduction of the five statistics feeds into [`DailyAggregate`]s.
//!
//! Each feed is bucketed by its normalised `date` once; a day is then
//! resolved by reading the buckets in a fixed precedence order. Records with
//! an unparseable date are skipped with a debug log and never abort the batch.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::metrics::{storage_days, AdStats, DailyAggregate, FunnelStats};
use crate::record::MetricRecord;

/// Raw records from every endpoint for one request.
#[derive(Debug, Clone, Default)]
pub struct MetricSources {
    pub sales: Vec<MetricRecord>,
    pub stocks: Vec<MetricRecord>,
    pub orders: Vec<MetricRecord>,
    pub advert: Vec<MetricRecord>,
    pub funnel: Vec<MetricRecord>,
}

#[derive(Debug, Default)]
struct SalesDay {
    records: usize,
    revenue: f64,
    realised: usize,
    price_sum: f64,
    articles: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct DayBuckets {
    sales: BTreeMap<NaiveDate, SalesDay>,
    orders: BTreeMap<NaiveDate, usize>,
    ads: BTreeMap<NaiveDate, AdStats>,
    funnel: BTreeMap<NaiveDate, FunnelStats>,
    /// Quantity of the first stock record seen per article.
    stock_by_article: HashMap<String, f64>,
}

/// Builds the aggregate for `target`.
///
/// Returns `None` when the day has no sales records at all; callers treat
/// that as "nothing to report", not as an error.
#[must_use]
pub fn aggregate(sources: &MetricSources, target: NaiveDate) -> Option<DailyAggregate> {
    DayBuckets::build(sources).resolve(target)
}

/// Builds one aggregate per day in `from..=to` that has sales, in date order.
#[must_use]
pub fn aggregate_range(
    sources: &MetricSources,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DailyAggregate> {
    let buckets = DayBuckets::build(sources);
    from.iter_days()
        .take_while(|day| *day <= to)
        .filter_map(|day| buckets.resolve(day))
        .collect()
}

fn record_day(feed: &'static str, record: &MetricRecord) -> Option<NaiveDate> {
    let day = record.date();
    if day.is_none() {
        tracing::debug!(
            feed,
            raw_date = record.text("date").unwrap_or_default(),
            "skipping record with unparseable date"
        );
    }
    day
}

impl DayBuckets {
    fn build(sources: &MetricSources) -> Self {
        let mut buckets = Self::default();

        for sale in &sources.sales {
            let Some(day) = record_day("sales", sale) else {
                continue;
            };
            let entry = buckets.sales.entry(day).or_default();
            entry.records += 1;
            entry.price_sum += sale.number("priceWithDisc").unwrap_or(0.0);
            if sale.flag("isRealization") {
                entry.revenue += sale.number("totalPrice").unwrap_or(0.0);
                entry.realised += 1;
            }
            if let Some(article) = sale.article() {
                entry.articles.insert(article);
            }
        }

        for order in &sources.orders {
            if order.flag("isCancel") {
                continue;
            }
            let Some(day) = record_day("orders", order) else {
                continue;
            };
            *buckets.orders.entry(day).or_default() += 1;
        }

        for advert in &sources.advert {
            let Some(day) = record_day("advert", advert) else {
                continue;
            };
            let entry = buckets.ads.entry(day).or_default();
            entry.impressions += advert.number("impressions").unwrap_or(0.0);
            entry.clicks += advert.number("clicks").unwrap_or(0.0);
            entry.spend_auction += advert.first_number(&["sum", "cost"]).unwrap_or(0.0);
            if let Some(cpc) = advert.number("cpc").filter(|v| *v > 0.0) {
                entry.reported_cpc = Some(cpc);
            }
        }

        for event in &sources.funnel {
            let Some(day) = record_day("funnel", event) else {
                continue;
            };
            let entry = buckets.funnel.entry(day).or_default();
            entry.card_views += event.number("openCount").unwrap_or(0.0);
            entry.baskets += event.number("cartCount").unwrap_or(0.0);
            entry.orders += event.number("orderCount").unwrap_or(0.0);
        }

        for stock in &sources.stocks {
            if let Some(article) = stock.article() {
                let quantity = stock.first_number(&["quantity", "amount"]).unwrap_or(0.0);
                buckets.stock_by_article.entry(article).or_insert(quantity);
            }
        }

        buckets
    }

    fn resolve(&self, day: NaiveDate) -> Option<DailyAggregate> {
        let sales = self.sales.get(&day)?;

        let mut order_count = as_count(sales.realised);
        if let Some(&orders) = self.orders.get(&day).filter(|n| **n > 0) {
            order_count = as_count(orders);
        }
        let funnel = self.funnel.get(&day).cloned();
        if let Some(f) = funnel.as_ref().filter(|f| f.orders > 0.0) {
            order_count = f.orders;
        }

        let avg_price = (sales.records > 0).then(|| sales.price_sum / as_count(sales.records));

        let stock: f64 = sales
            .articles
            .iter()
            .filter_map(|article| self.stock_by_article.get(article))
            .sum();
        let stock_total = (stock > 0.0).then_some(stock);

        Some(DailyAggregate {
            date: day,
            revenue: sales.revenue,
            order_count,
            sales_count: sales.records,
            articles: sales.articles.clone(),
            avg_price,
            stock_total,
            storage_days: stock_total.map(storage_days),
            ads: self.ads.get(&day).cloned(),
            funnel,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_count(n: usize) -> f64 {
    n as f64
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
