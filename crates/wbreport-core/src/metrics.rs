use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::format_display_date;

/// Ratio between remaining stock and the daily storage charge estimate.
pub const STORAGE_DAYS_FACTOR: f64 = 0.15;

/// Advertising totals for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdStats {
    pub impressions: f64,
    pub clicks: f64,
    /// Spend on the auction channel. The feed does not split channels, so
    /// all spend lands here.
    pub spend_auction: f64,
    /// Spend on the automatic campaign channel; zero until the feed splits it.
    pub spend_campaign: f64,
    /// Last positive cost-per-click the API reported for the day.
    pub reported_cpc: Option<f64>,
}

impl AdStats {
    /// Click-through rate in percent, present only when both counts are positive.
    #[must_use]
    pub fn ctr(&self) -> Option<f64> {
        (self.impressions > 0.0 && self.clicks > 0.0)
            .then(|| 100.0 * self.clicks / self.impressions)
    }

    /// Auction click price: the reported CPC if any, else spend per click.
    #[must_use]
    pub fn click_price_auction(&self) -> Option<f64> {
        self.reported_cpc
            .or_else(|| computed_click_price(self.spend_auction, self.clicks))
    }

    /// Campaign click price. The feed reports one CPC for both channels, so
    /// this resolves like the auction price over total spend.
    #[must_use]
    pub fn click_price_campaign(&self) -> Option<f64> {
        self.reported_cpc.or_else(|| {
            computed_click_price(self.spend_auction + self.spend_campaign, self.clicks)
        })
    }
}

fn computed_click_price(spend: f64, clicks: f64) -> Option<f64> {
    (clicks > 0.0 && spend > 0.0).then(|| spend / clicks)
}

/// Sales-funnel totals for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunnelStats {
    pub card_views: f64,
    pub baskets: f64,
    pub orders: f64,
}

/// Every metric for a single calendar day, ready to be written to a report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    /// Sum of `totalPrice` over realised sales.
    pub revenue: f64,
    /// Resolved order count (funnel, then orders endpoint, then realised sales).
    pub order_count: f64,
    /// Number of sales records seen for the day.
    pub sales_count: usize,
    pub articles: BTreeSet<String>,
    pub avg_price: Option<f64>,
    /// Total stock over the day's articles, present only when positive.
    pub stock_total: Option<f64>,
    pub storage_days: Option<f64>,
    pub ads: Option<AdStats>,
    pub funnel: Option<FunnelStats>,
}

impl DailyAggregate {
    /// The day rendered the way report rows display it.
    #[must_use]
    pub fn display_date(&self) -> String {
        format_display_date(self.date)
    }

    #[must_use]
    pub fn article_count(&self) -> usize {
        self.articles.len()
    }

    /// Whether the data behind `field` was fetched for this day. A field
    /// with a source but no value is known to be empty; one without a source
    /// is unknown.
    #[must_use]
    pub fn has_source(&self, field: MetricField) -> bool {
        match field {
            MetricField::Impressions
            | MetricField::Clicks
            | MetricField::Ctr
            | MetricField::ClickPriceAuction
            | MetricField::SpendAuction
            | MetricField::ClickPriceCampaign
            | MetricField::SpendCampaign => self.ads.is_some(),
            MetricField::CardViews | MetricField::Baskets => self.funnel.is_some(),
            MetricField::Profit => false,
            MetricField::RevenueDay
            | MetricField::CashDay
            | MetricField::Orders
            | MetricField::StorageDays
            | MetricField::Price
            | MetricField::Stock => true,
        }
    }

    /// Looks up a reportable field. `None` means the cell stays blank.
    #[must_use]
    pub fn value(&self, field: MetricField) -> Option<f64> {
        let ads = self.ads.as_ref();
        let funnel = self.funnel.as_ref();
        match field {
            MetricField::RevenueDay | MetricField::CashDay => Some(self.revenue),
            MetricField::Orders => Some(self.order_count),
            MetricField::Impressions => ads.map(|a| a.impressions),
            MetricField::Clicks => ads.map(|a| a.clicks),
            MetricField::Ctr => ads.and_then(AdStats::ctr),
            MetricField::ClickPriceAuction => ads.and_then(AdStats::click_price_auction),
            MetricField::SpendAuction => ads.map(|a| a.spend_auction),
            MetricField::ClickPriceCampaign => ads.and_then(AdStats::click_price_campaign),
            MetricField::SpendCampaign => ads.map(|a| a.spend_campaign),
            MetricField::CardViews => funnel.map(|f| f.card_views),
            MetricField::Baskets => funnel.map(|f| f.baskets),
            MetricField::StorageDays => self.storage_days,
            MetricField::Price => self.avg_price,
            MetricField::Stock => self.stock_total,
            MetricField::Profit => None,
        }
    }
}

/// Storage-days heuristic: `stock * 0.15`, rounded to two decimals.
#[must_use]
pub fn storage_days(stock_total: f64) -> f64 {
    (stock_total * STORAGE_DAYS_FACTOR * 100.0).round() / 100.0
}

/// Canonical names of the metrics a report column can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricField {
    RevenueDay,
    CashDay,
    Impressions,
    Clicks,
    Ctr,
    ClickPriceAuction,
    SpendAuction,
    ClickPriceCampaign,
    SpendCampaign,
    CardViews,
    Baskets,
    Orders,
    StorageDays,
    Profit,
    Price,
    Stock,
}

impl MetricField {
    pub const ALL: [MetricField; 16] = [
        MetricField::RevenueDay,
        MetricField::CashDay,
        MetricField::Impressions,
        MetricField::Clicks,
        MetricField::Ctr,
        MetricField::ClickPriceAuction,
        MetricField::SpendAuction,
        MetricField::ClickPriceCampaign,
        MetricField::SpendCampaign,
        MetricField::CardViews,
        MetricField::Baskets,
        MetricField::Orders,
        MetricField::StorageDays,
        MetricField::Profit,
        MetricField::Price,
        MetricField::Stock,
    ];
}

impl std::fmt::Display for MetricField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetricField::RevenueDay => "revenue_day",
            MetricField::CashDay => "cash_day",
            MetricField::Impressions => "impressions",
            MetricField::Clicks => "clicks",
            MetricField::Ctr => "ctr",
            MetricField::ClickPriceAuction => "click_price_auction",
            MetricField::SpendAuction => "spend_auction",
            MetricField::ClickPriceCampaign => "click_price_campaign",
            MetricField::SpendCampaign => "spend_campaign",
            MetricField::CardViews => "card_views",
            MetricField::Baskets => "baskets",
            MetricField::Orders => "orders",
            MetricField::StorageDays => "storage_days",
            MetricField::Profit => "profit",
            MetricField::Price => "price",
            MetricField::Stock => "stock",
        };
        f.write_str(name)
    }
}
