//! Fetches every statistics feed for a date range.

use chrono::NaiveDate;
use wbreport_core::{MetricRecord, MetricSources};

use crate::endpoint::Endpoint;
use crate::error::StatsError;
use crate::rate_limit::Sleeper;

use super::StatsClient;

/// Query date format expected by every endpoint.
const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

impl<S: Sleeper> StatsClient<S> {
    /// Fetches sales, stocks, orders, advert and funnel records for
    /// `from..=to`.
    ///
    /// Requests run one after another so retry waits never overlap on the
    /// same account limit. Stocks only take `dateFrom`. Advert and funnel
    /// failures degrade to empty data; the rest abort the whole fetch.
    ///
    /// # Errors
    ///
    /// Propagates any [`StatsError`] from the sales, stocks or orders fetch.
    pub async fn fetch_period(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<MetricSources, StatsError> {
        let date_from = from.format(QUERY_DATE_FORMAT).to_string();
        let date_to = to.format(QUERY_DATE_FORMAT).to_string();
        let range = [("dateFrom", date_from.as_str()), ("dateTo", date_to.as_str())];

        tracing::info!(%date_from, %date_to, "fetching statistics");

        let sales = self.fetch_feed(Endpoint::Sales, &range).await?;
        let stocks = self.fetch_feed(Endpoint::Stocks, &range[..1]).await?;
        let orders = self.fetch_feed(Endpoint::Orders, &range).await?;
        let advert = self.fetch_feed(Endpoint::Advert, &range).await?;
        let funnel = self.fetch_feed(Endpoint::Funnel, &range).await?;

        tracing::info!(
            sales = sales.len(),
            stocks = stocks.len(),
            orders = orders.len(),
            advert = advert.len(),
            funnel = funnel.len(),
            "statistics fetched"
        );

        Ok(MetricSources {
            sales,
            stocks,
            orders,
            advert,
            funnel,
        })
    }

    async fn fetch_feed(
        &self,
        endpoint: Endpoint,
        params: &[(&str, &str)],
    ) -> Result<Vec<MetricRecord>, StatsError> {
        if endpoint.is_optional() {
            Ok(self.fetch_optional(endpoint, params).await)
        } else {
            self.fetch(endpoint, params).await
        }
    }
}
