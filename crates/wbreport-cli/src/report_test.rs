use serde_json::json;
use wbreport_stats::{Endpoint, RetryPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

async fn mount_feeds(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"date": "2024-01-05T10:00:00", "nmId": 100, "priceWithDisc": 500, "totalPrice": 500, "isRealization": true},
            {"date": "2024-01-05T12:00:00", "nmId": 101, "priceWithDisc": 300, "totalPrice": 300, "isRealization": true},
            {"date": "2024-01-06T09:00:00", "nmId": 100, "priceWithDisc": 450, "totalPrice": 450, "isRealization": true}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"nmId": 100, "quantity": 20}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    for optional in ["/advert", "/funnel"] {
        Mock::given(method("GET"))
            .and(path(optional))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }
}

#[test]
fn timestamped_path_uses_run_time() {
    let now = day(5).and_hms_opt(14, 3, 9).unwrap();
    assert_eq!(
        timestamped_path(Path::new("excel_files"), now),
        PathBuf::from("excel_files/wb_data_2024-01-05_14-03-09.xlsx")
    );
}

#[test]
fn span_label_collapses_single_day() {
    assert_eq!(span_label(day(5), day(5)), "05.01.2024");
    assert_eq!(span_label(day(5), day(7)), "05.01.2024 - 07.01.2024");
}

#[test]
fn summary_lists_missing_days_and_caps_details() {
    let summary = RunSummary {
        processed: 12,
        added: 11,
        updated: 1,
        details: (1..=12).map(|i| format!("day {i}")).collect(),
        missing: vec![day(7)],
        path: PathBuf::from("out.xlsx"),
    };
    let text = summary.to_string();

    assert!(text.starts_with("no data for 07.01.2024\n"));
    assert!(text.contains("sales processed: 12"));
    assert!(text.contains("rows added: 11"));
    assert!(text.contains("rows updated: 1"));
    assert!(text.contains("  day 10\n"));
    assert!(!text.contains("day 11\n"));
    assert!(text.contains("... and 2 more"));
    assert!(text.ends_with("file: out.xlsx"));
}

#[test]
fn failures_are_described_by_kind() {
    let rate_limited = anyhow::Error::from(StatsError::RateLimitExceeded {
        endpoint: Endpoint::Sales,
        attempts: 5,
    });
    assert!(describe_failure(&rate_limited).contains("rate limit"));

    let auth = anyhow::Error::from(StatsError::Unauthorized {
        endpoint: Endpoint::Orders,
        status: 401,
    });
    assert!(describe_failure(&auth).contains("WB_API_KEY"));

    let sheet = anyhow::Error::from(SheetError::RowLimit).context("saving report");
    assert!(describe_failure(&sheet).starts_with("Could not update the report file"));

    let config = anyhow::Error::from(ConfigError::MissingEnvVar("WB_API_KEY".into()));
    let message = describe_failure(&config);
    assert!(message.starts_with("Configuration error"));
    assert!(message.contains("WB_API_KEY"));

    let other = anyhow::anyhow!("boom");
    assert_eq!(describe_failure(&other), "Report run failed: boom");
}

#[tokio::test]
async fn run_report_merges_each_day_and_reports_gaps() {
    let server = MockServer::start().await;
    mount_feeds(&server).await;
    let client =
        StatsClient::with_base_url("test-key", 5, &server.uri(), RetryPolicy::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = ReportStore::new(dir.path().join("wb_data.xlsx"));

    let first = run_report(&client, &store, day(5), day(7)).await.unwrap();

    assert_eq!(first.processed, 3);
    assert_eq!(first.added, 2);
    assert_eq!(first.updated, 0);
    assert_eq!(first.missing, vec![day(7)]);
    assert_eq!(
        first.details[0],
        "05.01.2024: 2 sales, 2 articles, revenue 800.00"
    );
    assert!(store.path().exists());

    let second = run_report(&client, &store, day(5), day(6)).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.updated, 2);
    assert_eq!(store.load().unwrap().len(), 2);
}

#[tokio::test]
async fn run_report_without_sales_still_leaves_a_report() {
    let server = MockServer::start().await;
    for feed in ["/sales", "/stocks", "/orders", "/advert", "/funnel"] {
        Mock::given(method("GET"))
            .and(path(feed))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
    }
    let client =
        StatsClient::with_base_url("test-key", 5, &server.uri(), RetryPolicy::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = ReportStore::new(dir.path().join("wb_data.xlsx"));

    let summary = run_report(&client, &store, day(5), day(5)).await.unwrap();

    assert_eq!(summary.missing, vec![day(5)]);
    assert_eq!(summary.added, 0);
    assert!(store.path().exists());
}

#[tokio::test]
async fn inverted_span_is_rejected_before_fetching() {
    let server = MockServer::start().await;
    let client =
        StatsClient::with_base_url("test-key", 5, &server.uri(), RetryPolicy::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = ReportStore::new(dir.path().join("wb_data.xlsx"));

    let err = run_report(&client, &store, day(7), day(5)).await.unwrap_err();

    assert!(err.to_string().contains("after its end"));
    assert!(server.received_requests().await.unwrap().is_empty());
}
