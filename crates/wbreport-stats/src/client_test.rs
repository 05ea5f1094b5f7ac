use serde_json::json;

use super::*;

fn test_client(base_url: &str) -> StatsClient {
    StatsClient::with_base_url("test-key", 30, base_url, RetryPolicy::default())
        .expect("client construction should not fail")
}

#[test]
fn endpoint_url_appends_suffix_to_base_path() {
    let client = test_client("https://statistics-api.example.com/api/v1/supplier");
    let url = client
        .endpoint_url(Endpoint::Sales, &[("dateFrom", "2024-01-05")])
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://statistics-api.example.com/api/v1/supplier/sales?dateFrom=2024-01-05"
    );
}

#[test]
fn endpoint_url_tolerates_trailing_slash() {
    let client = test_client("https://statistics-api.example.com/api/v1/supplier/");
    let url = client.endpoint_url(Endpoint::Funnel, &[]).unwrap();
    assert_eq!(
        url.as_str(),
        "https://statistics-api.example.com/api/v1/supplier/funnel"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = StatsClient::with_base_url("k", 30, "not a url", RetryPolicy::default());
    assert!(matches!(result, Err(StatsError::InvalidBaseUrl { .. })));
}

#[test]
fn normalize_records_wraps_single_object() {
    let records = normalize_records(Endpoint::Stocks, json!({"nmId": 1, "quantity": 3})).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].number("quantity"), Some(3.0));
}

#[test]
fn normalize_records_skips_non_objects_in_arrays() {
    let records =
        normalize_records(Endpoint::Sales, json!([{"nmId": 1}, 5, "x", {"nmId": 2}])).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn normalize_records_treats_null_as_empty() {
    assert!(normalize_records(Endpoint::Orders, Value::Null)
        .unwrap()
        .is_empty());
}

#[test]
fn normalize_records_rejects_scalars() {
    let err = normalize_records(Endpoint::Orders, json!(42)).unwrap_err();
    assert!(matches!(
        err,
        StatsError::UnexpectedShape {
            found: "number",
            ..
        }
    ));
}
