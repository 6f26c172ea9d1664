//! Tests for the indicator store

use super::fetch::MockSeriesProvider;
use super::*;
use crate::error::CrisisError;
use chrono::NaiveDate;
use std::collections::BTreeMap;

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(n as i64)
}

#[test]
fn test_series_rejects_unsorted_dates() {
    let mut columns = BTreeMap::new();
    columns.insert(Indicator::Sp500, vec![1.0, 2.0, 3.0]);
    let result = ObservationSeries::new(vec![day(0), day(2), day(1)], columns);
    assert!(matches!(result, Err(CrisisError::InvalidSeries(_))));
}

#[test]
fn test_series_rejects_duplicate_dates() {
    let mut columns = BTreeMap::new();
    columns.insert(Indicator::Sp500, vec![1.0, 2.0]);
    let result = ObservationSeries::new(vec![day(0), day(0)], columns);
    assert!(matches!(result, Err(CrisisError::InvalidSeries(_))));
}

#[test]
fn test_series_rejects_ragged_columns() {
    let mut columns = BTreeMap::new();
    columns.insert(Indicator::Sp500, vec![1.0, 2.0]);
    columns.insert(Indicator::Vix, vec![1.0]);
    let result = ObservationSeries::new(vec![day(0), day(1)], columns);
    assert!(matches!(result, Err(CrisisError::InvalidSeries(_))));
}

#[test]
fn test_missing_column_is_reported() {
    let mut columns = BTreeMap::new();
    columns.insert(Indicator::Sp500, vec![1.0]);
    let series = ObservationSeries::new(vec![day(0)], columns).unwrap();
    assert!(matches!(
        series.column(Indicator::Gold),
        Err(CrisisError::MissingIndicator(Indicator::Gold))
    ));
}

#[test]
fn test_tail_keeps_last_rows() {
    let mut columns = BTreeMap::new();
    columns.insert(Indicator::Sp500, (0..10).map(f64::from).collect());
    let series = ObservationSeries::new((0..10).map(day).collect(), columns).unwrap();

    let tail = series.tail(3);
    assert_eq!(tail.len(), 3);
    assert_eq!(tail.dates()[0], day(7));
    assert_eq!(tail.column(Indicator::Sp500).unwrap(), &[7.0, 8.0, 9.0]);
    assert_eq!(series.tail(50).len(), 10);
}

#[test]
fn test_indicator_names_round_trip() {
    for indicator in Indicator::ALL {
        assert_eq!(Indicator::from_column_name(indicator.column_name()), Some(indicator));
        assert_eq!(Indicator::from_key(indicator.key()), Some(indicator));
    }
    assert_eq!(Indicator::Vix.lagged_name(), "vix_lag");
}

#[test]
fn test_align_forward_fills_and_drops_leading_gaps() {
    let mut raw = BTreeMap::new();
    // Equity trades on days 0..=4; yield spread starts on day 1 and skips day 3
    raw.insert(
        Indicator::Sp500,
        (0..5).map(|d| (day(d), Some(100.0 + d as f64))).collect(),
    );
    raw.insert(
        Indicator::YieldSpread,
        vec![(day(1), Some(0.5)), (day(2), Some(0.4)), (day(3), None), (day(4), Some(0.2))],
    );

    let series = align(raw).unwrap();
    assert_eq!(series.dates(), &[day(1), day(2), day(3), day(4)]);
    assert_eq!(series.column(Indicator::YieldSpread).unwrap(), &[0.5, 0.4, 0.4, 0.2]);
    assert_eq!(series.column(Indicator::Sp500).unwrap(), &[101.0, 102.0, 103.0, 104.0]);
}

#[test]
fn test_align_fills_dates_missing_from_one_source() {
    let mut raw = BTreeMap::new();
    raw.insert(Indicator::Sp500, vec![(day(0), Some(1.0)), (day(2), Some(3.0))]);
    raw.insert(Indicator::Vix, vec![(day(0), Some(20.0)), (day(1), Some(21.0))]);

    let series = align(raw).unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series.column(Indicator::Sp500).unwrap(), &[1.0, 1.0, 3.0]);
    assert_eq!(series.column(Indicator::Vix).unwrap(), &[20.0, 21.0, 21.0]);
}

#[test]
fn test_align_fails_when_no_complete_row() {
    let mut raw = BTreeMap::new();
    raw.insert(Indicator::Sp500, vec![(day(0), None)]);
    assert!(matches!(align(raw), Err(CrisisError::InvalidSeries(_))));
    assert!(align(BTreeMap::new()).is_err());
}

#[test]
fn test_csv_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");

    let mut columns = BTreeMap::new();
    columns.insert(Indicator::Sp500, vec![3200.5, 3190.25, 3150.0]);
    columns.insert(Indicator::Vix, vec![14.0, 15.5, 19.25]);
    let series = ObservationSeries::new(vec![day(0), day(1), day(2)], columns).unwrap();

    csv_store::save(&series, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Date,S&P500,VIX\n2020-01-01,3200.5,14\n"));

    let loaded = csv_store::load(&path).unwrap();
    assert_eq!(loaded, series);
}

#[test]
fn test_csv_load_accepts_full_layout_with_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("financial_dataset.csv");
    std::fs::write(
        &path,
        "Date,Oil,Gold,S&P500,VIX,T10Y2Y,DEXKOUS\n\
         2020-01-02,61.18,1524.5,3257.85,12.47,0.33,1158.1\n\
         2020-01-03,63.05,1549.2,3234.85,14.02,,1165.2\n",
    )
    .unwrap();

    let series = csv_store::load(&path).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series.indicators().count(), 6);
    assert_eq!(series.column(Indicator::YieldSpread).unwrap(), &[0.33, 0.33]);
}

#[test]
fn test_csv_load_rejects_bad_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "Date,S&P500\n2020-01-02,abc\n").unwrap();
    assert!(matches!(csv_store::load(&path), Err(CrisisError::Data(_))));
}

#[test]
fn test_csv_load_rejects_duplicate_dates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dupes.csv");
    std::fs::write(
        &path,
        "Date,S&P500,VIX\n2020-01-02,200,20\n2020-01-03,300,30\n2020-01-03,250,25\n",
    )
    .unwrap();
    assert!(matches!(csv_store::load(&path), Err(CrisisError::InvalidSeries(_))));
}

#[test]
fn test_csv_load_rejects_out_of_order_dates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unsorted.csv");
    std::fs::write(
        &path,
        "Date,S&P500,VIX\n2020-01-03,300,30\n2020-01-02,200,20\n",
    )
    .unwrap();
    assert!(matches!(csv_store::load(&path), Err(CrisisError::InvalidSeries(_))));
}

fn mock_provider(indicators: Vec<Indicator>, fail: Option<Indicator>) -> MockSeriesProvider {
    let mut mock = MockSeriesProvider::new();
    mock.expect_name().return_const("mock".to_string());
    mock.expect_supports()
        .returning(move |i| indicators.contains(&i));
    mock.expect_fetch().returning(move |indicator, _, _| {
        if Some(indicator) == fail {
            return Err(CrisisError::Data(format!("{} unavailable", indicator)));
        }
        Ok((0..5).map(|d| (day(d), Some(10.0 + d as f64))).collect())
    });
    mock
}

#[tokio::test]
async fn test_collector_aligns_all_indicators() {
    let provider = mock_provider(Indicator::ALL.to_vec(), None);
    let collector = Collector::new(vec![Box::new(provider)], vec![Indicator::Gold]);

    let series = collector.collect(day(0), day(4)).await.unwrap();
    assert_eq!(series.len(), 5);
    assert!(series.has(Indicator::Gold));
    assert!(!series.has(Indicator::UsdKrw));
    for indicator in Indicator::REQUIRED {
        assert!(series.has(indicator));
    }
}

#[tokio::test]
async fn test_collector_fails_on_required_indicator() {
    let provider = mock_provider(Indicator::ALL.to_vec(), Some(Indicator::Vix));
    let collector = Collector::new(vec![Box::new(provider)], vec![]);

    let result = collector.collect(day(0), day(4)).await;
    assert!(matches!(result, Err(CrisisError::Data(_))));
}

#[tokio::test]
async fn test_collector_skips_failed_optional_indicator() {
    let provider = mock_provider(Indicator::ALL.to_vec(), Some(Indicator::UsdKrw));
    let collector = Collector::new(vec![Box::new(provider)], vec![Indicator::UsdKrw]);

    let series = collector.collect(day(0), day(4)).await.unwrap();
    assert!(!series.has(Indicator::UsdKrw));
}

#[tokio::test]
async fn test_collector_requires_a_provider_per_indicator() {
    let provider = mock_provider(vec![Indicator::Sp500, Indicator::Vix], None);
    let collector = Collector::new(vec![Box::new(provider)], vec![]);

    let result = collector.collect(day(0), day(4)).await;
    assert!(matches!(result, Err(CrisisError::MissingIndicator(Indicator::Oil))));
}
