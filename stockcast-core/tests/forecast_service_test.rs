//! End-to-end tests through `ForecastService`.
//!
//! History comes from `StaticProvider` and models from an in-memory store,
//! so every scenario is offline and deterministic.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use stockcast_core::cache::TtlCache;
use stockcast_core::config::ForecastSettings;
use stockcast_core::data::HistoryProvider;
use stockcast_core::features::{build_features, LONGEST_WINDOW};
use stockcast_core::fixtures::{
    add_model, close_range_scaler, constant_trees, fit_min_max, identity_input_scaler,
    identity_target_scaler, linear_bars, memory_store, seeded_lstm_artifact, threshold_trees,
    wave_bars, StaticProvider,
};
use stockcast_core::model::{MemoryArtifactStore, ModelStore};
use stockcast_core::{ForecastError, ForecastRequest, ForecastService, ModelChoice};

// ── Helpers ──────────────────────────────────────────────────────────

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn xgb_store(lookback: usize, value: f64) -> MemoryArtifactStore {
    memory_store(
        ModelChoice::Xgb,
        &constant_trees(lookback, value),
        &identity_input_scaler(),
        &identity_target_scaler(),
    )
    .unwrap()
}

fn service_with(provider: Arc<StaticProvider>, store: MemoryArtifactStore) -> ForecastService {
    ForecastService::new(provider, ModelStore::new(store), ForecastSettings::default())
        .with_as_of(as_of())
}

fn provider_with(symbol: &str, bars: usize) -> Arc<StaticProvider> {
    Arc::new(StaticProvider::new().with_symbol(symbol, linear_bars(bars, 100.0, 0.5)))
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn forecast_returns_one_point_per_day() {
    let service = service_with(provider_with("AAPL", 200), xgb_store(30, 123.456_789));
    let resp = service
        .forecast(&ForecastRequest::new("aapl").days(5).model("xgb"))
        .unwrap();

    assert_eq!(resp.symbol, "AAPL");
    assert_eq!(resp.model, "xgb_model.json");
    assert_eq!(resp.predictions.len(), 5);
    for (i, p) in resp.predictions.iter().enumerate() {
        assert_eq!(p.x, resp.last_date + chrono::Duration::days(i as i64 + 1));
        assert_eq!(p.y, 123.4568);
    }
    assert_eq!(resp.last_close, 100.0 + 199.0 * 0.5);
}

#[test]
fn zero_days_keeps_last_date_and_close() {
    let service = service_with(provider_with("MSFT", 120), xgb_store(30, 1.0));
    let resp = service
        .forecast(&ForecastRequest::new("MSFT").days(0).model("xgb"))
        .unwrap();
    assert!(resp.predictions.is_empty());
    assert_eq!(resp.last_close, 100.0 + 119.0 * 0.5);
    assert_eq!(
        resp.last_date,
        linear_bars(120, 100.0, 0.5).last().unwrap().date
    );
}

#[test]
fn short_history_is_insufficient() {
    // 60 bars leave 11 feature rows, below a lookback of 30.
    let service = service_with(provider_with("IPO", 60), xgb_store(30, 1.0));
    let err = service
        .forecast(&ForecastRequest::new("IPO").days(3).model("xgb"))
        .unwrap_err();
    match err {
        ForecastError::InsufficientHistory {
            required,
            available,
        } => {
            assert_eq!(required, 30);
            assert_eq!(available, 60 - (LONGEST_WINDOW - 1));
        }
        other => panic!("expected InsufficientHistory, got {other:?}"),
    }
}

#[test]
fn history_shorter_than_warmup_is_insufficient() {
    let service = service_with(provider_with("NEW", 20), xgb_store(10, 1.0));
    let err = service
        .forecast(&ForecastRequest::new("NEW").model("xgb"))
        .unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientHistory { available: 0, .. }
    ));
}

#[test]
fn missing_artifacts_fail_after_history_fetch() {
    let provider = provider_with("AAPL", 200);
    let service = service_with(provider.clone(), MemoryArtifactStore::new());
    let err = service
        .forecast(&ForecastRequest::new("AAPL").model("lstm"))
        .unwrap_err();

    assert_eq!(provider.fetch_count(), 1, "history must be fetched first");
    match err {
        ForecastError::MissingArtifact { model, missing } => {
            assert_eq!(model, "lstm");
            assert_eq!(missing.len(), 3);
        }
        other => panic!("expected MissingArtifact, got {other:?}"),
    }
}

#[test]
fn each_model_choice_reads_its_own_artifacts() {
    // Only xgb artifacts exist, so the default (lstm) must fail.
    let service = service_with(provider_with("AAPL", 200), xgb_store(30, 5.0));
    assert!(service
        .forecast(&ForecastRequest::new("AAPL").model("xgb"))
        .is_ok());
    assert!(matches!(
        service.forecast(&ForecastRequest::new("AAPL")),
        Err(ForecastError::MissingArtifact { .. })
    ));
}

#[test]
fn unknown_symbol_is_invalid_symbol() {
    let provider = Arc::new(StaticProvider::new());
    let service = service_with(provider, xgb_store(30, 1.0));
    let err = service
        .forecast(&ForecastRequest::new("ZZZZ").model("xgb"))
        .unwrap_err();
    assert!(matches!(err, ForecastError::InvalidSymbol { ref symbol } if symbol == "ZZZZ"));
    assert!(err.is_client_error());
}

#[test]
fn empty_history_is_invalid_symbol() {
    let provider = Arc::new(StaticProvider::new().with_symbol("EMPTY", Vec::new()));
    let service = service_with(provider, xgb_store(30, 1.0));
    let err = service
        .forecast(&ForecastRequest::new("EMPTY").model("xgb"))
        .unwrap_err();
    assert!(matches!(err, ForecastError::InvalidSymbol { .. }));
}

#[test]
fn invalid_input_is_rejected_before_fetching() {
    let provider = provider_with("AAPL", 200);
    let service = service_with(provider.clone(), xgb_store(30, 1.0));
    for req in [
        ForecastRequest::new("AAPL").days(-3),
        ForecastRequest::new("AAPL").days(10_000),
        ForecastRequest::new("AAPL").period("forever"),
        ForecastRequest::new("   "),
    ] {
        let err = service.forecast(&req).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)), "{req:?}");
    }
    assert_eq!(provider.fetch_count(), 0);
}

#[test]
fn predictions_feed_back_into_the_window() {
    // Last real close is 199.5 (< 200), so day 1 predicts 250. From then on
    // the last window row holds the previous prediction, so the output
    // alternates 150, 250, 150, ...
    let store = memory_store(
        ModelChoice::Xgb,
        &threshold_trees(10, 200.0, 250.0, 150.0),
        &identity_input_scaler(),
        &identity_target_scaler(),
    )
    .unwrap();
    let service = service_with(provider_with("AAPL", 200), store);
    let resp = service
        .forecast(&ForecastRequest::new("AAPL").days(6).model("xgb"))
        .unwrap();
    let ys: Vec<f64> = resp.predictions.iter().map(|p| p.y).collect();
    assert_eq!(ys, vec![250.0, 150.0, 250.0, 150.0, 250.0, 150.0]);
}

#[test]
fn lstm_forecast_is_deterministic() {
    let bars = wave_bars(260, 100.0, 8.0);
    let rows = build_features(&bars);
    let mut store = MemoryArtifactStore::new();
    add_model(
        &mut store,
        ModelChoice::Lstm,
        &seeded_lstm_artifact(20, 8, 7),
        &fit_min_max(&rows),
        &close_range_scaler(80.0, 130.0),
    )
    .unwrap();

    let provider = Arc::new(StaticProvider::new().with_symbol("WAVE", bars));
    let service = service_with(provider, store);
    let req = ForecastRequest::new("WAVE").days(10);

    let a = service.forecast(&req).unwrap();
    let b = service.forecast(&req).unwrap();
    assert_eq!(a.model, "lstm_model.json");
    assert_eq!(a.predictions.len(), 10);
    for (p, q) in a.predictions.iter().zip(&b.predictions) {
        assert!(p.y.is_finite());
        assert_eq!(p.y.to_bits(), q.y.to_bits());
    }
}

#[test]
fn history_cache_avoids_refetching() {
    let provider = provider_with("AAPL", 200);
    let service = service_with(provider.clone(), xgb_store(30, 1.0))
        .with_history_cache(TtlCache::new(8, Duration::from_secs(60)));
    let req = ForecastRequest::new("AAPL").model("xgb");
    service.forecast(&req).unwrap();
    service.forecast(&req).unwrap();
    assert_eq!(provider.fetch_count(), 1);

    service
        .forecast(&ForecastRequest::new("AAPL").period("5y").model("xgb"))
        .unwrap();
    assert_eq!(provider.fetch_count(), 2);
}

#[test]
fn forecast_many_keeps_request_order() {
    let provider = Arc::new(
        StaticProvider::new()
            .with_symbol("AAA", linear_bars(150, 10.0, 0.1))
            .with_symbol("BBB", linear_bars(150, 20.0, 0.2)),
    );
    let service = service_with(provider.clone(), xgb_store(20, 9.0));
    let requests = vec![
        ForecastRequest::new("AAA").days(2).model("xgb"),
        ForecastRequest::new("NOPE").model("xgb"),
        ForecastRequest::new("BBB").days(3).model("xgb"),
    ];
    let results = service.forecast_many(&requests);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().symbol, "AAA");
    assert!(matches!(results[1], Err(ForecastError::InvalidSymbol { .. })));
    assert_eq!(results[2].as_ref().unwrap().predictions.len(), 3);
    assert_eq!(provider.name(), "static");
}
