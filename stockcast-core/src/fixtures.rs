//! Deterministic bars, model artifacts and providers for tests and benches.
//!
//! Nothing here touches the network or the filesystem.

use crate::data::{DataError, DataSource, FetchResult, HistoryProvider};
use crate::domain::{ModelChoice, PriceBar};
use crate::features::{FeatureColumn, FeatureRow, FEATURE_COUNT};
use crate::model::{
    artifact_names, Activation, DenseWeights, LstmArtifact, LstmLayerWeights,
    MemoryArtifactStore, RegressionTree, RegressorArtifact, RegressorBody, Scaler, TreeEnsemble,
    TreeNode,
};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// First date used by the bar generators (a Monday).
pub fn anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or(NaiveDate::MIN)
}

fn bar(date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        date,
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        adj_close: Some(close),
        volume: 1_000_000,
    }
}

/// `n` consecutive calendar-day bars with closes `start + i * step`.
pub fn linear_bars(n: usize, start: f64, step: f64) -> Vec<PriceBar> {
    let anchor = anchor_date();
    (0..n)
        .map(|i| {
            let date = anchor + Days::new(i as u64);
            bar(date, start + i as f64 * step)
        })
        .collect()
}

/// `n` bars tracing a sine wave around `level`. Gains and losses both occur,
/// so RSI and MACD take non-degenerate values.
pub fn wave_bars(n: usize, level: f64, amplitude: f64) -> Vec<PriceBar> {
    let anchor = anchor_date();
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = level + amplitude * (t / 6.0).sin() + 0.05 * t;
            bar(anchor + Days::new(i as u64), close)
        })
        .collect()
}

fn feature_names() -> Option<Vec<String>> {
    Some(FeatureColumn::names().map(String::from).collect())
}

/// Standard scaler that leaves every feature untouched.
pub fn identity_input_scaler() -> Scaler {
    Scaler::Standard {
        mean: vec![0.0; FEATURE_COUNT],
        scale: vec![1.0; FEATURE_COUNT],
        feature_names: feature_names(),
    }
}

/// Single-column standard scaler that leaves the target untouched.
pub fn identity_target_scaler() -> Scaler {
    Scaler::Standard {
        mean: vec![0.0],
        scale: vec![1.0],
        feature_names: None,
    }
}

/// Min-max scaler fitted on `rows`, the way a training pipeline would.
pub fn fit_min_max(rows: &[FeatureRow]) -> Scaler {
    let mut data_min = vec![f64::INFINITY; FEATURE_COUNT];
    let mut data_max = vec![f64::NEG_INFINITY; FEATURE_COUNT];
    for row in rows {
        for (c, v) in row.values().iter().enumerate() {
            data_min[c] = data_min[c].min(*v);
            data_max[c] = data_max[c].max(*v);
        }
    }
    Scaler::MinMax {
        data_min,
        data_max,
        feature_range: [0.0, 1.0],
        feature_names: feature_names(),
    }
}

/// Min-max target scaler over close prices in `[lo, hi]`.
pub fn close_range_scaler(lo: f64, hi: f64) -> Scaler {
    Scaler::MinMax {
        data_min: vec![lo],
        data_max: vec![hi],
        feature_range: [0.0, 1.0],
        feature_names: None,
    }
}

/// A tree model with no trees: every prediction is `value`.
pub fn constant_trees(lookback: usize, value: f64) -> RegressorArtifact {
    RegressorArtifact {
        lookback,
        n_features: FEATURE_COUNT,
        model: RegressorBody::GradientBoosted(TreeEnsemble {
            base_score: value,
            trees: Vec::new(),
        }),
    }
}

/// One stump on the last window row's close: `below` when the close is under
/// `threshold`, otherwise `above`.
pub fn threshold_trees(lookback: usize, threshold: f64, below: f64, above: f64) -> RegressorArtifact {
    let feature = lookback.saturating_sub(1) * FEATURE_COUNT + FeatureColumn::Close.index();
    RegressorArtifact {
        lookback,
        n_features: FEATURE_COUNT,
        model: RegressorBody::GradientBoosted(TreeEnsemble {
            base_score: 0.0,
            trees: vec![RegressionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature,
                        threshold,
                        left: 1,
                        right: 2,
                        default_left: true,
                    },
                    TreeNode::Leaf { value: below },
                    TreeNode::Leaf { value: above },
                ],
            }],
        }),
    }
}

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize, limit: f64) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|_| (0..cols).map(|_| rng.gen_range(-limit..limit)).collect())
        .collect()
}

/// Single-layer LSTM with a relu/linear head and small random weights drawn
/// from `seed`.
pub fn seeded_lstm_artifact(lookback: usize, hidden: usize, seed: u64) -> RegressorArtifact {
    let mut rng = StdRng::seed_from_u64(seed);
    let gates = 4 * hidden;
    let layer = LstmLayerWeights {
        kernel: random_matrix(&mut rng, FEATURE_COUNT, gates, 0.3),
        recurrent_kernel: random_matrix(&mut rng, hidden, gates, 0.3),
        bias: (0..gates).map(|_| rng.gen_range(-0.1..0.1)).collect(),
    };
    let dense = vec![
        DenseWeights {
            kernel: random_matrix(&mut rng, hidden, hidden, 0.5),
            bias: vec![0.0; hidden],
            activation: Activation::Relu,
        },
        DenseWeights {
            kernel: random_matrix(&mut rng, hidden, 1, 0.5),
            bias: vec![0.5],
            activation: Activation::Linear,
        },
    ];
    RegressorArtifact {
        lookback,
        n_features: FEATURE_COUNT,
        model: RegressorBody::Lstm(LstmArtifact {
            layers: vec![layer],
            dense,
        }),
    }
}

/// An in-memory store holding all three artifacts for `choice`.
pub fn memory_store(
    choice: ModelChoice,
    model: &RegressorArtifact,
    input: &Scaler,
    target: &Scaler,
) -> Result<MemoryArtifactStore, serde_json::Error> {
    let mut store = MemoryArtifactStore::new();
    add_model(&mut store, choice, model, input, target)?;
    Ok(store)
}

/// Add the three artifacts for `choice` to `store`.
pub fn add_model(
    store: &mut MemoryArtifactStore,
    choice: ModelChoice,
    model: &RegressorArtifact,
    input: &Scaler,
    target: &Scaler,
) -> Result<(), serde_json::Error> {
    let [model_name, x_name, y_name] = artifact_names(choice);
    store.insert_json(model_name, model)?;
    store.insert_json(x_name, input)?;
    store.insert_json(y_name, target)
}

/// Serves fixed bars per symbol, ignoring the requested range, and counts
/// calls. Unknown symbols are `SymbolNotFound`.
#[derive(Debug, Default)]
pub struct StaticProvider {
    bars: HashMap<String, Vec<PriceBar>>,
    fetches: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl HistoryProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let bars = self
            .bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::Synthetic,
        })
    }
}
