//! Persisted regression models: artifact formats, the `Regressor` trait and
//! the store that loads validated bundles.

pub mod bundle;
pub mod lstm;
pub mod regressor;
pub mod scaler;
pub mod store;
pub mod trees;

pub use bundle::ModelBundle;
pub use lstm::{Activation, DenseWeights, LstmArtifact, LstmLayerWeights, LstmNetwork};
pub use regressor::{Regressor, RegressorArtifact, RegressorBody};
pub use scaler::Scaler;
pub use store::{
    artifact_names, ArtifactStore, FsArtifactStore, MemoryArtifactStore, ModelStore, StoreError,
};
pub use trees::{RegressionTree, TreeEnsemble, TreeNode};
