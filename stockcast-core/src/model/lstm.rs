//! Stacked LSTM regressor with a small dense head, inference only.
//!
//! Weights use the Keras layout: per layer a `kernel` of shape [I, 4H], a
//! `recurrent_kernel` of shape [H, 4H] and a `bias` of length 4H, with the
//! four gate blocks ordered input, forget, cell, output. Every LSTM layer
//! runs over the full sequence; the dense head reads the final hidden state.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayerWeights {
    pub kernel: Vec<Vec<f64>>,
    pub recurrent_kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseWeights {
    pub kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

/// Serialized form of an LSTM model body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmArtifact {
    pub layers: Vec<LstmLayerWeights>,
    pub dense: Vec<DenseWeights>,
}

#[derive(Debug)]
struct LstmLayer {
    kernel: Array2<f64>,
    recurrent: Array2<f64>,
    bias: Array1<f64>,
    hidden: usize,
}

#[derive(Debug)]
struct DenseLayer {
    kernel: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

/// Validated, matrix-form LSTM ready for inference.
#[derive(Debug)]
pub struct LstmNetwork {
    layers: Vec<LstmLayer>,
    head: Vec<DenseLayer>,
    n_features: usize,
}

fn to_matrix(rows: &[Vec<f64>], what: &str) -> Result<Array2<f64>, String> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if n_rows == 0 || n_cols == 0 {
        return Err(format!("{what} is empty"));
    }
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(format!("{what} has ragged rows"));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    if !flat.iter().all(|v| v.is_finite()) {
        return Err(format!("{what} contains non-finite weights"));
    }
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| format!("{what}: {e}"))
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LstmLayer {
    fn from_weights(w: &LstmLayerWeights, input: usize, index: usize) -> Result<Self, String> {
        let kernel = to_matrix(&w.kernel, &format!("layer {index} kernel"))?;
        let recurrent = to_matrix(&w.recurrent_kernel, &format!("layer {index} recurrent_kernel"))?;
        let hidden = recurrent.nrows();
        let gates = 4 * hidden;
        if kernel.dim() != (input, gates) {
            return Err(format!(
                "layer {index} kernel is {:?}, expected ({input}, {gates})",
                kernel.dim()
            ));
        }
        if recurrent.ncols() != gates {
            return Err(format!(
                "layer {index} recurrent_kernel is {:?}, expected ({hidden}, {gates})",
                recurrent.dim()
            ));
        }
        if w.bias.len() != gates {
            return Err(format!(
                "layer {index} bias has length {}, expected {gates}",
                w.bias.len()
            ));
        }
        Ok(Self {
            kernel,
            recurrent,
            bias: Array1::from(w.bias.clone()),
            hidden,
        })
    }

    /// Run the layer over a [T, I] sequence, returning the [T, H] hidden states.
    fn forward(&self, seq: ArrayView2<f64>) -> Array2<f64> {
        let h_len = self.hidden;
        let mut h = Array1::<f64>::zeros(h_len);
        let mut c = Array1::<f64>::zeros(h_len);
        let mut out = Array2::<f64>::zeros((seq.nrows(), h_len));

        for (t, x) in seq.rows().into_iter().enumerate() {
            let z = x.dot(&self.kernel) + h.dot(&self.recurrent) + &self.bias;
            for j in 0..h_len {
                let i_gate = sigmoid(z[j]);
                let f_gate = sigmoid(z[h_len + j]);
                let g_gate = z[2 * h_len + j].tanh();
                let o_gate = sigmoid(z[3 * h_len + j]);
                c[j] = f_gate * c[j] + i_gate * g_gate;
                h[j] = o_gate * c[j].tanh();
            }
            out.slice_mut(s![t, ..]).assign(&h);
        }
        out
    }
}

impl DenseLayer {
    fn forward(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let y = x.dot(&self.kernel) + &self.bias;
        match self.activation {
            Activation::Linear => y,
            Activation::Relu => y.mapv(|v| v.max(0.0)),
        }
    }
}

impl LstmNetwork {
    /// Build the network, checking every shape against `n_features` inputs.
    pub fn from_artifact(art: &LstmArtifact, n_features: usize) -> Result<Self, String> {
        if art.layers.is_empty() {
            return Err("LSTM has no recurrent layers".into());
        }
        if art.dense.is_empty() {
            return Err("LSTM has no dense head".into());
        }

        let mut width = n_features;
        let mut layers = Vec::with_capacity(art.layers.len());
        for (i, w) in art.layers.iter().enumerate() {
            let layer = LstmLayer::from_weights(w, width, i)?;
            width = layer.hidden;
            layers.push(layer);
        }

        let mut head = Vec::with_capacity(art.dense.len());
        for (i, d) in art.dense.iter().enumerate() {
            let kernel = to_matrix(&d.kernel, &format!("dense {i} kernel"))?;
            if kernel.nrows() != width {
                return Err(format!(
                    "dense {i} expects {} inputs but receives {width}",
                    kernel.nrows()
                ));
            }
            if d.bias.len() != kernel.ncols() {
                return Err(format!(
                    "dense {i} bias has length {}, expected {}",
                    d.bias.len(),
                    kernel.ncols()
                ));
            }
            width = kernel.ncols();
            head.push(DenseLayer {
                kernel,
                bias: Array1::from(d.bias.clone()),
                activation: d.activation,
            });
        }
        if width != 1 {
            return Err(format!("dense head produces {width} outputs, expected 1"));
        }

        Ok(Self {
            layers,
            head,
            n_features,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Forward pass over a scaled [L, C] window.
    pub fn forward(&self, window: ArrayView2<f64>) -> f64 {
        let mut seq = window.to_owned();
        for layer in &self.layers {
            seq = layer.forward(seq.view());
        }
        let last = seq.nrows().saturating_sub(1);
        let mut x = seq.row(last).to_owned();
        for dense in &self.head {
            x = dense.forward(x.view());
        }
        x[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn zeros(r: usize, c: usize) -> Vec<Vec<f64>> {
        vec![vec![0.0; c]; r]
    }

    /// One hidden unit, one input. Input gate and cell gate driven by x,
    /// forget gate closed, output gate saturated open.
    fn single_unit() -> LstmArtifact {
        LstmArtifact {
            layers: vec![LstmLayerWeights {
                kernel: vec![vec![0.0, 0.0, 1.0, 0.0]],
                recurrent_kernel: zeros(1, 4),
                bias: vec![0.0, -1e3, 0.0, 1e3],
            }],
            dense: vec![DenseWeights {
                kernel: vec![vec![2.0]],
                bias: vec![0.5],
                activation: Activation::Linear,
            }],
        }
    }

    #[test]
    fn single_step_matches_hand_computation() {
        let net = LstmNetwork::from_artifact(&single_unit(), 1).unwrap();
        let x = 0.3_f64;
        let window = Array2::from_elem((1, 1), x);
        // i = σ(0) = 0.5, g = tanh(x), c = 0.5 tanh(x), h = tanh(c)
        let c = 0.5 * x.tanh();
        let expected = 2.0 * c.tanh() + 0.5;
        assert!((net.forward(window.view()) - expected).abs() < 1e-12);
    }

    #[test]
    fn closed_forget_gate_only_sees_last_step() {
        let net = LstmNetwork::from_artifact(&single_unit(), 1).unwrap();
        let a = Array2::from_shape_vec((3, 1), vec![5.0, -2.0, 0.3]).unwrap();
        let b = Array2::from_shape_vec((1, 1), vec![0.3]).unwrap();
        assert!((net.forward(a.view()) - net.forward(b.view())).abs() < 1e-12);
    }

    #[test]
    fn relu_head_clamps_negative_outputs() {
        let mut art = single_unit();
        art.dense = vec![
            DenseWeights {
                kernel: vec![vec![-1.0]],
                bias: vec![0.0],
                activation: Activation::Relu,
            },
            DenseWeights {
                kernel: vec![vec![1.0]],
                bias: vec![7.0],
                activation: Activation::Linear,
            },
        ];
        let net = LstmNetwork::from_artifact(&art, 1).unwrap();
        let window = Array2::from_elem((1, 1), 1.0);
        assert_eq!(net.forward(window.view()), 7.0);
    }

    #[test]
    fn rejects_kernel_with_wrong_input_width() {
        let err = LstmNetwork::from_artifact(&single_unit(), 20).unwrap_err();
        assert!(err.contains("layer 0 kernel"), "{err}");
    }

    #[test]
    fn rejects_multi_output_head() {
        let mut art = single_unit();
        art.dense[0].kernel = vec![vec![1.0, 1.0]];
        art.dense[0].bias = vec![0.0, 0.0];
        let err = LstmNetwork::from_artifact(&art, 1).unwrap_err();
        assert!(err.contains("expected 1"), "{err}");
    }

    #[test]
    fn artifact_json_shape() {
        let json = r#"{
            "layers": [{"kernel": [[0,0,1,0]], "recurrent_kernel": [[0,0,0,0]], "bias": [0,0,0,0]}],
            "dense": [{"kernel": [[1]], "bias": [0]}]
        }"#;
        let art: LstmArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(art.dense[0].activation, Activation::Linear);
        assert!(LstmNetwork::from_artifact(&art, 1).is_ok());
    }
}
