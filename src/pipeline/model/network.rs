//! Feed-forward binary classifier
//!
//! Dense hidden layers with a configurable activation and inverted dropout,
//! a single sigmoid output unit, and binary cross-entropy loss. Layer
//! products use `faer` matrices. Training runs mini-batch epochs and, when a
//! validation subset is supplied, stops early once validation loss has not
//! improved for `patience` epochs. The weights of the best validation epoch
//! are always restored before `fit` returns.

use faer::Mat;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::{validate_rows, Classifier, ConvergenceWarning, TrainingTrace};
use crate::pipeline::config::TrainingBudget;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::split::Samples;

const LEAKY_RELU_ALPHA: f64 = 0.01;
const ELU_ALPHA: f64 = 1.0;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const RMSPROP_RHO: f64 = 0.9;
const EPSILON: f64 = 1e-7;

/// Hidden-layer nonlinearity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    /// Slope 0.01 below zero
    LeakyRelu,
    /// `exp(z) - 1` below zero
    Elu,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::LeakyRelu => {
                if z > 0.0 {
                    z
                } else {
                    LEAKY_RELU_ALPHA * z
                }
            }
            Activation::Elu => {
                if z > 0.0 {
                    z
                } else {
                    ELU_ALPHA * (z.exp() - 1.0)
                }
            }
        }
    }

    fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyRelu => {
                if z > 0.0 {
                    1.0
                } else {
                    LEAKY_RELU_ALPHA
                }
            }
            Activation::Elu => {
                if z > 0.0 {
                    1.0
                } else {
                    ELU_ALPHA * z.exp()
                }
            }
        }
    }
}

/// Gradient-descent rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Optimizer {
    Sgd { learning_rate: f64, momentum: f64 },
    Adam { learning_rate: f64 },
    RmsProp { learning_rate: f64 },
}

impl Optimizer {
    pub fn learning_rate(&self) -> f64 {
        match *self {
            Optimizer::Sgd { learning_rate, .. }
            | Optimizer::Adam { learning_rate }
            | Optimizer::RmsProp { learning_rate } => learning_rate,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Optimizer::Sgd { .. } => "SGD",
            Optimizer::Adam { .. } => "Adam",
            Optimizer::RmsProp { .. } => "RMSprop",
        }
    }

    /// Update one parameter in place. `m` and `v` are its first and second
    /// moment slots; `t` is the 1-based step count.
    fn step(&self, param: &mut f64, grad: f64, m: &mut f64, v: &mut f64, t: i32) {
        match *self {
            Optimizer::Sgd {
                learning_rate,
                momentum,
            } => {
                *m = momentum * *m - learning_rate * grad;
                *param += *m;
            }
            Optimizer::Adam { learning_rate } => {
                *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * grad;
                *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * grad * grad;
                let m_hat = *m / (1.0 - ADAM_BETA1.powi(t));
                let v_hat = *v / (1.0 - ADAM_BETA2.powi(t));
                *param -= learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
            }
            Optimizer::RmsProp { learning_rate } => {
                *v = RMSPROP_RHO * *v + (1.0 - RMSPROP_RHO) * grad * grad;
                *param -= learning_rate * grad / (v.sqrt() + EPSILON);
            }
        }
    }
}

/// Network hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkParams {
    /// Width of each hidden layer, input side first
    pub hidden_layers: Vec<usize>,
    pub activation: Activation,
    /// Fraction of hidden units dropped during training, in `[0, 1)`
    pub dropout: f64,
    /// L2 penalty on hidden-layer weights
    pub l2: f64,
    pub optimizer: Optimizer,
    pub budget: TrainingBudget,
    pub seed: u64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 32],
            activation: Activation::Relu,
            dropout: 0.0,
            l2: 0.0,
            optimizer: Optimizer::Adam { learning_rate: 0.001 },
            budget: TrainingBudget::default(),
            seed: 42,
        }
    }
}

impl NetworkParams {
    #[must_use]
    pub fn with_hidden_layers(mut self, widths: Vec<usize>) -> Self {
        self.hidden_layers = widths;
        self
    }

    #[must_use]
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    #[must_use]
    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    #[must_use]
    pub fn with_budget(mut self, budget: TrainingBudget) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let invalid = |msg: String| Err(PipelineError::Training(msg));

        if self.hidden_layers.is_empty() {
            return invalid("network needs at least one hidden layer".to_string());
        }
        if let Some(i) = self.hidden_layers.iter().position(|&w| w == 0) {
            return invalid(format!("hidden layer {} has zero width", i));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout must lie in [0, 1), got {}", self.dropout));
        }
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return invalid(format!("l2 must be non-negative, got {}", self.l2));
        }
        let lr = self.optimizer.learning_rate();
        if !(lr.is_finite() && lr > 0.0) {
            return invalid(format!("learning rate must be positive, got {}", lr));
        }
        if let Optimizer::Sgd { momentum, .. } = self.optimizer {
            if !(0.0..1.0).contains(&momentum) {
                return invalid(format!("momentum must lie in [0, 1), got {}", momentum));
            }
        }
        if self.budget.max_epochs == 0 || self.budget.batch_size == 0 {
            return invalid("epoch budget and batch size must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Layer {
    /// `n_in x n_out`
    weights: Mat<f64>,
    bias: Vec<f64>,
}

impl Layer {
    /// Glorot-uniform weights, zero bias
    fn glorot(n_in: usize, n_out: usize, rng: &mut ChaCha8Rng) -> Self {
        let limit = (6.0 / (n_in + n_out) as f64).sqrt();
        let mut weights = Mat::<f64>::zeros(n_in, n_out);
        for j in 0..n_out {
            for i in 0..n_in {
                weights[(i, j)] = rng.gen_range(-limit..limit);
            }
        }
        Self {
            weights,
            bias: vec![0.0; n_out],
        }
    }

    fn affine(&self, input: &Mat<f64>) -> Mat<f64> {
        let mut z = input * &self.weights;
        for j in 0..z.ncols() {
            for i in 0..z.nrows() {
                z[(i, j)] += self.bias[j];
            }
        }
        z
    }

    fn squared_norm(&self) -> f64 {
        let mut sum = 0.0;
        for j in 0..self.weights.ncols() {
            for i in 0..self.weights.nrows() {
                sum += self.weights[(i, j)].powi(2);
            }
        }
        sum
    }
}

/// Moment slots for one layer
#[derive(Debug, Clone)]
struct LayerState {
    m_w: Mat<f64>,
    v_w: Mat<f64>,
    m_b: Vec<f64>,
    v_b: Vec<f64>,
}

impl LayerState {
    fn zeros_like(layer: &Layer) -> Self {
        let (r, c) = (layer.weights.nrows(), layer.weights.ncols());
        Self {
            m_w: Mat::<f64>::zeros(r, c),
            v_w: Mat::<f64>::zeros(r, c),
            m_b: vec![0.0; c],
            v_b: vec![0.0; c],
        }
    }
}

/// Cached values of one training forward pass
struct ForwardPass {
    /// Layer inputs: `inputs[0]` is the batch, `inputs[l]` feeds layer `l`
    inputs: Vec<Mat<f64>>,
    /// Pre-activations of hidden layers
    pre_activations: Vec<Mat<f64>>,
    /// Inverted-dropout masks of hidden layers (all ones when disabled)
    masks: Vec<Mat<f64>>,
    probabilities: Vec<f64>,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn binary_cross_entropy(y: &[u8], p: &[f64]) -> f64 {
    let total: f64 = y
        .iter()
        .zip(p)
        .map(|(&t, &q)| {
            let q = q.clamp(EPSILON, 1.0 - EPSILON);
            if t == 1 {
                -q.ln()
            } else {
                -(1.0 - q).ln()
            }
        })
        .sum();
    total / y.len().max(1) as f64
}

fn to_matrix(x: &[Vec<f64>]) -> Mat<f64> {
    let cols = x.first().map_or(0, |r| r.len());
    let mut m = Mat::<f64>::zeros(x.len(), cols);
    for (i, row) in x.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            m[(i, j)] = v;
        }
    }
    m
}

/// Multilayer perceptron with a sigmoid output
#[derive(Debug, Clone)]
pub struct NeuralNetwork {
    params: NetworkParams,
    /// Hidden layers followed by the output layer
    layers: Vec<Layer>,
    n_features: usize,
}

impl NeuralNetwork {
    pub fn new(params: NetworkParams) -> Self {
        Self {
            params,
            layers: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    fn initialize(&mut self, n_features: usize, rng: &mut ChaCha8Rng) {
        let mut widths = vec![n_features];
        widths.extend(&self.params.hidden_layers);
        widths.push(1);
        self.layers = widths.windows(2).map(|w| Layer::glorot(w[0], w[1], rng)).collect();
        self.n_features = n_features;
    }

    fn hidden_count(&self) -> usize {
        self.layers.len() - 1
    }

    /// Forward pass. Dropout is sampled only when `rng` is given.
    fn forward(&self, batch: Mat<f64>, mut rng: Option<&mut ChaCha8Rng>) -> ForwardPass {
        let activation = self.params.activation;
        let keep = 1.0 - self.params.dropout;
        let mut pass = ForwardPass {
            inputs: vec![batch],
            pre_activations: Vec::with_capacity(self.hidden_count()),
            masks: Vec::with_capacity(self.hidden_count()),
            probabilities: Vec::new(),
        };

        for layer in &self.layers[..self.hidden_count()] {
            let z = layer.affine(&pass.inputs[pass.inputs.len() - 1]);
            let mut mask = Mat::<f64>::zeros(z.nrows(), z.ncols());
            let mut a = Mat::<f64>::zeros(z.nrows(), z.ncols());
            for j in 0..z.ncols() {
                for i in 0..z.nrows() {
                    let m = match rng.as_deref_mut() {
                        Some(r) if self.params.dropout > 0.0 => {
                            if r.gen::<f64>() < keep {
                                1.0 / keep
                            } else {
                                0.0
                            }
                        }
                        _ => 1.0,
                    };
                    mask[(i, j)] = m;
                    a[(i, j)] = activation.apply(z[(i, j)]) * m;
                }
            }
            pass.pre_activations.push(z);
            pass.masks.push(mask);
            pass.inputs.push(a);
        }

        let output = &self.layers[self.hidden_count()];
        let z_out = output.affine(&pass.inputs[pass.inputs.len() - 1]);
        pass.probabilities = (0..z_out.nrows()).map(|i| sigmoid(z_out[(i, 0)])).collect();
        pass
    }

    fn l2_penalty(&self) -> f64 {
        if self.params.l2 == 0.0 {
            return 0.0;
        }
        self.params.l2
            * self.layers[..self.hidden_count()]
                .iter()
                .map(Layer::squared_norm)
                .sum::<f64>()
    }

    /// Binary cross-entropy plus the L2 penalty, without dropout
    pub fn loss(&self, samples: &Samples) -> PipelineResult<f64> {
        let p = self.predict_proba(&samples.x)?;
        Ok(binary_cross_entropy(&samples.y, &p) + self.l2_penalty())
    }

    /// One optimizer step on a mini-batch. Returns the batch loss.
    fn train_batch(
        &mut self,
        x: &[Vec<f64>],
        y: &[u8],
        state: &mut [LayerState],
        t: i32,
        rng: &mut ChaCha8Rng,
    ) -> f64 {
        let pass = self.forward(to_matrix(x), Some(rng));
        let n = y.len() as f64;
        let loss = binary_cross_entropy(y, &pass.probabilities) + self.l2_penalty();

        // d(BCE)/dz at the sigmoid output
        let mut delta = Mat::<f64>::zeros(y.len(), 1);
        for (i, (&t_i, &p)) in y.iter().zip(&pass.probabilities).enumerate() {
            delta[(i, 0)] = (p - f64::from(t_i)) / n;
        }

        let hidden = self.hidden_count();
        let optimizer = self.params.optimizer;
        let activation = self.params.activation;
        let l2 = self.params.l2;

        for l in (0..self.layers.len()).rev() {
            let mut grad_w = pass.inputs[l].transpose() * &delta;
            let grad_b: Vec<f64> = (0..delta.ncols())
                .map(|j| (0..delta.nrows()).map(|i| delta[(i, j)]).sum())
                .collect();

            if l < hidden && l2 > 0.0 {
                for j in 0..grad_w.ncols() {
                    for i in 0..grad_w.nrows() {
                        grad_w[(i, j)] += 2.0 * l2 * self.layers[l].weights[(i, j)];
                    }
                }
            }

            if l > 0 {
                let back = delta.as_ref() * self.layers[l].weights.transpose();
                let z = &pass.pre_activations[l - 1];
                let mask = &pass.masks[l - 1];
                let mut next = Mat::<f64>::zeros(back.nrows(), back.ncols());
                for j in 0..back.ncols() {
                    for i in 0..back.nrows() {
                        next[(i, j)] = back[(i, j)] * mask[(i, j)] * activation.derivative(z[(i, j)]);
                    }
                }
                delta = next;
            }

            let layer = &mut self.layers[l];
            let slots = &mut state[l];
            for j in 0..layer.weights.ncols() {
                for i in 0..layer.weights.nrows() {
                    optimizer.step(
                        &mut layer.weights[(i, j)],
                        grad_w[(i, j)],
                        &mut slots.m_w[(i, j)],
                        &mut slots.v_w[(i, j)],
                        t,
                    );
                }
                optimizer.step(&mut layer.bias[j], grad_b[j], &mut slots.m_b[j], &mut slots.v_b[j], t);
            }
        }

        loss
    }
}

impl Classifier for NeuralNetwork {
    fn fit(&mut self, train: &Samples, validation: Option<&Samples>) -> PipelineResult<TrainingTrace> {
        self.params.validate()?;
        let n_features = validate_rows(&train.x, None)?;
        if let Some(val) = validation {
            if !val.is_empty() {
                validate_rows(&val.x, Some(n_features))?;
            }
        }
        let validation = validation.filter(|v| !v.is_empty());

        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        self.initialize(n_features, &mut rng);
        let mut state: Vec<LayerState> = self.layers.iter().map(LayerState::zeros_like).collect();

        let budget = self.params.budget;
        let mut trace = TrainingTrace::default();
        let mut best: Option<(f64, usize, Vec<Layer>)> = None;
        let mut wait = 0;
        let mut step = 0i32;
        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 1..=budget.max_epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for chunk in order.chunks(budget.batch_size) {
                let batch = train.select(chunk);
                step += 1;
                let loss = self.train_batch(&batch.x, &batch.y, &mut state, step, &mut rng);
                if !loss.is_finite() {
                    return Err(PipelineError::Training(format!(
                        "loss became non-finite at epoch {}",
                        epoch
                    )));
                }
                epoch_loss += loss * chunk.len() as f64;
            }

            trace.train_loss.push(epoch_loss / train.len() as f64);
            trace.epochs_trained = epoch;

            let Some(val) = validation else { continue };
            let val_loss = self.loss(val)?;
            if !val_loss.is_finite() {
                return Err(PipelineError::Training(format!(
                    "validation loss became non-finite at epoch {}",
                    epoch
                )));
            }
            trace.validation_loss.push(val_loss);

            if best.as_ref().map_or(true, |(b, _, _)| val_loss < *b) {
                best = Some((val_loss, epoch, self.layers.clone()));
                wait = 0;
            } else {
                wait += 1;
                if wait >= budget.patience {
                    trace.stopped_early = true;
                    break;
                }
            }
        }

        if let Some((_, epoch, layers)) = best {
            self.layers = layers;
            trace.best_epoch = Some(epoch);
        }

        if validation.is_some() && !trace.stopped_early {
            trace.warnings.push(ConvergenceWarning {
                epochs: trace.epochs_trained,
                message: format!(
                    "epoch budget of {} exhausted before early stopping triggered",
                    budget.max_epochs
                ),
            });
        }

        Ok(trace)
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<f64>> {
        if self.layers.is_empty() {
            return Err(PipelineError::Training("network has not been fit".to_string()));
        }
        if x.is_empty() {
            return Ok(Vec::new());
        }
        validate_rows(x, Some(self.n_features))?;
        Ok(self.forward(to_matrix(x), None).probabilities)
    }
}
