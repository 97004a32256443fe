//! Column scaling fit on training rows only
//!
//! [`Scaler`] can only be fit; the resulting [`FittedScaler`] can only
//! transform. There is no combined fit-and-apply over a whole split, so
//! held-out rows never influence the parameters.

use serde::Serialize;

use super::error::{PipelineError, PipelineResult};
use super::split::{DataSplit, Samples};

/// Scaling family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaler {
    /// Zero mean, unit population variance
    Standard,
    /// Rescale to [0, 1] using the training minimum and maximum
    MinMax,
}

/// Per-column parameters learned from training rows.
///
/// `transform` computes `(x - offset) / scale` for every column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedScaler {
    offset: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    /// Learn column parameters from `train`.
    ///
    /// Zero-variance (or zero-range) columns get a scale of 1.
    pub fn fit(self, train: &Samples) -> PipelineResult<FittedScaler> {
        if train.is_empty() {
            return Err(PipelineError::InsufficientData(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }
        let n_features = train.n_features();
        let n = train.len() as f64;
        let mut offset = Vec::with_capacity(n_features);
        let mut scale = Vec::with_capacity(n_features);

        for j in 0..n_features {
            let column = train.x.iter().map(|r| r[j]);
            let (o, s) = match self {
                Scaler::Standard => {
                    let mean = column.clone().sum::<f64>() / n;
                    let var = column.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                    (mean, var.sqrt())
                }
                Scaler::MinMax => {
                    let (min, max) = column.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                    (min, max - min)
                }
            };
            offset.push(o);
            scale.push(if s > f64::EPSILON { s } else { 1.0 });
        }

        Ok(FittedScaler {
            offset,
            scale,
        })
    }
}

impl FittedScaler {
    /// Apply the learned parameters to `samples`
    pub fn transform(&self, samples: &Samples) -> PipelineResult<Samples> {
        if !samples.is_empty() && samples.n_features() != self.offset.len() {
            return Err(PipelineError::DataFormat(format!(
                "Scaler was fit on {} features, got {}",
                self.offset.len(),
                samples.n_features()
            )));
        }
        let x = samples
            .x
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.offset.iter().zip(&self.scale))
                    .map(|(v, (o, s))| (v - o) / s)
                    .collect()
            })
            .collect();
        Ok(Samples::new(x, samples.y.clone()))
    }
}

/// A split whose subsets were scaled with parameters fit on its train rows
#[derive(Debug, Clone)]
pub struct ScaledSplit {
    pub feature_names: Vec<String>,
    pub train: Samples,
    pub validation: Option<Samples>,
    pub test: Samples,
    pub scaler: FittedScaler,
}

impl ScaledSplit {
    pub fn fit(split: &DataSplit, scaler: Scaler) -> PipelineResult<Self> {
        let fitted = scaler.fit(&split.train)?;
        Ok(Self {
            feature_names: split.feature_names.clone(),
            train: fitted.transform(&split.train)?,
            validation: split
                .validation
                .as_ref()
                .map(|v| fitted.transform(v))
                .transpose()?,
            test: fitted.transform(&split.test)?,
            scaler: fitted,
        })
    }
}
