//! Classification metrics on held-out data

use serde::{Deserialize, Serialize};

use super::error::{PipelineError, PipelineResult};
use super::model::{threshold_labels, Classifier};
use super::split::Samples;
use super::target::ClassBalance;

/// Scores of one trained model on one held-out set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: f64,
    pub n_features: usize,
}

/// Counts of predicted vs. true labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (1, 1) => cm.tp += 1,
                (1, _) => cm.fn_ += 1,
                (_, 1) => cm.fp += 1,
                _ => cm.tn += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// TP / (TP + FP), 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// TP / (TP + FN), 0 when there are no positives
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve by trapezoidal integration.
///
/// Tied scores form a single step on the curve. Fails with
/// [`PipelineError::InsufficientData`] if `y_true` holds only one class and
/// with [`PipelineError::DataFormat`] on a non-finite score.
pub fn roc_auc(y_true: &[u8], y_score: &[f64]) -> PipelineResult<f64> {
    if y_true.len() != y_score.len() {
        return Err(PipelineError::DataFormat(format!(
            "{} labels but {} scores",
            y_true.len(),
            y_score.len()
        )));
    }
    if let Some(i) = y_score.iter().position(|s| !s.is_finite()) {
        return Err(PipelineError::DataFormat(format!(
            "non-finite score {} at row {}",
            y_score[i], i
        )));
    }
    let balance = ClassBalance::from_labels(y_true);
    if !balance.has_both_classes() {
        return Err(PipelineError::InsufficientData(
            "AUC is undefined when only one class is present".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));

    let (mut tp, mut fp) = (0usize, 0usize);
    let (mut prev_tpr, mut prev_fpr) = (0.0, 0.0);
    let mut area = 0.0;
    let mut i = 0;

    while i < order.len() {
        let threshold = y_score[order[i]];
        while i < order.len() && y_score[order[i]].total_cmp(&threshold).is_eq() {
            if y_true[order[i]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let tpr = tp as f64 / balance.positives as f64;
        let fpr = fp as f64 / balance.negatives as f64;
        area += (fpr - prev_fpr) * (tpr + prev_tpr) / 2.0;
        prev_tpr = tpr;
        prev_fpr = fpr;
    }

    Ok(area)
}

/// Compute all metrics from labels, hard predictions and scores
pub fn compute_metrics(
    y_true: &[u8],
    y_pred: &[u8],
    y_score: &[f64],
    n_features: usize,
) -> PipelineResult<MetricResult> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::DataFormat(format!(
            "{} labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    let cm = ConfusionMatrix::from_labels(y_true, y_pred);
    Ok(MetricResult {
        accuracy: cm.accuracy(),
        precision: cm.precision(),
        recall: cm.recall(),
        f1: cm.f1(),
        auc: roc_auc(y_true, y_score)?,
        n_features,
    })
}

/// Score a trained model on held-out samples
pub fn evaluate(
    model: &dyn Classifier,
    samples: &Samples,
    n_features: usize,
) -> PipelineResult<(MetricResult, ConfusionMatrix)> {
    let scores = model.predict_proba(&samples.x)?;
    let predicted = threshold_labels(&scores);
    let metrics = compute_metrics(&samples.y, &predicted, &scores, n_features)?;
    Ok((metrics, ConfusionMatrix::from_labels(&samples.y, &predicted)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_recall_scenario() {
        let m = compute_metrics(&[0, 1, 1, 0], &[0, 1, 0, 0], &[0.1, 0.9, 0.4, 0.2], 3).unwrap();
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 0.5);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.auc, 1.0);
        assert_eq!(m.n_features, 3);
    }

    #[test]
    fn test_zero_denominators_are_zero() {
        let cm = ConfusionMatrix::from_labels(&[0, 1, 0], &[0, 0, 0]);
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.f1(), 0.0);
    }

    #[test]
    fn test_auc_with_ties() {
        // all scores tied: diagonal ROC curve
        let auc = roc_auc(&[0, 1, 0, 1], &[0.5, 0.5, 0.5, 0.5]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);

        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_undefined() {
        let err = roc_auc(&[1, 1, 1], &[0.2, 0.3, 0.9]).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }

    #[test]
    fn test_non_finite_scores_rejected() {
        let err = roc_auc(&[0, 1, 0, 1], &[0.2, f64::NAN, 0.4, 0.9]).unwrap_err();
        assert!(matches!(err, PipelineError::DataFormat(_)));

        let err = compute_metrics(&[0, 1], &[0, 1], &[f64::NAN, 0.9], 1).unwrap_err();
        assert!(matches!(err, PipelineError::DataFormat(_)));

        assert!(roc_auc(&[0, 1], &[0.1, f64::INFINITY]).is_err());
    }

    struct Fixed(Vec<f64>);

    impl Classifier for Fixed {
        fn fit(&mut self, _: &Samples, _: Option<&Samples>) -> PipelineResult<crate::pipeline::model::TrainingTrace> {
            Ok(Default::default())
        }
        fn predict_proba(&self, _: &[Vec<f64>]) -> PipelineResult<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_evaluate_thresholds_probabilities() {
        let model = Fixed(vec![0.5, 0.9, 0.2, 0.51]);
        let samples = Samples::new(vec![vec![0.0]; 4], vec![0, 1, 0, 1]);
        let (metrics, cm) = evaluate(&model, &samples, 1).unwrap();
        assert_eq!(cm, ConfusionMatrix { tn: 2, fp: 0, fn_: 0, tp: 2 });
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.auc, 1.0);
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let cm = ConfusionMatrix::from_labels(&[1, 1, 0, 0, 1], &[1, 0, 1, 0, 1]);
        assert_eq!(cm, ConfusionMatrix { tn: 1, fp: 1, fn_: 1, tp: 2 });
    }
}
