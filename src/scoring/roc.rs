use serde::{Deserialize, Deserializer, Serialize};

use super::RiskContext;
use crate::dataset::ReferenceDataset;
use crate::error::{RiskError, RiskResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub false_positive_rate: f64,
    pub true_positive_rate: f64,
    /// Scores at or above this value are called positive. Infinite for the origin.
    #[serde(deserialize_with = "deserialize_threshold")]
    pub threshold: f64,
}

// JSON has no infinity; serde_json writes it as null.
fn deserialize_threshold<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub auc: f64,
}

impl RocCurve {
    /// Build the curve from scores and binary ground truth.
    pub fn from_scores(scores: &[f64], labels: &[u8]) -> RiskResult<Self> {
        if scores.len() != labels.len() {
            return Err(RiskError::Validation(format!(
                "{} scores but {} labels",
                scores.len(),
                labels.len()
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(RiskError::Validation(format!("score {} is not finite", bad)));
        }

        let positives = labels.iter().filter(|l| **l == 1).count();
        let negatives = labels.len() - positives;
        if positives == 0 || negatives == 0 {
            return Err(RiskError::Validation(format!(
                "ROC needs both classes in the reference dataset ({} positive, {} negative)",
                positives, negatives
            )));
        }

        let mut pairs: Vec<(f64, u8)> = scores.iter().copied().zip(labels.iter().copied()).collect();
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut points = vec![RocPoint {
            false_positive_rate: 0.0,
            true_positive_rate: 0.0,
            threshold: f64::INFINITY,
        }];

        let (mut tp, mut fp) = (0usize, 0usize);
        let mut i = 0;
        while i < pairs.len() {
            let threshold = pairs[i].0;
            // Ties share one threshold and move the curve in a single step.
            while i < pairs.len() && pairs[i].0 == threshold {
                if pairs[i].1 == 1 {
                    tp += 1;
                } else {
                    fp += 1;
                }
                i += 1;
            }
            points.push(RocPoint {
                false_positive_rate: fp as f64 / negatives as f64,
                true_positive_rate: tp as f64 / positives as f64,
                threshold,
            });
        }

        let auc = trapezoid_auc(&points);
        Ok(Self { points, auc })
    }

    pub fn false_positive_rates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.false_positive_rate).collect()
    }

    pub fn true_positive_rates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.true_positive_rate).collect()
    }
}

fn trapezoid_auc(points: &[RocPoint]) -> f64 {
    let area: f64 = points
        .windows(2)
        .map(|w| {
            let dx = w[1].false_positive_rate - w[0].false_positive_rate;
            dx * (w[0].true_positive_rate + w[1].true_positive_rate) / 2.0
        })
        .sum();
    area.clamp(0.0, 1.0)
}

/// Score every reference record and compare against its ground-truth label.
pub fn roc_curve(ctx: &RiskContext, reference: &ReferenceDataset) -> RiskResult<RocCurve> {
    let predictions = ctx.predict_batch(&reference.records)?;
    let scores: Vec<f64> = predictions.iter().map(|p| p.probability).collect();
    RocCurve::from_scores(&scores, &reference.targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::context;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_perfect_separator() {
        let curve = RocCurve::from_scores(&[0.9, 0.8, 0.7, 0.3, 0.2], &[1, 1, 1, 0, 0]).unwrap();
        assert_relative_eq!(curve.auc, 1.0);
        let first = curve.points.first().unwrap();
        let last = curve.points.last().unwrap();
        assert_eq!((first.false_positive_rate, first.true_positive_rate), (0.0, 0.0));
        assert_eq!((last.false_positive_rate, last.true_positive_rate), (1.0, 1.0));
    }

    #[test]
    fn test_inverted_separator() {
        let curve = RocCurve::from_scores(&[0.1, 0.2, 0.8, 0.9], &[1, 1, 0, 0]).unwrap();
        assert_relative_eq!(curve.auc, 0.0);
    }

    #[test]
    fn test_ties_form_one_step() {
        let curve = RocCurve::from_scores(&[0.5, 0.5, 0.5, 0.5], &[1, 0, 1, 0]).unwrap();
        assert_eq!(curve.points.len(), 2);
        assert_relative_eq!(curve.auc, 0.5);
    }

    #[test]
    fn test_known_curve() {
        // sklearn: roc_auc_score([0, 0, 1, 1], [0.1, 0.4, 0.35, 0.8]) == 0.75
        let curve = RocCurve::from_scores(&[0.1, 0.4, 0.35, 0.8], &[0, 0, 1, 1]).unwrap();
        assert_relative_eq!(curve.auc, 0.75);
        assert_eq!(curve.false_positive_rates(), vec![0.0, 0.0, 0.5, 0.5, 1.0]);
        assert_eq!(curve.true_positive_rates(), vec![0.0, 0.5, 0.5, 1.0, 1.0]);
        assert_eq!(curve.points[1].threshold, 0.8);
    }

    #[test]
    fn test_random_labels_near_half() {
        let mut rng = StdRng::seed_from_u64(2024);
        let scores: Vec<f64> = (0..4000).map(|_| rng.gen::<f64>()).collect();
        let labels: Vec<u8> = (0..4000).map(|_| rng.gen_bool(0.5) as u8).collect();
        let curve = RocCurve::from_scores(&scores, &labels).unwrap();
        assert!((curve.auc - 0.5).abs() < 0.05, "auc = {}", curve.auc);
    }

    #[test]
    fn test_single_class_is_rejected() {
        assert!(RocCurve::from_scores(&[0.2, 0.8], &[1, 1]).is_err());
        assert!(RocCurve::from_scores(&[0.2], &[0, 1]).is_err());
    }

    #[test]
    fn test_origin_threshold_survives_json() {
        let curve = RocCurve::from_scores(&[0.9, 0.2], &[1, 0]).unwrap();
        let json = serde_json::to_string(&curve).unwrap();
        let parsed: RocCurve = serde_json::from_str(&json).unwrap();
        assert!(parsed.points[0].threshold.is_infinite());
        assert_eq!(parsed.points[1..], curve.points[1..]);
    }

    #[test]
    fn test_reference_curve_is_bounded() {
        let ctx = context(300, 21);
        let curve = roc_curve(&ctx, ctx.reference()).unwrap();
        assert!((0.0..=1.0).contains(&curve.auc));
        // The fixture model carries real signal.
        assert!(curve.auc > 0.7, "auc = {}", curve.auc);
        assert!(curve
            .points
            .windows(2)
            .all(|w| w[1].false_positive_rate >= w[0].false_positive_rate));
    }
}
