use super::{CalibrationTable, ModelArtifact, RiskModel};
use crate::normalize::NormalizedRecord;

/// Logistic regression over standardized features, optionally calibrated.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    version: String,
    coefficients: Vec<f64>,
    intercept: f64,
    threshold: f64,
    calibration: Option<CalibrationTable>,
}

impl LogisticModel {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            version: artifact.version,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
            threshold: artifact.decision_threshold,
            calibration: artifact.calibration,
        }
    }

    fn decision_function(&self, features: &NormalizedRecord) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features.iter())
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

fn sigmoid(z: f64) -> f64 {
    // Split on sign so exp never overflows.
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Linear interpolation between breakpoints, clamped at both ends.
fn calibrate(table: &CalibrationTable, p: f64) -> f64 {
    let n = table.x.len();
    if p <= table.x[0] {
        return table.y[0];
    }
    if p >= table.x[n - 1] {
        return table.y[n - 1];
    }
    let upper = table.x.partition_point(|x| *x <= p);
    let (x0, x1) = (table.x[upper - 1], table.x[upper]);
    let (y0, y1) = (table.y[upper - 1], table.y[upper]);
    y0 + (y1 - y0) * (p - x0) / (x1 - x0)
}

impl RiskModel for LogisticModel {
    fn predict_proba(&self, features: &NormalizedRecord) -> f64 {
        let p = sigmoid(self.decision_function(features));
        match &self.calibration {
            Some(table) if p.is_finite() => calibrate(table, p),
            _ => p,
        }
    }

    fn decision_threshold(&self) -> f64 {
        self.threshold
    }

    fn version(&self) -> &str {
        &self.version
    }
}
