pub mod logistic;

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::normalize::NormalizedRecord;

/// A trained binary classifier over normalized features.
pub trait RiskModel: Send + Sync {
    /// Probability of the positive class.
    fn predict_proba(&self, features: &NormalizedRecord) -> f64;

    /// Probability above which a record is labeled positive.
    fn decision_threshold(&self) -> f64;

    fn version(&self) -> &str;

    fn predict_label(&self, probability: f64) -> u8 {
        if probability > self.decision_threshold() {
            1
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Logistic,
}

/// Piecewise-linear (isotonic) probability calibration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationTable {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// On-disk classifier description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub kind: ModelKind,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub decision_threshold: f64,
    #[serde(default)]
    pub calibration: Option<CalibrationTable>,
}

fn default_threshold() -> f64 {
    0.5
}

impl ModelArtifact {
    pub fn from_file<P: AsRef<Path>>(path: P) -> RiskResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RiskError::ModelLoad(format!("cannot read {:?}: {}", path, e)))?;
        let artifact: ModelArtifact = serde_json::from_str(&content)
            .map_err(|e| RiskError::ModelLoad(format!("cannot parse {:?}: {}", path, e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> RiskResult<()> {
        if self.feature_names.len() != FEATURE_COUNT
            || self.feature_names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
        {
            return Err(RiskError::ModelLoad(format!(
                "model features [{}] do not match expected [{}]",
                self.feature_names.join(", "),
                FEATURE_NAMES.join(", ")
            )));
        }

        if self.coefficients.len() != FEATURE_COUNT {
            return Err(RiskError::ModelLoad(format!(
                "expected {} coefficients, got {}",
                FEATURE_COUNT,
                self.coefficients.len()
            )));
        }

        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(RiskError::ModelLoad(
                "coefficients and intercept must be finite".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(RiskError::ModelLoad(format!(
                "decision threshold must be in [0, 1], got {}",
                self.decision_threshold
            )));
        }

        if let Some(table) = &self.calibration {
            if table.x.is_empty() || table.x.len() != table.y.len() {
                return Err(RiskError::ModelLoad(
                    "calibration table needs matching, non-empty x and y".to_string(),
                ));
            }
            if table.x.windows(2).any(|w| w[1] <= w[0]) {
                return Err(RiskError::ModelLoad(
                    "calibration breakpoints must be strictly increasing".to_string(),
                ));
            }
            if table.y.iter().any(|y| !(0.0..=1.0).contains(y)) {
                return Err(RiskError::ModelLoad(
                    "calibration outputs must be in [0, 1]".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Build the classifier described by an artifact.
pub fn create_model(artifact: ModelArtifact) -> RiskResult<Box<dyn RiskModel>> {
    artifact.validate()?;
    match artifact.kind {
        ModelKind::Logistic => Ok(Box::new(logistic::LogisticModel::new(artifact))),
    }
}

/// Load and build the classifier. Any failure here is fatal at startup.
pub fn load_model<P: AsRef<Path>>(path: P) -> RiskResult<Box<dyn RiskModel>> {
    let artifact = ModelArtifact::from_file(&path)?;
    info!(
        "Loaded {:?} model version {} from {:?}",
        artifact.kind,
        artifact.version,
        path.as_ref()
    );
    create_model(artifact)
}
