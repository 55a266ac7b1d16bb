pub mod roc;
pub mod summary;

use std::sync::OnceLock;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::dataset::{self, ReferenceDataset};
use crate::error::{RiskError, RiskResult};
use crate::features::PatientRecord;
use crate::model::{self, RiskModel};
use crate::normalize::{NormalizedRecord, ScalingModel};

pub use roc::RocCurve;
pub use summary::CohortSummary;

/// Lower bound (inclusive, in percent) of the High category.
pub const HIGH_RISK_PERCENT: f64 = 70.0;
/// Lower bound (inclusive, in percent) of the Medium category.
pub const MEDIUM_RISK_PERCENT: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskCategory {
    High,
    Medium,
    Low,
}

impl RiskCategory {
    /// Display order for tables and charts.
    pub const ALL: [RiskCategory; 3] = [RiskCategory::High, RiskCategory::Medium, RiskCategory::Low];

    /// Fixed thresholds on the probability in percent.
    #[must_use]
    pub fn classify(probability_percent: f64) -> Self {
        if probability_percent >= HIGH_RISK_PERCENT {
            Self::High
        } else if probability_percent >= MEDIUM_RISK_PERCENT {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Chart color (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::High => (244, 63, 94),
            Self::Medium => (251, 191, 36),
            Self::Low => (16, 185, 129),
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw classifier output for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 = at risk
    pub label: u8,
    /// Positive-class probability in [0, 1]
    pub probability: f64,
}

impl Prediction {
    #[must_use]
    pub fn probability_percent(&self) -> f64 {
        self.probability * 100.0
    }

    #[must_use]
    pub fn category(&self) -> RiskCategory {
        RiskCategory::classify(self.probability_percent())
    }

    /// Accept/reject message for a single patient.
    #[must_use]
    pub fn message(&self) -> String {
        if self.label == 1 {
            format!("Cardiac risk DETECTED! Probability: {:.2}%", self.probability_percent())
        } else {
            format!("No cardiac risk detected. Probability: {:.2}%", self.probability_percent())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: PatientRecord,
    pub label: u8,
    pub probability: f64,
    pub category: RiskCategory,
}

impl ScoredRecord {
    pub fn new(record: PatientRecord, prediction: Prediction) -> Self {
        Self {
            record,
            label: prediction.label,
            probability: prediction.probability,
            category: prediction.category(),
        }
    }

    #[must_use]
    pub fn probability_percent(&self) -> f64 {
        self.probability * 100.0
    }
}

/// Read-only scoring state built once at startup: the fitted scaler, the
/// loaded classifier and the reference dataset they were evaluated on.
pub struct RiskContext {
    scaler: ScalingModel,
    model: Box<dyn RiskModel>,
    reference: ReferenceDataset,
    roc: OnceLock<RocCurve>,
}

impl RiskContext {
    pub fn new(model: Box<dyn RiskModel>, reference: ReferenceDataset) -> RiskResult<Self> {
        let scaler = ScalingModel::fit(&reference.records)?;
        debug!("Scaler means: {:?}", scaler.means());
        debug!("Scaler stds: {:?}", scaler.stds());
        Ok(Self {
            scaler,
            model,
            reference,
            roc: OnceLock::new(),
        })
    }

    /// Load the model artifact and reference dataset named in the config.
    pub fn initialize(config: &Config) -> RiskResult<Self> {
        info!("Initializing scoring context...");
        let model = model::load_model(&config.model_path)?;
        let reference = dataset::read_reference_file(&config.reference_path)?;
        let context = Self::new(model, reference)?;
        info!(
            "Scoring context ready: model {} fitted on {} reference patients",
            context.model.version(),
            context.reference.len()
        );
        Ok(context)
    }

    pub fn model(&self) -> &dyn RiskModel {
        self.model.as_ref()
    }

    pub fn reference(&self) -> &ReferenceDataset {
        &self.reference
    }

    /// Score one normalized record. `row` is only used in the error.
    pub fn predict(&self, features: &NormalizedRecord, row: usize) -> RiskResult<Prediction> {
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(RiskError::Inference {
                row,
                reason: format!(
                    "scaled feature `{}` is not finite",
                    self.scaler.feature_names()[index]
                ),
            });
        }

        let probability = self.model.predict_proba(features);
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(RiskError::Inference {
                row,
                reason: format!("model returned invalid probability {}", probability),
            });
        }

        Ok(Prediction {
            label: self.model.predict_label(probability),
            probability,
        })
    }

    pub fn predict_one(&self, record: &PatientRecord) -> RiskResult<Prediction> {
        let features = self.scaler.transform_one(record)?;
        self.predict(&features, 1)
    }

    /// Predictions in input order. Aborts on the first row that fails.
    pub fn predict_batch(&self, records: &[PatientRecord]) -> RiskResult<Vec<Prediction>> {
        let normalized = self.scaler.transform(records)?;
        normalized
            .iter()
            .enumerate()
            .map(|(index, features)| self.predict(features, index + 1))
            .collect()
    }

    pub fn score_batch(&self, records: &[PatientRecord]) -> RiskResult<Vec<ScoredRecord>> {
        if records.is_empty() {
            return Err(RiskError::EmptyBatch);
        }

        let predictions = self.predict_batch(records)?;
        let scored: Vec<ScoredRecord> = records
            .iter()
            .cloned()
            .zip(predictions)
            .map(|(record, prediction)| ScoredRecord::new(record, prediction))
            .collect();

        debug!("Scored batch of {} records", scored.len());
        Ok(scored)
    }

    /// ROC curve of the model on the reference dataset, computed on first use.
    pub fn roc_curve(&self) -> RiskResult<&RocCurve> {
        if let Some(curve) = self.roc.get() {
            return Ok(curve);
        }
        let curve = roc::roc_curve(self, &self.reference)?;
        info!("Reference ROC AUC for model {}: {:.4}", self.model.version(), curve.auc);
        Ok(self.roc.get_or_init(|| curve))
    }
}
