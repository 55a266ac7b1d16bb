use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::features::{feature_names, PatientRecord, FEATURE_COUNT, FEATURE_NAMES};

/// Scaled feature vector in model order.
pub type NormalizedRecord = [f64; FEATURE_COUNT];

/// Per-feature mean and standard deviation. Immutable once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingModel {
    feature_names: Vec<String>,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl ScalingModel {
    /// Fit on the feature columns of the reference records.
    ///
    /// Uses the population standard deviation. A zero-variance column gets
    /// a scale of 1, so it maps to `value - mean` instead of NaN or infinity.
    pub fn fit(records: &[PatientRecord]) -> RiskResult<Self> {
        if records.is_empty() {
            return Err(RiskError::EmptyBatch);
        }

        let n = records.len() as f64;
        let rows: Vec<[f64; FEATURE_COUNT]> = records.iter().map(PatientRecord::to_array).collect();

        let mut means = vec![0.0; FEATURE_COUNT];
        for row in &rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut stds = vec![0.0; FEATURE_COUNT];
        for row in &rows {
            for ((acc, value), mean) in stds.iter_mut().zip(row).zip(&means) {
                *acc += (value - mean).powi(2);
            }
        }
        for (index, std) in stds.iter_mut().enumerate() {
            *std = (*std / n).sqrt();
            if *std == 0.0 {
                warn!(
                    "Feature {} has zero variance in the reference dataset; using unit scale",
                    FEATURE_NAMES[index]
                );
                *std = 1.0;
            }
        }

        debug!("Fitted scaler on {} reference records", records.len());

        Ok(Self {
            feature_names: feature_names(),
            means,
            stds,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Scale a batch of records. The fitted schema must match the record schema exactly.
    pub fn transform(&self, records: &[PatientRecord]) -> RiskResult<Vec<NormalizedRecord>> {
        self.check_schema(&FEATURE_NAMES)?;
        Ok(records.iter().map(|r| self.scale(&r.to_array())).collect())
    }

    pub fn transform_one(&self, record: &PatientRecord) -> RiskResult<NormalizedRecord> {
        self.check_schema(&FEATURE_NAMES)?;
        Ok(self.scale(&record.to_array()))
    }

    fn check_schema(&self, names: &[&str]) -> RiskResult<()> {
        let matches = self.feature_names.len() == names.len()
            && self.means.len() == names.len()
            && self.stds.len() == names.len()
            && self.feature_names.iter().zip(names).all(|(a, b)| a == b);
        if matches && names.len() == FEATURE_COUNT {
            Ok(())
        } else {
            Err(RiskError::DimensionMismatch {
                expected: self.feature_names.clone(),
                found: names.iter().map(|n| n.to_string()).collect(),
            })
        }
    }

    fn scale(&self, row: &[f64; FEATURE_COUNT]) -> NormalizedRecord {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, value) in row.iter().enumerate() {
            out[i] = (value - self.means[i]) / self.stds[i];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{reference_dataset, sample_record};
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_centers_and_scales() {
        let dataset = reference_dataset(300, 7);
        let scaler = ScalingModel::fit(&dataset.records).unwrap();
        let scaled = scaler.transform(&dataset.records).unwrap();

        for feature in 0..FEATURE_COUNT {
            let column: Vec<f64> = scaled.iter().map(|r| r[feature]).collect();
            let mean = column.iter().sum::<f64>() / column.len() as f64;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
            assert_relative_eq!(var, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_population_std() {
        let mut a = sample_record();
        let mut b = sample_record();
        a.age = 40.0;
        b.age = 60.0;
        let scaler = ScalingModel::fit(&[a.clone(), b]).unwrap();
        assert_relative_eq!(scaler.means()[0], 50.0);
        assert_relative_eq!(scaler.stds()[0], 10.0);

        let scaled = scaler.transform_one(&a).unwrap();
        assert_relative_eq!(scaled[0], -1.0);
    }

    #[test]
    fn test_zero_variance_uses_unit_scale() {
        let records = vec![sample_record(); 5];
        let scaler = ScalingModel::fit(&records).unwrap();
        assert!(scaler.stds().iter().all(|s| *s == 1.0));

        let mut shifted = sample_record();
        shifted.chol += 10.0;
        let scaled = scaler.transform_one(&shifted).unwrap();
        assert!(scaled.iter().all(|v| v.is_finite()));
        assert_relative_eq!(scaled[4], 10.0);
    }

    #[test]
    fn test_fit_empty_fails() {
        assert!(matches!(ScalingModel::fit(&[]), Err(RiskError::EmptyBatch)));
    }

    #[test]
    fn test_persisted_scaler_with_reordered_schema_is_rejected() {
        let scaler = ScalingModel::fit(&reference_dataset(50, 1).records).unwrap();
        let mut json = serde_json::to_value(&scaler).unwrap();
        json["feature_names"].as_array_mut().unwrap().swap(0, 1);
        let reordered: ScalingModel = serde_json::from_value(json).unwrap();
        assert!(matches!(
            reordered.transform_one(&sample_record()),
            Err(RiskError::DimensionMismatch { .. })
        ));
        assert!(scaler.transform_one(&sample_record()).is_ok());
    }

    #[test]
    fn test_persisted_scaler_with_foreign_schema_is_rejected() {
        let json = serde_json::json!({
            "feature_names": ["age", "bmi"],
            "means": [50.0, 25.0],
            "stds": [10.0, 4.0],
        });
        let scaler: ScalingModel = serde_json::from_value(json).unwrap();
        let err = scaler.transform(&[sample_record()]).unwrap_err();
        assert!(matches!(err, RiskError::DimensionMismatch { .. }));
        assert!(err.to_string().contains("bmi"));
    }
}
