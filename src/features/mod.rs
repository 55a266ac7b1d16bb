pub mod categorical;

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
pub use categorical::{Categorical, ChestPain, Flag, RestingEcg, Sex, StSlope, Thal};

pub const FEATURE_COUNT: usize = 13;

/// Feature column names, in model order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Ground-truth column of the reference dataset.
pub const TARGET_COLUMN: &str = "target";

/// Highest number of major vessels recorded by fluoroscopy (`ca`).
pub const MAX_MAJOR_VESSELS: f64 = 4.0;

/// Accepted ranges for manually entered records.
pub const ENTRY_RANGES: [(&str, f64, f64); 6] = [
    ("age", 20.0, 100.0),
    ("trestbps", 80.0, 200.0),
    ("chol", 100.0, 600.0),
    ("thalach", 60.0, 220.0),
    ("oldpeak", 0.0, 6.0),
    ("ca", 0.0, 3.0),
];

/// One patient's raw clinical features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Age in years
    pub age: f64,
    /// 0 = female, 1 = male
    pub sex: f64,
    /// Chest pain type, 0-3
    pub cp: f64,
    /// Resting blood pressure in mmHg
    pub trestbps: f64,
    /// Serum cholesterol in mg/dl
    pub chol: f64,
    /// Fasting blood sugar > 120 mg/dl
    pub fbs: f64,
    /// Resting ECG result, 0-2
    pub restecg: f64,
    /// Maximum heart rate achieved
    pub thalach: f64,
    /// Exercise induced angina
    pub exang: f64,
    /// ST depression induced by exercise relative to rest
    pub oldpeak: f64,
    /// Slope of the peak exercise ST segment, 0-2
    pub slope: f64,
    /// Number of major vessels colored by fluoroscopy
    pub ca: f64,
    /// Thalassemia code, 0-3
    pub thal: f64,
}

impl PatientRecord {
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            self.sex,
            self.cp,
            self.trestbps,
            self.chol,
            self.fbs,
            self.restecg,
            self.thalach,
            self.exang,
            self.oldpeak,
            self.slope,
            self.ca,
            self.thal,
        ]
    }

    pub fn from_vec(v: &[f64]) -> RiskResult<Self> {
        if v.len() != FEATURE_COUNT {
            return Err(RiskError::Validation(format!(
                "Expected {} features, got {}",
                FEATURE_COUNT,
                v.len()
            )));
        }

        Ok(Self {
            age: v[0],
            sex: v[1],
            cp: v[2],
            trestbps: v[3],
            chol: v[4],
            fbs: v[5],
            restecg: v[6],
            thalach: v[7],
            exang: v[8],
            oldpeak: v[9],
            slope: v[10],
            ca: v[11],
            thal: v[12],
        })
    }

    /// Check that every feature is finite and every categorical code is in its domain.
    pub fn validate(&self) -> RiskResult<()> {
        for (name, value) in FEATURE_NAMES.iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(RiskError::Validation(format!(
                    "{} must be a finite number, got {}",
                    name, value
                )));
            }
        }

        Sex::from_value(self.sex)?;
        ChestPain::from_value(self.cp)?;
        Flag::from_value(self.fbs).map_err(|_| flag_error("fbs", self.fbs))?;
        RestingEcg::from_value(self.restecg)?;
        Flag::from_value(self.exang).map_err(|_| flag_error("exang", self.exang))?;
        StSlope::from_value(self.slope)?;
        Thal::from_value(self.thal)?;

        if self.ca.fract() != 0.0 || !(0.0..=MAX_MAJOR_VESSELS).contains(&self.ca) {
            return Err(RiskError::Validation(format!(
                "ca must be an integer in [0, {}], got {}",
                MAX_MAJOR_VESSELS, self.ca
            )));
        }

        Ok(())
    }

    /// Stricter check for a single manually entered record.
    pub fn validate_entry(&self) -> RiskResult<()> {
        self.validate()?;

        let values = self.to_array();
        let mut errors = Vec::new();
        for (name, low, high) in ENTRY_RANGES {
            let index = feature_index(name).unwrap_or(0);
            let value = values[index];
            if !(low..=high).contains(&value) {
                errors.push(format!("{} {} out of range [{}, {}]", name, value, low, high));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RiskError::Validation(errors.join("; ")))
        }
    }
}

fn flag_error(feature: &str, value: f64) -> RiskError {
    RiskError::Validation(format!("{} must be one of [0, 1], got {}", feature, value))
}

#[must_use]
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

#[must_use]
pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
}
