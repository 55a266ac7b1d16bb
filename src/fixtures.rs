use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::dataset::ReferenceDataset;
use crate::features::{feature_index, feature_names, PatientRecord, FEATURE_COUNT, FEATURE_NAMES};
use crate::model::{self, ModelArtifact, ModelKind};
use crate::scoring::RiskContext;

/// Generating weights on roughly standardized features: (feature, mean, sd, weight).
const SIGNAL: [(&str, f64, f64, f64); 6] = [
    ("cp", 1.5, 1.118, 0.9),
    ("thalach", 150.0, 23.0, 0.8),
    ("exang", 0.33, 0.47, -0.9),
    ("oldpeak", 1.05, 1.0, -0.7),
    ("ca", 2.0, 1.414, -0.6),
    ("sex", 0.68, 0.466, -0.5),
];

pub fn sample_record() -> PatientRecord {
    PatientRecord {
        age: 63.0,
        sex: 1.0,
        cp: 3.0,
        trestbps: 145.0,
        chol: 233.0,
        fbs: 1.0,
        restecg: 0.0,
        thalach: 150.0,
        exang: 0.0,
        oldpeak: 2.3,
        slope: 0.0,
        ca: 0.0,
        thal: 1.0,
    }
}

fn normal(rng: &mut StdRng, mean: f64, sd: f64, low: f64, high: f64) -> f64 {
    let dist = Normal::new(mean, sd).expect("valid normal");
    dist.sample(rng).clamp(low, high)
}

fn random_record(rng: &mut StdRng) -> PatientRecord {
    PatientRecord {
        age: normal(rng, 54.0, 9.0, 29.0, 77.0).round(),
        sex: rng.gen_bool(0.68) as u8 as f64,
        cp: rng.gen_range(0..4) as f64,
        trestbps: normal(rng, 131.0, 17.0, 94.0, 200.0).round(),
        chol: normal(rng, 246.0, 51.0, 126.0, 564.0).round(),
        fbs: rng.gen_bool(0.15) as u8 as f64,
        restecg: rng.gen_range(0..3) as f64,
        thalach: normal(rng, 150.0, 23.0, 71.0, 202.0).round(),
        exang: rng.gen_bool(0.33) as u8 as f64,
        oldpeak: (normal(rng, 1.0, 1.1, 0.0, 6.2) * 10.0).round() / 10.0,
        slope: rng.gen_range(0..3) as f64,
        ca: rng.gen_range(0..5) as f64,
        thal: rng.gen_range(0..4) as f64,
    }
}

fn latent_score(record: &PatientRecord) -> f64 {
    let values = record.to_array();
    SIGNAL
        .iter()
        .map(|(name, mean, sd, weight)| {
            let index = feature_index(name).expect("known feature");
            weight * (values[index] - mean) / sd
        })
        .sum()
}

/// Labeled synthetic cohort whose labels follow the fixture model's signal.
pub fn reference_dataset(n: usize, seed: u64) -> ReferenceDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    for _ in 0..n {
        let record = random_record(&mut rng);
        let p = 1.0 / (1.0 + (-latent_score(&record)).exp());
        targets.push(rng.gen_bool(p) as u8);
        records.push(record);
    }
    ReferenceDataset::new(records, targets).expect("consistent fixture")
}

/// The reference dataset as CSV text, header included.
pub fn reference_csv(n: usize, seed: u64) -> String {
    let dataset = reference_dataset(n, seed);
    let mut out = format!("{},target\n", FEATURE_NAMES.join(","));
    for (record, target) in dataset.records.iter().zip(&dataset.targets) {
        let values: Vec<String> = record.to_array().iter().map(|v| v.to_string()).collect();
        out.push_str(&format!("{},{}\n", values.join(","), target));
    }
    out
}

/// Batch CSV text (no target column).
pub fn batch_csv(n: usize, seed: u64) -> String {
    let dataset = reference_dataset(n, seed);
    let mut out = format!("{}\n", FEATURE_NAMES.join(","));
    for record in &dataset.records {
        let values: Vec<String> = record.to_array().iter().map(|v| v.to_string()).collect();
        out.push_str(&format!("{}\n", values.join(",")));
    }
    out
}

pub fn model_artifact() -> ModelArtifact {
    let mut coefficients = vec![0.0; FEATURE_COUNT];
    for (name, _, _, weight) in SIGNAL {
        coefficients[feature_index(name).expect("known feature")] = weight;
    }
    ModelArtifact {
        version: "test-1".to_string(),
        kind: ModelKind::Logistic,
        feature_names: feature_names(),
        coefficients,
        intercept: 0.0,
        decision_threshold: 0.5,
        calibration: None,
    }
}

pub fn context(n: usize, seed: u64) -> RiskContext {
    let model = model::create_model(model_artifact()).expect("valid artifact");
    RiskContext::new(model, reference_dataset(n, seed)).expect("context")
}
