use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Schema error: {}", describe_schema(.missing, .unexpected))]
    Schema {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Feature dimension mismatch: expected [{}], found [{}]", .expected.join(", "), .found.join(", "))]
    DimensionMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Empty batch: at least one patient record is required")]
    EmptyBatch,

    #[error("Inference failed for row {row}: {reason}")]
    Inference { row: usize, reason: String },

    #[error("Invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Chart rendering error: {0}")]
    Chart(String),

    #[error("PDF rendering error: {0}")]
    Pdf(String),
}

pub type RiskResult<T> = Result<T, RiskError>;

fn describe_schema(missing: &[String], unexpected: &[String]) -> String {
    let mut parts = Vec::new();
    for name in missing {
        parts.push(format!("column `{}` missing", name));
    }
    for name in unexpected {
        parts.push(format!("unexpected column `{}`", name));
    }
    if parts.is_empty() {
        "header row does not match the expected columns".to_string()
    } else {
        parts.join("; ")
    }
}
