use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use log::{debug, info};

use crate::error::{RiskError, RiskResult};
use crate::features::{feature_names, PatientRecord, FEATURE_COUNT, FEATURE_NAMES, TARGET_COLUMN};

/// Labeled dataset used to fit the scaler and evaluate the ROC curve.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    pub records: Vec<PatientRecord>,
    pub targets: Vec<u8>,
}

impl ReferenceDataset {
    pub fn new(records: Vec<PatientRecord>, targets: Vec<u8>) -> RiskResult<Self> {
        if records.len() != targets.len() {
            return Err(RiskError::Validation(format!(
                "reference dataset has {} records but {} targets",
                records.len(),
                targets.len()
            )));
        }
        if let Some(bad) = targets.iter().find(|t| **t > 1) {
            return Err(RiskError::Validation(format!(
                "{} must be 0 or 1, got {}",
                TARGET_COLUMN, bad
            )));
        }
        Ok(Self { records, targets })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.targets.iter().filter(|t| **t == 1).count()
    }
}

pub fn read_batch_file<P: AsRef<Path>>(path: P) -> RiskResult<Vec<PatientRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let records = read_batch(file)?;
    info!("Loaded {} patient records from {:?}", records.len(), path);
    Ok(records)
}

/// Read a batch file with exactly the 13 feature columns, in model order.
pub fn read_batch<R: Read>(reader: R) -> RiskResult<Vec<PatientRecord>> {
    let mut reader = csv_reader(reader);
    let columns = check_header(reader.headers()?, &FEATURE_NAMES)?;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row_number = index + 1;
        let row = row?;
        records.push(parse_record(&row, &columns, row_number)?);
    }

    debug!("Parsed batch of {} rows", records.len());
    Ok(records)
}

pub fn read_reference_file<P: AsRef<Path>>(path: P) -> RiskResult<ReferenceDataset> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let dataset = read_reference(file)?;
    if dataset.is_empty() {
        return Err(RiskError::Validation(format!(
            "reference dataset {:?} has no rows",
            path
        )));
    }
    info!(
        "Loaded reference dataset from {:?}: {} patients, {} positive",
        path,
        dataset.len(),
        dataset.positives()
    );
    Ok(dataset)
}

/// Read the reference dataset: the 13 feature columns plus `target`.
pub fn read_reference<R: Read>(reader: R) -> RiskResult<ReferenceDataset> {
    let mut expected: Vec<&str> = FEATURE_NAMES.to_vec();
    expected.push(TARGET_COLUMN);

    let mut reader = csv_reader(reader);
    let columns = check_header(reader.headers()?, &expected)?;
    let target_index = columns[TARGET_COLUMN];

    let mut records = Vec::new();
    let mut targets = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row_number = index + 1;
        let row = row?;
        let record = parse_record(&row, &columns, row_number)?;
        let target = parse_field(&row, target_index, TARGET_COLUMN, row_number)?;
        let target = match target {
            t if t == 0.0 => 0,
            t if t == 1.0 => 1,
            other => {
                return Err(RiskError::InvalidRecord {
                    row: row_number,
                    reason: format!("{} must be 0 or 1, got {}", TARGET_COLUMN, other),
                })
            }
        };
        records.push(record);
        targets.push(target);
    }

    ReferenceDataset::new(records, targets)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Match the header against the expected columns and map each name to its position.
///
/// Feature columns must appear in model order; `target` may sit anywhere.
fn check_header(
    headers: &csv::StringRecord,
    expected: &[&str],
) -> RiskResult<HashMap<String, usize>> {
    let mut columns = HashMap::new();
    let mut unexpected = Vec::new();

    for (index, name) in headers.iter().enumerate() {
        if expected.contains(&name) && !columns.contains_key(name) {
            columns.insert(name.to_string(), index);
        } else {
            unexpected.push(name.to_string());
        }
    }

    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !columns.contains_key(**name))
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(RiskError::Schema { missing, unexpected });
    }

    // Feature columns must also follow model order.
    let found: Vec<String> = headers
        .iter()
        .filter(|name| FEATURE_NAMES.contains(name))
        .map(|name| name.to_string())
        .collect();
    if found.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b) {
        return Err(RiskError::DimensionMismatch {
            expected: feature_names(),
            found,
        });
    }

    Ok(columns)
}

fn parse_record(
    row: &csv::StringRecord,
    columns: &HashMap<String, usize>,
    row_number: usize,
) -> RiskResult<PatientRecord> {
    let mut values = Vec::with_capacity(FEATURE_COUNT);
    for name in FEATURE_NAMES {
        values.push(parse_field(row, columns[name], name, row_number)?);
    }

    let record = PatientRecord::from_vec(&values)?;
    record.validate().map_err(|e| RiskError::InvalidRecord {
        row: row_number,
        reason: match e {
            RiskError::Validation(reason) => reason,
            other => other.to_string(),
        },
    })?;
    Ok(record)
}

fn parse_field(
    row: &csv::StringRecord,
    index: usize,
    name: &str,
    row_number: usize,
) -> RiskResult<f64> {
    let raw = row.get(index).ok_or_else(|| RiskError::InvalidRecord {
        row: row_number,
        reason: format!("column `{}` has no value", name),
    })?;
    raw.parse::<f64>().map_err(|_| RiskError::InvalidRecord {
        row: row_number,
        reason: format!("column `{}` expected a number, got `{}`", name, raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{reference_csv, reference_dataset};

    const HEADER: &str = "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal";

    #[test]
    fn test_read_batch() {
        let data = format!(
            "{}\n63,1,3,145,233,1,0,150,0,2.3,0,0,1\n37,1,2,130,250,0,1,187,0,3.5,0,0,2\n",
            HEADER
        );
        let records = read_batch(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chol, 233.0);
        assert_eq!(records[1].oldpeak, 3.5);
    }

    #[test]
    fn test_read_batch_rejects_reordered_columns() {
        let data = "thal,ca,slope,oldpeak,exang,thalach,restecg,fbs,chol,trestbps,cp,sex,age\n\
                    1,0,0,2.3,0,150,0,1,233,145,3,1,63\n";
        match read_batch(data.as_bytes()) {
            Err(RiskError::DimensionMismatch { expected, found }) => {
                assert_eq!(expected, feature_names());
                assert_eq!(found.first().map(String::as_str), Some("thal"));
                assert_eq!(found.last().map(String::as_str), Some("age"));
            }
            other => panic!("expected dimension mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_read_reference_rejects_swapped_features() {
        let data = "sex,age,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,target\n\
                    1,63,3,145,233,1,0,150,0,2.3,0,0,1,1\n";
        assert!(matches!(
            read_reference(data.as_bytes()),
            Err(RiskError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_target_column_position_is_free() {
        let data = format!("target,{}\n1,63,1,3,145,233,1,0,150,0,2.3,0,0,1\n", HEADER);
        let dataset = read_reference(data.as_bytes()).unwrap();
        assert_eq!(dataset.targets, vec![1]);
        assert_eq!(dataset.records[0].age, 63.0);
    }

    #[test]
    fn test_missing_column_is_named() {
        let data = "age,sex,cp,trestbps,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal\n\
                    63,1,3,145,1,0,150,0,2.3,0,0,1\n";
        match read_batch(data.as_bytes()) {
            Err(RiskError::Schema { missing, unexpected }) => {
                assert_eq!(missing, vec!["chol".to_string()]);
                assert!(unexpected.is_empty());
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_column_is_rejected() {
        let data = format!("{},target\n63,1,3,145,233,1,0,150,0,2.3,0,0,1,1\n", HEADER);
        let err = read_batch(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unexpected column `target`"));
    }

    #[test]
    fn test_non_numeric_value_names_row_and_column() {
        let data = format!("{}\n63,1,3,145,high,1,0,150,0,2.3,0,0,1\n", HEADER);
        match read_batch(data.as_bytes()) {
            Err(RiskError::InvalidRecord { row, reason }) => {
                assert_eq!(row, 1);
                assert!(reason.contains("`chol`"));
            }
            other => panic!("expected invalid record, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_batch_is_empty() {
        let records = read_batch(format!("{}\n", HEADER).as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_read_reference() {
        let data = format!(
            "{},target\n63,1,3,145,233,1,0,150,0,2.3,0,0,1,1\n67,1,0,160,286,0,0,108,1,1.5,1,3,2,0\n",
            HEADER
        );
        let dataset = read_reference(data.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.targets, vec![1, 0]);
        assert_eq!(dataset.positives(), 1);
    }

    #[test]
    fn test_read_reference_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heart.csv");
        std::fs::write(&path, reference_csv(120, 5)).unwrap();

        let dataset = read_reference_file(&path).unwrap();
        let expected = reference_dataset(120, 5);
        assert_eq!(dataset.records, expected.records);
        assert_eq!(dataset.targets, expected.targets);

        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, format!("{},target\n", HEADER)).unwrap();
        assert!(matches!(read_reference_file(&empty), Err(RiskError::Validation(_))));
    }

    #[test]
    fn test_reference_rejects_non_binary_target() {
        let data = format!("{},target\n63,1,3,145,233,1,0,150,0,2.3,0,0,1,2\n", HEADER);
        assert!(matches!(
            read_reference(data.as_bytes()),
            Err(RiskError::InvalidRecord { row: 1, .. })
        ));
    }
}
