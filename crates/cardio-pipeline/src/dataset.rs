//! Cleaned-dataset loading.
//!
//! The cleaned CSV must contain exactly the 13 feature columns of the
//! shared schema plus the binary `target` column, in that order, with no
//! missing values. The header is validated against the schema before any
//! row is parsed, so a column-order drift fails loudly instead of
//! silently feeding the model misaligned features.

use cardio_core::{CardioError, Result, FEATURE_COLUMNS, FEATURE_COUNT, TARGET_COLUMN};
use ndarray::Array2;
use std::path::Path;

/// A loaded training dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature matrix, columns ordered as [`FEATURE_COLUMNS`].
    pub features: Array2<f64>,
    /// Binary labels.
    pub labels: Vec<u8>,
}

impl Dataset {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Load and validate the cleaned training CSV.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| CardioError::Dataset(format!("failed to open {}: {e}", path.display())))?;

    validate_header(
        reader
            .headers()
            .map_err(|e| CardioError::Dataset(format!("failed to read header: {e}")))?,
    )?;

    let mut flat: Vec<f64> = Vec::new();
    let mut labels: Vec<u8> = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| CardioError::Dataset(format!("failed to read row {row}: {e}")))?;
        if record.len() != FEATURE_COUNT + 1 {
            return Err(CardioError::Dataset(format!(
                "row {row} has {} fields, expected {}",
                record.len(),
                FEATURE_COUNT + 1
            )));
        }

        for (col, name) in FEATURE_COLUMNS.iter().enumerate() {
            let value = parse_value(&record[col], name, row)?;
            flat.push(value);
        }

        let target = parse_value(&record[FEATURE_COUNT], TARGET_COLUMN, row)?;
        labels.push(match target {
            t if t == 0.0 => 0,
            t if t == 1.0 => 1,
            other => {
                return Err(CardioError::Dataset(format!(
                    "row {row}: target must be 0 or 1, got {other}"
                )))
            }
        });
    }

    if labels.is_empty() {
        return Err(CardioError::Dataset(format!(
            "{} contains no data rows",
            path.display()
        )));
    }

    let features = Array2::from_shape_vec((labels.len(), FEATURE_COUNT), flat)
        .map_err(|e| CardioError::Dataset(format!("failed to shape feature matrix: {e}")))?;

    Ok(Dataset { features, labels })
}

/// Check the header row against the shared schema.
fn validate_header(header: &csv::StringRecord) -> Result<()> {
    let expected: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(TARGET_COLUMN))
        .collect();
    let found: Vec<&str> = header.iter().collect();
    if found != expected {
        return Err(CardioError::Dataset(format!(
            "header {found:?} does not match the expected schema {expected:?}"
        )));
    }
    Ok(())
}

/// Parse one CSV field as a finite number.
fn parse_value(raw: &str, column: &str, row: usize) -> Result<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        CardioError::Dataset(format!(
            "row {row}, column '{column}': '{raw}' is not a number"
        ))
    })?;
    if !value.is_finite() {
        return Err(CardioError::Dataset(format!(
            "row {row}, column '{column}': non-finite value"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardio_core::FeatureRecord;
    use std::io::Write;

    const HEADER: &str = "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,target";

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_a_valid_csv() {
        let f = write_csv(&format!(
            "{HEADER}\n55,1,2,130,250,0,1,150,0,1.5,1,0,2,1\n60,0,1,140,230,0,0,120,1,2.5,2,1,3,0\n"
        ));
        let dataset = load_dataset(f.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.features[[0, 0]], 55.0);
        assert_eq!(dataset.labels, vec![1, 0]);
    }

    #[test]
    fn feature_row_matches_a_record_built_from_the_same_values() {
        // The row loaded from the CSV and the row built by the inference
        // path from the same values must be identical in content and
        // order.
        let f = write_csv(&format!(
            "{HEADER}\n55,1,2,130,250,0,1,150,0,1.5,1,0,2,1\n"
        ));
        let dataset = load_dataset(f.path()).unwrap();

        let record = FeatureRecord {
            age: 55,
            sex: 1,
            cp: 2,
            trestbps: 130,
            chol: 250,
            fbs: 0,
            restecg: 1,
            thalach: 150,
            exang: 0,
            oldpeak: 1.5,
            slope: 1,
            ca: 0,
            thal: 2,
        };
        let row = record.to_row();
        for (j, &value) in row.iter().enumerate() {
            assert_eq!(dataset.features[[0, j]], value, "column {j}");
        }
    }

    #[test]
    fn rejects_reordered_header() {
        let f = write_csv(
            "sex,age,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,target\n\
             1,55,2,130,250,0,1,150,0,1.5,1,0,2,1\n",
        );
        assert!(load_dataset(f.path()).is_err());
    }

    #[test]
    fn rejects_missing_values() {
        let f = write_csv(&format!(
            "{HEADER}\n55,1,2,130,,0,1,150,0,1.5,1,0,2,1\n"
        ));
        let err = load_dataset(f.path()).unwrap_err();
        assert!(err.to_string().contains("chol"), "{err}");
    }

    #[test]
    fn rejects_non_numeric_values() {
        let f = write_csv(&format!(
            "{HEADER}\n55,1,2,130,abc,0,1,150,0,1.5,1,0,2,1\n"
        ));
        assert!(load_dataset(f.path()).is_err());
    }

    #[test]
    fn rejects_out_of_range_target() {
        let f = write_csv(&format!(
            "{HEADER}\n55,1,2,130,250,0,1,150,0,1.5,1,0,2,3\n"
        ));
        assert!(load_dataset(f.path()).is_err());
    }

    #[test]
    fn rejects_empty_file() {
        let f = write_csv(&format!("{HEADER}\n"));
        assert!(load_dataset(f.path()).is_err());
    }
}
