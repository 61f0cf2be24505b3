//! Dataset download and cleaning.
//!
//! Fetches the raw Cleveland heart-disease data (headerless CSV, 13
//! feature columns plus a 0-4 severity score), drops rows with missing
//! (`?`) fields, binarizes the severity into the 0/1 target, and writes
//! the cleaned CSV honouring the dataset contract: schema header, no
//! missing values, binary target.

use cardio_core::{
    column_index, CardioError, DownloadConfig, Result, FEATURE_COLUMNS, FEATURE_COUNT,
    TARGET_COLUMN,
};
use std::path::Path;
use tracing::info;

/// One cleaned row: 13 feature values plus the binarized target.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    /// Feature values in schema order.
    pub features: [f64; FEATURE_COUNT],
    /// Binary target.
    pub target: u8,
}

/// Fetch, clean, and write the dataset.
pub async fn run(config: &DownloadConfig, output_path: &Path) -> Result<()> {
    info!(url = %config.source_url, "Downloading raw dataset");

    let response = reqwest::get(&config.source_url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| CardioError::Dataset(format!("download failed: {e}")))?;
    let raw = response
        .text()
        .await
        .map_err(|e| CardioError::Dataset(format!("failed to read download body: {e}")))?;

    let (rows, dropped) = clean_raw_records(&raw)?;
    write_clean_csv(&rows, output_path)?;

    info!(
        rows = rows.len(),
        dropped,
        path = %output_path.display(),
        "Wrote cleaned dataset"
    );
    Ok(())
}

/// Parse the raw headerless CSV, dropping incomplete rows and binarizing
/// the severity score.
///
/// Returns the cleaned rows and the number of dropped rows.
pub fn clean_raw_records(raw: &str) -> Result<(Vec<CleanRow>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(raw.as_bytes());

    let mut rows = Vec::new();
    let mut dropped = 0_usize;
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| CardioError::Dataset(format!("failed to parse raw line {line}: {e}")))?;
        if record.len() != FEATURE_COUNT + 1 {
            return Err(CardioError::Dataset(format!(
                "raw line {line} has {} fields, expected {}",
                record.len(),
                FEATURE_COUNT + 1
            )));
        }

        // The UCI file marks missing values with '?'.
        if record.iter().any(|field| field.trim() == "?") {
            dropped += 1;
            continue;
        }

        let mut features = [0.0; FEATURE_COUNT];
        for (col, slot) in features.iter_mut().enumerate() {
            *slot = record[col].trim().parse().map_err(|_| {
                CardioError::Dataset(format!(
                    "raw line {line}, column {col}: '{}' is not a number",
                    &record[col]
                ))
            })?;
        }

        let severity: f64 = record[FEATURE_COUNT].trim().parse().map_err(|_| {
            CardioError::Dataset(format!(
                "raw line {line}: severity '{}' is not a number",
                &record[FEATURE_COUNT]
            ))
        })?;

        rows.push(CleanRow {
            features,
            target: u8::from(severity > 0.0),
        });
    }

    if rows.is_empty() {
        return Err(CardioError::Dataset(
            "raw dataset contained no complete rows".to_string(),
        ));
    }

    Ok((rows, dropped))
}

/// Write cleaned rows under the schema header.
pub fn write_clean_csv(rows: &[CleanRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CardioError::Dataset(format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| CardioError::Dataset(format!("failed to create {}: {e}", path.display())))?;

    let header: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(TARGET_COLUMN))
        .collect();
    writer
        .write_record(&header)
        .map_err(|e| CardioError::Dataset(format!("failed to write header: {e}")))?;

    let oldpeak = column_index("oldpeak").unwrap_or(9);
    for row in rows {
        let mut fields: Vec<String> = Vec::with_capacity(FEATURE_COUNT + 1);
        for (col, &value) in row.features.iter().enumerate() {
            fields.push(format_value(value, col == oldpeak));
        }
        fields.push(row.target.to_string());
        writer
            .write_record(&fields)
            .map_err(|e| CardioError::Dataset(format!("failed to write row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| CardioError::Dataset(format!("failed to flush {}: {e}", path.display())))?;
    Ok(())
}

/// Integer-typed columns are written without a fractional part; `oldpeak`
/// keeps its decimal form.
fn format_value(value: f64, is_oldpeak: bool) -> String {
    if !is_oldpeak && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
