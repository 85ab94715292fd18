//! Seam for productivity models.
//!
//! Only a baseline ships: it predicts the historical mean productivity for
//! every field. Disease diagnosis from imagery has no model yet.

#[cfg(feature = "csv")]
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::commons::basic_functions::mean;

#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("no historical productivity to learn from")]
    EmptyHistory,
}

/// One field observation, as found in the historical CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Soil moisture, percent
    pub soil_moisture: f64,
    /// Mean air temperature, degrees Celsius
    pub temperature: f64,
    pub ndvi_mean: f64,
    /// Bags per hectare; absent for fields to predict
    #[serde(default)]
    pub productivity: Option<f64>,
}

pub trait YieldPredictor {
    /// One prediction per record, in order. No records yields no predictions.
    fn predict(&self, records: &[FieldRecord]) -> Result<Vec<f64>, PredictionError>;
}

/// Predicts the mean productivity of the history for every field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalMeanPredictor {
    mean: f64,
}

impl HistoricalMeanPredictor {
    pub fn fit(history: &[FieldRecord]) -> Result<Self, PredictionError> {
        let known: Vec<f64> = history
            .iter()
            .filter_map(|r| r.productivity)
            .filter(|p| p.is_finite())
            .collect();
        let mean = mean(&known).ok_or(PredictionError::EmptyHistory)?;
        debug!(samples = known.len(), mean, "Baseline fitted");
        Ok(HistoricalMeanPredictor { mean })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }
}

impl YieldPredictor for HistoricalMeanPredictor {
    fn predict(&self, records: &[FieldRecord]) -> Result<Vec<f64>, PredictionError> {
        Ok(vec![self.mean; records.len()])
    }
}

/// Disease diagnosis from a leaf or canopy image
pub fn diagnose_disease(image: &Path) -> Result<String, PredictionError> {
    warn!(image = %image.display(), "Disease diagnosis requested but no model is available");
    Err(PredictionError::NotImplemented("disease diagnosis"))
}

/// Read field records from a comma separated file with a header row
#[cfg(feature = "csv")]
pub fn load_field_records(path: &Path) -> anyhow::Result<Vec<FieldRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: FieldRecord = result.context("Failed to deserialize field record")?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(productivity: Option<f64>) -> FieldRecord {
        FieldRecord {
            soil_moisture: 28.0,
            temperature: 24.5,
            ndvi_mean: 0.71,
            productivity,
        }
    }

    #[test]
    fn test_baseline_predicts_history_mean() {
        let history = [record(Some(90.0)), record(Some(110.0)), record(None)];
        let predictor = HistoricalMeanPredictor::fit(&history).unwrap();
        assert_relative_eq!(predictor.mean(), 100.0);
        let predictions = predictor.predict(&[record(None), record(None)]).unwrap();
        assert_eq!(predictions, vec![100.0, 100.0]);
    }

    #[test]
    fn test_empty_input() {
        let predictor = HistoricalMeanPredictor::fit(&[record(Some(80.0))]).unwrap();
        assert!(predictor.predict(&[]).unwrap().is_empty());
        assert_eq!(
            HistoricalMeanPredictor::fit(&[record(None)]),
            Err(PredictionError::EmptyHistory)
        );
    }

    #[test]
    fn test_disease_diagnosis_not_implemented() {
        let err = diagnose_disease(Path::new("leaf.jpg")).unwrap_err();
        assert_eq!(err, PredictionError::NotImplemented("disease diagnosis"));
    }

    #[cfg(feature = "csv")]
    #[test]
    fn test_load_field_records() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "soil_moisture,temperature,ndvi_mean,productivity").unwrap();
        writeln!(file, "27.5, 23.1, 0.68, 95").unwrap();
        writeln!(file, "33.0, 25.4, 0.74,").unwrap();
        let records = load_field_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].productivity, Some(95.0));
        assert_eq!(records[1].productivity, None);
        assert_relative_eq!(records[1].ndvi_mean, 0.74);
    }
}
