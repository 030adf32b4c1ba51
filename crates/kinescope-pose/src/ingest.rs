//! Import of tabular pose detection exports.
//!
//! The table has a header row naming a time column and, per landmark index
//! `i`, the columns `pose_{i}_x`, `pose_{i}_y`, `pose_{i}_z` and
//! `pose_{i}_visibility`. Ingestion is synchronous and pure: the same input
//! always yields the same result.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use kinescope_models::{BodyLandmark, FrameSample, ProcessingResult, LANDMARK_COUNT};

use crate::composite::CompositeJointDeriver;
use crate::config::IngestConfig;
use crate::error::{PoseError, PoseResult};
use crate::metrics;
use crate::store::TimeSeriesStore;
use crate::validation::{validate_coverage, ValidationReport};

/// Column positions of one landmark.
#[derive(Debug, Clone, Copy)]
struct LandmarkColumns {
    landmark: BodyLandmark,
    x: usize,
    y: usize,
    z: usize,
    visibility: usize,
}

/// Result of one ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub result: ProcessingResult,
    /// Present when a positive expected duration was supplied
    pub validation: Option<ValidationReport>,
    /// Data rows seen, excluding the header
    pub rows_total: usize,
    /// Rows dropped for having fewer fields than the header
    pub rows_skipped: usize,
    /// Landmarks lacking one of their four columns
    pub missing_landmarks: Vec<BodyLandmark>,
}

/// Parses detection tables into processing results.
#[derive(Debug, Clone, Default)]
pub struct TableIngestor {
    config: IngestConfig,
    composites: CompositeJointDeriver,
}

impl TableIngestor {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            composites: CompositeJointDeriver::default(),
        }
    }

    /// Replace the composite joints applied after ingestion.
    pub fn with_composites(mut self, composites: CompositeJointDeriver) -> Self {
        self.composites = composites;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest comma separated text.
    ///
    /// Lines are split on `\n` with a trailing `\r` removed; fields are split
    /// on `,` without quoting rules.
    pub fn ingest_str(&self, text: &str, expected_duration: Option<f64>) -> PoseResult<IngestOutcome> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PoseError::EmptyInput);
        }

        let rows = trimmed
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).split(','));

        self.ingest(rows, expected_duration)
    }

    /// Ingest a header row followed by data rows.
    pub fn ingest<I, R, F>(&self, rows: I, expected_duration: Option<f64>) -> PoseResult<IngestOutcome>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = F>,
        F: AsRef<str>,
    {
        let start = Instant::now();
        let mut rows = rows.into_iter();

        let header: Vec<String> = rows
            .next()
            .ok_or(PoseError::EmptyInput)?
            .into_iter()
            .map(|field| field.as_ref().to_string())
            .collect();

        let index = column_index(&header);
        let time_column = index.get(self.config.time_column.as_str()).copied();
        if time_column.is_none() {
            warn!(
                column = %self.config.time_column,
                "Time column missing, no samples will be accepted"
            );
        }

        let (columns, missing_landmarks) = self.locate_landmarks(&index);
        if !missing_landmarks.is_empty() {
            debug!(
                missing = missing_landmarks.len(),
                "Landmarks without a full column set will have empty series"
            );
        }

        let mut store = TimeSeriesStore::with_min_visibility(self.config.min_visibility);
        let mut rows_total = 0;
        let mut rows_skipped = 0;
        let mut fields: Vec<String> = Vec::with_capacity(header.len());

        for row in rows {
            rows_total += 1;
            fields.clear();
            fields.extend(row.into_iter().map(|field| field.as_ref().to_string()));

            if fields.len() < header.len() {
                let err = PoseError::MalformedRow {
                    row: rows_total,
                    fields: fields.len(),
                    expected: header.len(),
                };
                debug!(error = %err, "Skipping row");
                rows_skipped += 1;
                continue;
            }

            let raw_t = time_column.map_or(f64::NAN, |col| parse_field(&fields[col]));
            let t = raw_t / self.config.time_units_per_second;

            for cols in &columns {
                let sample = FrameSample::from_image_space(
                    t,
                    parse_field(&fields[cols.x]),
                    parse_field(&fields[cols.y]),
                    parse_field(&fields[cols.z]),
                    Some(parse_field(&fields[cols.visibility])),
                );
                store.append(cols.landmark, sample);
            }
        }

        if rows_skipped > 0 {
            debug!(rows_skipped, "Skipped rows shorter than the header");
        }

        let accepted = store.sample_count();
        let rejected = store.rejected();
        let mut joints = store.freeze();
        self.composites.augment(&mut joints);
        let result = ProcessingResult::completed(joints);

        let validation = expected_duration
            .filter(|expected| *expected > 0.0)
            .map(|expected| validate_coverage(&result, expected, &self.config));

        if let Some(report) = &validation {
            for warning in &report.warnings {
                warn!(warning = %warning, "Ingestion validation warning");
            }
        }

        metrics::record_ingestion(rows_total, rows_skipped, accepted, start.elapsed());

        info!(
            rows = rows_total,
            rows_skipped,
            accepted,
            rejected,
            joints = result.joints.len(),
            "Ingested pose table"
        );

        Ok(IngestOutcome {
            result,
            validation,
            rows_total,
            rows_skipped,
            missing_landmarks,
        })
    }

    fn locate_landmarks(
        &self,
        index: &HashMap<&str, usize>,
    ) -> (Vec<LandmarkColumns>, Vec<BodyLandmark>) {
        let mut found = Vec::with_capacity(LANDMARK_COUNT);
        let mut missing = Vec::new();

        for landmark in BodyLandmark::ALL {
            let lookup = |field: &str| {
                index
                    .get(self.config.landmark_column(landmark.index(), field).as_str())
                    .copied()
            };

            match (lookup("x"), lookup("y"), lookup("z"), lookup("visibility")) {
                (Some(x), Some(y), Some(z), Some(visibility)) => found.push(LandmarkColumns {
                    landmark,
                    x,
                    y,
                    z,
                    visibility,
                }),
                _ => missing.push(landmark),
            }
        }

        (found, missing)
    }
}

/// Map column name to its first position.
fn column_index(header: &[String]) -> HashMap<&str, usize> {
    let mut index = HashMap::with_capacity(header.len());
    for (position, name) in header.iter().enumerate() {
        index.entry(name.as_str()).or_insert(position);
    }
    index
}

/// Parse a numeric field; anything unparseable becomes NaN.
fn parse_field(field: &str) -> f64 {
    field.trim().parse::<f64>().unwrap_or(f64::NAN)
}
