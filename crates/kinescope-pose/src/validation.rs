//! Coverage checks of ingested data against a known media duration.

use serde::{Deserialize, Serialize};
use std::fmt;

use kinescope_models::ProcessingResult;

use crate::config::IngestConfig;

/// Advisory finding attached to an ingestion outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    NoPoseData,
    DurationMismatch { data_span: f64, expected: f64 },
    LateStart { first_t: f64 },
    EarlyEnd { last_t: f64, expected: f64 },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::NoPoseData => write!(f, "No valid pose data found"),
            ValidationWarning::DurationMismatch {
                data_span,
                expected,
            } => write!(
                f,
                "Duration mismatch: data spans {:.2}s but media is {:.2}s",
                data_span, expected
            ),
            ValidationWarning::LateStart { first_t } => {
                write!(f, "Data starts at {:.2}s, not at media start (0s)", first_t)
            }
            ValidationWarning::EarlyEnd { last_t, expected } => write!(
                f,
                "Data ends at {:.2}s but media ends at {:.2}s",
                last_t, expected
            ),
        }
    }
}

/// Result of validating a processing result against a media duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub warnings: Vec<ValidationWarning>,
    /// `max_t - min_t` of the series checked
    pub data_span: Option<f64>,
    pub expected_duration: f64,
    pub duration_mismatch: bool,
}

impl ValidationReport {
    pub fn has_warning(&self, predicate: impl Fn(&ValidationWarning) -> bool) -> bool {
        self.warnings.iter().any(predicate)
    }
}

/// Check the first populated canonical series against `expected` seconds.
pub fn validate_coverage(
    result: &ProcessingResult,
    expected: f64,
    config: &IngestConfig,
) -> ValidationReport {
    let span = result.first_populated().and_then(|series| series.time_span());

    let Some((min_t, max_t)) = span else {
        return ValidationReport {
            is_valid: false,
            warnings: vec![ValidationWarning::NoPoseData],
            data_span: None,
            expected_duration: expected,
            duration_mismatch: false,
        };
    };

    let data_span = max_t - min_t;
    let duration_mismatch = (data_span - expected).abs() > expected * config.duration_tolerance;
    let mut warnings = Vec::new();

    if duration_mismatch {
        warnings.push(ValidationWarning::DurationMismatch {
            data_span,
            expected,
        });
    }
    if min_t > config.edge_slack_secs {
        warnings.push(ValidationWarning::LateStart { first_t: min_t });
    }
    if max_t < expected - config.edge_slack_secs {
        warnings.push(ValidationWarning::EarlyEnd {
            last_t: max_t,
            expected,
        });
    }

    ValidationReport {
        is_valid: !duration_mismatch,
        warnings,
        data_span: Some(data_span),
        expected_duration: expected,
        duration_mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TimeSeriesStore;
    use kinescope_models::{BodyLandmark, FrameSample};

    fn result_spanning(times: &[f64]) -> ProcessingResult {
        let mut store = TimeSeriesStore::new();
        for t in times {
            store.append(BodyLandmark::Nose, FrameSample::new(*t, 0.5, 0.5, 0.0));
        }
        ProcessingResult::completed(store.freeze())
    }

    #[test]
    fn test_within_tolerance() {
        let report = validate_coverage(
            &result_spanning(&[0.0, 9.5]),
            10.0,
            &IngestConfig::default(),
        );
        assert!(report.is_valid);
        assert!(report.warnings.is_empty());
        assert_eq!(report.data_span, Some(9.5));
    }

    #[test]
    fn test_short_span_is_invalid() {
        let report = validate_coverage(
            &result_spanning(&[0.0, 3.5, 7.0]),
            10.0,
            &IngestConfig::default(),
        );
        assert!(!report.is_valid);
        assert!(report.duration_mismatch);
        assert!(report.has_warning(|w| matches!(w, ValidationWarning::DurationMismatch { .. })));
        assert!(report.has_warning(|w| matches!(w, ValidationWarning::EarlyEnd { .. })));
        assert!(!report.has_warning(|w| matches!(w, ValidationWarning::LateStart { .. })));
    }

    #[test]
    fn test_late_start_is_advisory() {
        let report = validate_coverage(
            &result_spanning(&[1.0, 10.0]),
            10.0,
            &IngestConfig::default(),
        );
        assert!(report.is_valid);
        assert_eq!(
            report.warnings,
            vec![ValidationWarning::LateStart { first_t: 1.0 }]
        );
    }

    #[test]
    fn test_no_pose_data() {
        let report = validate_coverage(&result_spanning(&[]), 5.0, &IngestConfig::default());
        assert!(!report.is_valid);
        assert_eq!(report.warnings, vec![ValidationWarning::NoPoseData]);
        assert_eq!(
            report.warnings[0].to_string(),
            "No valid pose data found"
        );
    }
}
