//! Per-landmark sample store populated during one acquisition run.

use std::sync::Arc;

use kinescope_models::{
    color_for, BodyLandmark, FrameSample, JointMap, JointSeries, DEFAULT_VISIBILITY_THRESHOLD,
};

/// Ordered samples for every canonical landmark.
///
/// Created empty at the start of a run, filled by ingestion or sampling, then
/// frozen into a [`JointMap`]. Every canonical landmark has a series from the
/// start, so frozen maps always carry all 33 keys.
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    series: Vec<JointSeries>,
    min_visibility: f64,
    rejected: usize,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::with_min_visibility(DEFAULT_VISIBILITY_THRESHOLD)
    }

    /// Create a store with a custom visibility gate.
    pub fn with_min_visibility(min_visibility: f64) -> Self {
        let series = BodyLandmark::ALL
            .iter()
            .map(|landmark| JointSeries::new(*landmark, color_for(landmark.index())))
            .collect();

        Self {
            series,
            min_visibility,
            rejected: 0,
        }
    }

    /// Append a sample if it passes the acceptance rule.
    ///
    /// Returns whether the sample was stored.
    pub fn append(&mut self, landmark: BodyLandmark, sample: FrameSample) -> bool {
        if !sample.is_acceptable(self.min_visibility) {
            self.rejected += 1;
            return false;
        }
        self.series[landmark.index()].push(sample);
        true
    }

    pub fn series(&self, landmark: BodyLandmark) -> &JointSeries {
        &self.series[landmark.index()]
    }

    /// Samples rejected by the acceptance rule so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Total stored samples.
    pub fn sample_count(&self) -> usize {
        self.series.iter().map(JointSeries::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(JointSeries::is_empty)
    }

    /// Publish the series; nothing mutates them afterwards.
    pub fn freeze(self) -> JointMap {
        self.series
            .into_iter()
            .map(|series| (series.name, Arc::new(series)))
            .collect()
    }
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new()
    }
}
