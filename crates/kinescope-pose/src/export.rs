//! JSON export of processing results.

use std::path::Path;

use tracing::info;

use kinescope_models::ProcessingResult;

use crate::error::PoseResult;

/// Writes and reads processing results as JSON.
///
/// Layout: `{ "joints": { "<name>": { "name", "frames", "color", "units" } },
/// "processingComplete", "progress" }`. Alias joints are written out in full
/// under their own key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultExporter {
    pretty: bool,
}

impl ResultExporter {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn to_json(&self, result: &ProcessingResult) -> PoseResult<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(result)?
        } else {
            serde_json::to_string(result)?
        };
        Ok(json)
    }

    pub fn from_json(json: &str) -> PoseResult<ProcessingResult> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write `result` to `path`, replacing any existing file.
    pub async fn write_to_file(&self, result: &ProcessingResult, path: impl AsRef<Path>) -> PoseResult<()> {
        let path = path.as_ref();
        let json = self.to_json(result)?;
        tokio::fs::write(path, json.as_bytes()).await?;

        info!(
            path = %path.display(),
            bytes = json.len(),
            joints = result.joints.len(),
            "Exported processing result"
        );
        Ok(())
    }
}
