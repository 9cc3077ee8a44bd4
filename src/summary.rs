/// Run summary: a JSON record of the baseline and every step's deltas.
///
/// Uses atomic write pattern: write to temp file then rename.
use crate::conan::BuildVariant;
use crate::report::{CounterDelta, CounterValue};
use crate::stats::StatsSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One build step and the cache activity attributed to it.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    /// 1-based position in the build sequence.
    pub step: usize,
    #[serde(flatten)]
    pub variant: BuildVariant,
    pub deltas: Vec<CounterDelta>,
}

/// The JSON payload written by `--summary`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub package: String,
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub baseline: Vec<CounterValue>,
    pub steps: Vec<StepSummary>,
    /// Full statistics after the last step.
    pub final_stats: Option<StatsSnapshot>,
}

impl RunSummary {
    pub fn new(package: &Path) -> Self {
        Self {
            package: package.display().to_string(),
            started: Utc::now(),
            finished: None,
            baseline: Vec::new(),
            steps: Vec::new(),
            final_stats: None,
        }
    }

    pub fn record_step(&mut self, variant: BuildVariant, deltas: Vec<CounterDelta>) {
        let step = self.steps.len() + 1;
        self.steps.push(StepSummary {
            step,
            variant,
            deltas,
        });
    }

    pub fn finish(&mut self, final_stats: StatsSnapshot) {
        self.final_stats = Some(final_stats);
        self.finished = Some(Utc::now());
    }

    /// Atomically write the summary as pretty JSON to `path`.
    ///
    /// Writes to a temporary file in the same directory, then renames
    /// so readers never see a partial write.
    pub fn write(&self, path: &Path) -> Result<(), SummaryError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| SummaryError::Serialize { source: e })?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp_path = dir.join(format!(".ccache-check.summary.tmp.{}", std::process::id()));

        std::fs::write(&tmp_path, json.as_bytes()).map_err(|e| SummaryError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&tmp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            SummaryError::Rename {
                from: tmp_path.clone(),
                to: path.to_path_buf(),
                source: e,
            }
        })?;

        tracing::info!(path = %path.display(), "run summary written");
        Ok(())
    }
}

/// Errors that can occur when writing the summary file.
#[derive(Debug)]
pub enum SummaryError {
    Serialize {
        source: serde_json::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for SummaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryError::Serialize { source } => {
                write!(f, "failed to serialize run summary: {source}")
            }
            SummaryError::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
            SummaryError::Rename { from, to, source } => {
                write!(
                    f,
                    "failed to rename {} to {}: {source}",
                    from.display(),
                    to.display()
                )
            }
        }
    }
}

impl std::error::Error for SummaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SummaryError::Serialize { source } => Some(source),
            SummaryError::Write { source, .. } => Some(source),
            SummaryError::Rename { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conan::BuildType;
    use tempfile::tempdir;

    fn sample() -> RunSummary {
        let mut summary = RunSummary::new(Path::new("recipes/zlib"));
        summary.baseline = vec![CounterValue {
            label: "cache miss".to_string(),
            value: 0,
        }];
        summary.record_step(
            BuildVariant::new(BuildType::Release, true),
            vec![CounterDelta::between("cache miss", 0, 12)],
        );
        summary.record_step(
            BuildVariant::new(BuildType::Debug, false),
            vec![CounterDelta::between("cache miss", 12, 12)],
        );
        summary.finish(StatsSnapshot::parse("cache miss  12"));
        summary
    }

    #[test]
    fn test_record_step_numbers_from_one() {
        let summary = sample();
        assert_eq!(summary.steps[0].step, 1);
        assert_eq!(summary.steps[1].step, 2);
    }

    #[test]
    fn test_write_produces_valid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        sample().write(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(json["package"], "recipes/zlib");
        assert_eq!(json["baseline"][0]["value"], 0);
        assert_eq!(json["steps"].as_array().unwrap().len(), 2);
        assert_eq!(json["steps"][0]["build_type"], "Release");
        assert_eq!(json["steps"][0]["with_tests"], true);
        assert_eq!(json["steps"][0]["deltas"][0]["delta"], 12);
        assert_eq!(json["steps"][1]["deltas"][0]["delta"], 0);
        assert_eq!(json["final_stats"]["cache miss"], 12);
        assert!(json["finished"].is_string());
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        sample().write(&path).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("summary.json")]);
    }

    #[test]
    fn test_write_overwrites_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        std::fs::write(&path, "stale").unwrap();
        sample().write(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with('{'));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let err = sample()
            .write(Path::new("/nonexistent-dir/impossible/summary.json"))
            .unwrap_err();
        assert!(matches!(err, SummaryError::Write { .. }));
    }
}
