//! Result markers
//!
//! External runners decide pass/fail by which of two files exists in the
//! marker directory: `testok` or `failed`. Both carry the JSON form of the
//! [`ScenarioResult`]. While a scenario runs only `failed` exists, so a
//! crash mid-run reads as a failure.
//!
//! A pass is recorded by making `testok` durable before `failed` is removed.
//! A crash in between leaves both files; readers then trust `failed`, which
//! still holds the unfinished result.

use linkguard_core::{HarnessError, Result, ScenarioResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Success marker file name.
pub const OK_MARKER: &str = "testok";

/// Failure marker file name.
pub const FAILED_MARKER: &str = "failed";

/// Writes the pass/fail marker pair.
#[derive(Debug, Clone)]
pub struct ResultMarker {
    dir: PathBuf,
    ok_name: String,
    failed_name: String,
}

impl ResultMarker {
    /// Markers `testok` / `failed` inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_names(dir, OK_MARKER, FAILED_MARKER)
    }

    /// Markers in `dir` under custom file names.
    pub fn with_names(dir: impl Into<PathBuf>, ok_name: &str, failed_name: &str) -> Self {
        ResultMarker {
            dir: dir.into(),
            ok_name: ok_name.to_string(),
            failed_name: failed_name.to_string(),
        }
    }

    /// Path of the pass marker.
    pub fn ok_path(&self) -> PathBuf {
        self.dir.join(&self.ok_name)
    }

    /// Path of the failure marker.
    pub fn failed_path(&self) -> PathBuf {
        self.dir.join(&self.failed_name)
    }

    /// Record a dispatched, unfinished run: no success marker, failure
    /// marker holding the in-progress result.
    pub fn begin(&self, result: &ScenarioResult) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        remove_if_present(&self.ok_path())?;
        write_atomic(&self.failed_path(), &result.to_json()?)?;
        debug!(
            target: "linkguard::marker",
            scenario = %result.name,
            path = %self.failed_path().display(),
            "Marked run in progress"
        );
        Ok(())
    }

    /// Record the terminal result; exactly one marker exists afterwards.
    pub fn finish(&self, result: &ScenarioResult) -> Result<()> {
        if !result.is_finalized() {
            return Err(HarnessError::invalid_input(format!(
                "result of '{}' is not finalized",
                result.name
            )));
        }
        fs::create_dir_all(&self.dir)?;
        let json = result.to_json()?;
        let (keep, drop) = if result.is_pass() {
            (self.ok_path(), self.failed_path())
        } else {
            (self.failed_path(), self.ok_path())
        };
        write_atomic(&keep, &json)?;
        remove_if_present(&drop)?;
        sync_dir(&self.dir)?;
        debug!(
            target: "linkguard::marker",
            scenario = %result.name,
            path = %keep.display(),
            "Wrote result marker"
        );
        Ok(())
    }

    /// Result recorded by the marker currently present, if any.
    ///
    /// When both markers exist the failure marker wins.
    pub fn read(&self) -> Result<Option<ScenarioResult>> {
        for path in [self.failed_path(), self.ok_path()] {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    let result = serde_json::from_str(&content).map_err(|e| {
                        HarnessError::Serialization(format!("{}: {}", path.display(), e))
                    })?;
                    return Ok(Some(result));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Temp file, fsync, rename, then fsync the directory.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    if let Some(dir) = path.parent() {
        sync_dir(dir)?;
    }
    Ok(())
}

fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_core::ScenarioOutcome;
    use tempfile::TempDir;

    #[test]
    fn test_begin_marks_failed() {
        let dir = TempDir::new().unwrap();
        let marker = ResultMarker::new(dir.path().join("markers"));
        fs::create_dir_all(dir.path().join("markers")).unwrap();
        fs::write(marker.ok_path(), "stale").unwrap();

        marker.begin(&ScenarioResult::dispatched("churn", 1)).unwrap();

        assert!(!marker.ok_path().exists());
        let recorded = marker.read().unwrap().unwrap();
        assert_eq!(recorded.outcome, ScenarioOutcome::Fail);
        assert!(!recorded.is_finalized());
    }

    #[test]
    fn test_finish_pass_and_fail_are_exclusive() {
        let dir = TempDir::new().unwrap();
        let marker = ResultMarker::new(dir.path());

        let pass = ScenarioResult::dispatched("a", 1).finalize(Vec::new());
        marker.begin(&pass).unwrap();
        marker.finish(&pass).unwrap();
        assert!(marker.ok_path().exists());
        assert!(!marker.failed_path().exists());
        assert!(marker.read().unwrap().unwrap().is_pass());

        let fail = ScenarioResult::dispatched("a", 2).finalize(vec!["boom".to_string()]);
        marker.finish(&fail).unwrap();
        assert!(!marker.ok_path().exists());
        let recorded = marker.read().unwrap().unwrap();
        assert_eq!(recorded.failure_detail.as_deref(), Some("boom"));
        assert_eq!(recorded.seed, 2);
    }

    #[test]
    fn test_interrupted_pass_reads_as_failure() {
        let dir = TempDir::new().unwrap();
        let marker = ResultMarker::new(dir.path());
        let dispatched = ScenarioResult::dispatched("a", 3);
        marker.begin(&dispatched).unwrap();
        // crash after testok became durable, before failed was removed
        let pass = dispatched.clone().finalize(Vec::new());
        fs::write(marker.ok_path(), pass.to_json().unwrap()).unwrap();

        let recorded = marker.read().unwrap().unwrap();
        assert!(!recorded.is_pass());
        assert!(!recorded.is_finalized());

        marker.finish(&pass).unwrap();
        assert!(marker.read().unwrap().unwrap().is_pass());
        assert!(!marker.failed_path().exists());
        assert!(!dir.path().join("testok.tmp").exists());
    }

    #[test]
    fn test_finish_requires_finalized_result() {
        let dir = TempDir::new().unwrap();
        let marker = ResultMarker::new(dir.path());
        assert!(marker.finish(&ScenarioResult::dispatched("a", 1)).is_err());
        assert!(marker.read().unwrap().is_none());
    }

    #[test]
    fn test_custom_names() {
        let dir = TempDir::new().unwrap();
        let marker = ResultMarker::with_names(dir.path(), "ok", "ko");
        let pass = ScenarioResult::dispatched("a", 1).finalize(Vec::new());
        marker.finish(&pass).unwrap();
        assert!(dir.path().join("ok").exists());
    }
}
