//! Job state persisted next to the input file
//!
//! Every job directory carries a small JSON record (`meta.json` by default). The record outlives
//! the process that submitted the job, so a later invocation can tell a finished job from one
//! that is still queued without parsing output again.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::input::Input;

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("can't read meta file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't write meta file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in meta file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("can't serialise meta record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A simple way to keep track of job state.
///
/// A job without a status is UNKNOWN: it was never submitted, or its output is missing.
/// Submission or an active scheduler entry moves it to PENDING, and the output check settles it
/// as FIN or FAIL. Only FIN is final, everything else is submitted again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Fin,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub status: Option<JobStatus>,
    pub wdir: PathBuf,
    pub infile: String,
    pub basename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl Meta {
    pub fn new(input: &Input) -> Meta {
        Meta {
            status: None,
            wdir: input.wdir.clone(),
            infile: input.filename.clone(),
            basename: input.basename.clone(),
            jobid: None,
            updated: None,
        }
    }

    /// Overwrite the record at `path`, stamping the update time
    pub fn save(&mut self, path: &Path) -> Result<(), MetaError> {
        self.updated = Some(Utc::now());
        let json = serde_json::to_string(self).map_err(MetaError::Encode)?;
        fs::write(path, json).map_err(|source| MetaError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Saved status {} to {}", display_status(self.status), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Meta, MetaError> {
        let json = read_file(path)?;
        serde_json::from_str(&json).map_err(|source| MetaError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Read only the status of a persisted record
///
/// A missing or null status is UNKNOWN. Unrecognised values are treated the same way so that a
/// hand-edited record leads to a fresh check instead of an error.
pub fn load_status(path: &Path) -> Result<Option<JobStatus>, MetaError> {
    let json = read_json(path)?;
    let status = match json.get("status") {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value::<JobStatus>(value.clone()) {
            Ok(status) => Some(status),
            Err(_) => {
                warn!("Ignoring unrecognised status {} in {}", value, path.display());
                None
            }
        },
    };
    Ok(status)
}

/// Read the scheduler job id of the last submission, if one was recorded
pub fn load_job_id(path: &Path) -> Result<Option<String>, MetaError> {
    let json = read_json(path)?;
    Ok(json.get("jobid").and_then(Value::as_str).map(|id| id.to_string()))
}

pub fn display_status(status: Option<JobStatus>) -> &'static str {
    match status {
        None => "UNKNOWN",
        Some(JobStatus::Pending) => "PENDING",
        Some(JobStatus::Fin) => "FIN",
        Some(JobStatus::Fail) => "FAIL",
    }
}

fn read_file(path: &Path) -> Result<String, MetaError> {
    fs::read_to_string(path).map_err(|source| MetaError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json(path: &Path) -> Result<Value, MetaError> {
    let json = read_file(path)?;
    serde_json::from_str::<Value>(&json).map_err(|source| MetaError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(dir: &Path) -> Meta {
        Meta {
            status: Some(JobStatus::Pending),
            wdir: dir.to_path_buf(),
            infile: "water.in".to_string(),
            basename: "water".to_string(),
            jobid: Some("1234".to_string()),
            updated: None,
        }
    }

    #[test]
    fn status_uses_upper_case_names() {
        let json = serde_json::to_string(&JobStatus::Fin).unwrap();
        assert_eq!(json, "\"FIN\"");
        let status: JobStatus = serde_json::from_str("\"PENDING\"").unwrap();
        assert_eq!(status, JobStatus::Pending);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.json");
        let mut record = meta(dir.path());
        record.save(&path).unwrap();
        assert!(record.updated.is_some());

        let loaded = Meta::load(&path).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(load_status(&path).unwrap(), Some(JobStatus::Pending));
        assert_eq!(load_job_id(&path).unwrap().as_deref(), Some("1234"));
    }

    #[test]
    fn record_without_job_id_still_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.json");
        let json = r#"{"status": "FIN", "wdir": "/scratch/w", "infile": "a.in", "basename": "a"}"#;
        fs::write(&path, json).unwrap();

        let loaded = Meta::load(&path).unwrap();
        assert_eq!(loaded.status, Some(JobStatus::Fin));
        assert_eq!(loaded.jobid, None);
        assert_eq!(load_job_id(&path).unwrap(), None);
    }

    #[test]
    fn missing_or_null_status_is_unknown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.json");
        fs::write(&path, r#"{"status": null}"#).unwrap();
        assert_eq!(load_status(&path).unwrap(), None);
        fs::write(&path, r#"{"wdir": "/tmp"}"#).unwrap();
        assert_eq!(load_status(&path).unwrap(), None);
        fs::write(&path, r#"{"status": "RUNNING"}"#).unwrap();
        assert_eq!(load_status(&path).unwrap(), None);
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_status(&path), Err(MetaError::Decode { .. })));
        assert!(matches!(
            load_status(&dir.path().join("absent.json")),
            Err(MetaError::Read { .. })
        ));
    }
}
