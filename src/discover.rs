//! Locate files in job directories and read the molecular details kept next to them

/// Charge and multiplicity files
pub mod eleconfig;
/// Fragment coordinates split at a separator line
pub mod fragments;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use eleconfig::{find_eleconfig, read_eleconfig};
pub use fragments::{read_fragments, Fragments};

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("can't list directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not determine a unique {what} in {dir}/ (found {found})")]
    NotUnique { what: String, dir: PathBuf, found: usize },
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Find the single output file with extension `extension` in `dir`
///
/// Scheduler logs (`slurm-1234.out`) share the extension and are skipped.
pub fn find_output(dir: &Path, extension: &str) -> Result<PathBuf, DiscoverError> {
    let candidates: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .filter(|path| !file_name(path).starts_with("slurm"))
        .collect();

    unique(candidates, format!(".{extension} file"), dir)
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    let entries = fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|res| res.map(|e| e.path()))
                .collect::<Result<Vec<PathBuf>, io::Error>>()
        })
        .map_err(|source| DiscoverError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
    Ok(entries.into_iter().filter(|path| path.is_file()).collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn unique(mut candidates: Vec<PathBuf>, what: String, dir: &Path) -> Result<PathBuf, DiscoverError> {
    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        found => Err(DiscoverError::NotUnique {
            what,
            dir: dir.to_path_buf(),
            found,
        }),
    }
}
