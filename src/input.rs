//! Quantum chemistry input files
//!
//! An input is identified by its path. The directory part becomes the job's working directory,
//! which is where the job is submitted from and where its output and meta record live.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::templates;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("can't determine current directory: {0}")]
    CurrentDir(#[source] io::Error),
    #[error("input path {0} has no file name")]
    NoFileName(PathBuf),
    #[error("can't write input {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't read input {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't render input template: {0}")]
    Template(#[from] tinytemplate::error::Error),
}

#[derive(Clone, Debug)]
pub struct Input {
    pub filepath: PathBuf,
    pub wdir: PathBuf,
    pub filename: String,
    /// Extension without the leading dot, empty if there is none
    pub extension: String,
    pub basename: String,
    pub content: String,
}

impl Input {
    /// Create an input with `content` and write it to `path`
    pub fn new(path: &Path, content: String) -> Result<Input, InputError> {
        let input = Input::describe(path, content)?;
        input.save()?;
        Ok(input)
    }

    /// Render `template` over the default values overridden by `vars` and write it to `path`
    pub fn from_template(template: &str, path: &Path, vars: &Map<String, Value>) -> Result<Input, InputError> {
        let content = templates::render(template, vars)?;
        Input::new(path, content)
    }

    /// Attach to an existing input without rewriting it
    ///
    /// A missing file gives an input with empty content, which is enough to submit or check a job
    /// whose input is managed elsewhere.
    pub fn from_file(path: &Path) -> Result<Input, InputError> {
        let content = if path.is_file() {
            fs::read_to_string(path).map_err(|source| InputError::Read {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            warn!("Input {} doesn't exist, continuing with empty content", path.display());
            String::new()
        };
        Input::describe(path, content)
    }

    pub fn save(&self) -> Result<(), InputError> {
        let write_err = |source| InputError::Write {
            path: self.filepath.clone(),
            source,
        };
        if !self.wdir.exists() {
            info!("Creating working directory {}", self.wdir.display());
            fs::create_dir_all(&self.wdir).map_err(write_err)?;
        }
        fs::write(&self.filepath, &self.content).map_err(write_err)?;
        info!("Input file {} written", self.filename);
        Ok(())
    }

    fn describe(path: &Path, content: String) -> Result<Input, InputError> {
        let (wdir, filename) = split_path(path)?;
        let name = Path::new(&filename);
        let basename = name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.clone());
        let extension = name
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Input {
            filepath: wdir.join(&filename),
            wdir,
            filename,
            extension,
            basename,
            content,
        })
    }
}

/// Split a path into an absolute directory and a file name
///
/// A bare file name lives in the current directory, relative directories are resolved against it.
pub fn split_path(path: &Path) -> Result<(PathBuf, String), InputError> {
    let filename = path
        .file_name()
        .ok_or_else(|| InputError::NoFileName(path.to_path_buf()))?
        .to_string_lossy()
        .into_owned();

    let wdir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => std::env::current_dir().map_err(InputError::CurrentDir)?.join(dir),
        None => std::env::current_dir().map_err(InputError::CurrentDir)?,
    };

    Ok((wdir, filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn bare_file_name_uses_current_directory() {
        let (wdir, filename) = split_path(Path::new("water.in")).unwrap();
        assert_eq!(wdir, std::env::current_dir().unwrap());
        assert_eq!(filename, "water.in");
    }

    #[test]
    fn relative_directory_is_made_absolute() {
        let (wdir, _) = split_path(Path::new("jobs/water.in")).unwrap();
        assert!(wdir.is_absolute());
        assert!(wdir.ends_with("jobs"));
    }

    #[test]
    fn new_input_creates_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("adc/water.in");
        let input = Input::new(&path, "$molecule\n$end\n".to_string()).unwrap();

        assert_eq!(input.wdir, dir.path().join("adc"));
        assert_eq!(input.basename, "water");
        assert_eq!(input.extension, "in");
        assert_eq!(fs::read_to_string(&path).unwrap(), "$molecule\n$end\n");
    }

    #[test]
    fn from_file_does_not_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("h2.inp");
        fs::write(&path, "original").unwrap();

        let input = Input::from_file(&path).unwrap();
        assert_eq!(input.content, "original");
        assert_eq!(input.basename, "h2");

        let missing = Input::from_file(&dir.path().join("none.inp")).unwrap();
        assert_eq!(missing.content, "");
        assert!(!missing.filepath.exists());
    }

    #[test]
    fn from_template_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hf.in");
        let mut vars = Map::new();
        vars.insert("basis".to_string(), json!("aug-cc-pVTZ"));

        let input = Input::from_template("basis = {basis}\nmethod = {method}\n", &path, &vars).unwrap();
        assert_eq!(input.content, "basis = aug-cc-pVTZ\nmethod = HF\n");
    }

    #[test]
    fn from_template_missing_placeholder() {
        let dir = TempDir::new().unwrap();
        let err = Input::from_template("{no_such_key}", &dir.path().join("x.in"), &Map::new()).unwrap_err();
        assert!(matches!(err, InputError::Template(_)));
        assert!(!dir.path().join("x.in").exists());
    }
}
