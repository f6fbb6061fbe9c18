//! Job lifecycle: decide whether a job is finished, still queued, or has to be submitted
//!
//! Three sources are combined, in this order:
//! 1. the persisted meta record, where FIN is final and nothing else is consulted
//! 2. the scheduler, queried with the job id of the last submission
//! 3. the output file, checked with a [`SuccessCheck`]
//!
//! Submission itself lives in [`submit`], option handling in [`options`].

/// Scheduler options and custom arguments
pub mod options;
/// Output success predicates
pub mod success;
/// Batch submission and live runs
pub mod submit;

use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::input::{Input, InputError};
use crate::meta::{self, JobStatus, Meta, MetaError};
use crate::scheduler::{Scheduler, SchedulerError};

pub use options::JobOptions;
pub use success::SuccessCheck;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Meta(#[from] MetaError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("no submit script set for job in {0}")]
    MissingScript(PathBuf),
    #[error("can't check output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("can't capture {path}: {source}")]
    Capture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of looking at a job
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Assessment {
    /// Good output exists, either recorded earlier or found now
    Finished,
    /// The scheduler still has the job queued or running
    Active,
    /// Never submitted, lost, or failed: submit (again)
    NeedsSubmission,
}

/// How to recognise a finished job
pub struct CheckOptions {
    /// Output file extension, the output is `<basename>.<out_extension>` in the working directory
    pub out_extension: String,
    pub success: SuccessCheck,
    /// Don't trust an existing meta record, start over from the scheduler and output
    pub ignore_meta: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            out_extension: "out".to_string(),
            success: SuccessCheck::default(),
            ignore_meta: false,
        }
    }
}

pub struct Job {
    pub input: Input,
    /// Submit script, has to be in $PATH or given as a path
    pub script: Option<String>,
    pub options: JobOptions,
    custom_options: Vec<String>,
    scheduler: Box<dyn Scheduler>,
    meta: Meta,
    meta_path: PathBuf,
}

impl Job {
    pub fn new(input: Input, scheduler: Box<dyn Scheduler>, meta_file: &str) -> Job {
        // the meta file always lives next to the input
        let meta_name = Path::new(meta_file)
            .file_name()
            .map(|name| name.to_owned())
            .unwrap_or_else(|| "meta.json".into());
        let meta_path = input.wdir.join(meta_name);
        let meta = Meta::new(&input);

        Job {
            input,
            script: None,
            options: JobOptions::default(),
            custom_options: Vec::new(),
            scheduler,
            meta,
            meta_path,
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Job {
        self.script = Some(script.into());
        self
    }

    pub fn with_options(mut self, options: JobOptions) -> Job {
        self.options = options;
        self
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.meta.status
    }

    pub fn job_id(&self) -> Option<&str> {
        self.meta.jobid.as_deref()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn meta_path(&self) -> &Path {
        &self.meta_path
    }

    pub fn output_path(&self, out_extension: &str) -> PathBuf {
        self.meta.wdir.join(format!("{}.{}", self.meta.basename, out_extension))
    }

    /// Ask the scheduler whether the last submission is still queued or running
    ///
    /// Marks the job PENDING if it is. A job that was never submitted isn't running, and neither
    /// is a job the scheduler can't report on.
    pub fn is_running(&mut self) -> bool {
        let Some(job_id) = self.meta.jobid.clone() else {
            return false;
        };

        match self.scheduler.query_state(&job_id) {
            Ok(state) if state.is_active() => {
                info!("Job {job_id} is {state:?} in {}", self.scheduler.kind());
                self.meta.status = Some(JobStatus::Pending);
                true
            }
            Ok(state) => {
                info!("Job {job_id} left the queue as {state:?}");
                false
            }
            Err(err) => {
                warn!("Can't get status of job {job_id}: {err}");
                false
            }
        }
    }

    /// Decide whether the output at `path` shows a successful run
    ///
    /// Missing output leaves the status UNKNOWN. Otherwise the job becomes FIN or FAIL.
    pub fn good_output(&mut self, path: &Path, check: &SuccessCheck) -> Result<bool, JobError> {
        if !path.exists() {
            info!("No output at {}", path.display());
            self.meta.status = None;
            return Ok(false);
        }

        let good = check.is_success(path).map_err(|source| JobError::Output {
            path: path.to_path_buf(),
            source,
        })?;
        self.meta.status = Some(if good { JobStatus::Fin } else { JobStatus::Fail });
        info!("Output {} is {}", path.display(), meta::display_status(self.meta.status));
        Ok(good)
    }

    /// Work out where the job stands, persisting what was learned
    pub fn assess(&mut self, opts: &CheckOptions) -> Result<Assessment, JobError> {
        if !opts.ignore_meta && self.meta_path.exists() {
            if meta::load_status(&self.meta_path)? == Some(JobStatus::Fin) {
                self.meta.status = Some(JobStatus::Fin);
                return Ok(Assessment::Finished);
            }
            if self.meta.jobid.is_none() {
                self.meta.jobid = meta::load_job_id(&self.meta_path)?;
            }
        }

        if self.is_running() {
            self.save_meta()?;
            return Ok(Assessment::Active);
        }

        let output = self.output_path(&opts.out_extension);
        let good = self.good_output(&output, &opts.success)?;
        self.save_meta()?;

        Ok(if good { Assessment::Finished } else { Assessment::NeedsSubmission })
    }

    /// True if the job finished with good output
    pub fn is_successful(&mut self, opts: &CheckOptions) -> Result<bool, JobError> {
        Ok(self.assess(opts)? == Assessment::Finished)
    }

    /// Submit the job unless it finished or is still queued
    ///
    /// A dry run logs the command and leaves the meta record as the assessment left it.
    pub fn smart_submit(&mut self, opts: &CheckOptions, dry_run: bool) -> Result<Assessment, JobError> {
        let assessment = self.assess(opts)?;
        match assessment {
            Assessment::NeedsSubmission => {
                let job_id = self.submit(dry_run)?;
                self.mark_submitted(job_id, dry_run)?;
            }
            _ => self.log_skip(assessment),
        }
        Ok(assessment)
    }

    /// Run the job live unless it finished or is still queued
    pub fn smart_run(&mut self, opts: &CheckOptions, dry_run: bool) -> Result<Assessment, JobError> {
        let assessment = self.assess(opts)?;
        match assessment {
            Assessment::NeedsSubmission => {
                self.run(dry_run)?;
                self.mark_submitted(None, dry_run)?;
            }
            _ => self.log_skip(assessment),
        }
        Ok(assessment)
    }

    pub fn save_meta(&mut self) -> Result<(), JobError> {
        self.meta.save(&self.meta_path)?;
        Ok(())
    }

    pub fn load_status(&self) -> Result<Option<JobStatus>, JobError> {
        Ok(meta::load_status(&self.meta_path)?)
    }

    fn mark_submitted(&mut self, job_id: Option<String>, dry_run: bool) -> Result<(), JobError> {
        if dry_run {
            info!("--dry-run set, leaving {} untouched", self.meta_path.display());
            return Ok(());
        }
        self.meta.status = Some(JobStatus::Pending);
        self.meta.jobid = job_id;
        self.save_meta()
    }

    fn log_skip(&self, assessment: Assessment) {
        let wdir = self.meta.wdir.display();
        match assessment {
            Assessment::Finished => info!("All good. Skipping folder {wdir}/"),
            Assessment::Active => info!("Job still queued. Skipping folder {wdir}/"),
            Assessment::NeedsSubmission => {}
        }
    }
}
