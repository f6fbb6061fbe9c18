//! Batch scheduler adapters
//!
//! A scheduler knows which programs submit and run a job, how job options are spelled on its
//! command line, and how to read a job's state back from its accounting tools.

/// Scheduler names accepted on the command line
pub mod kind;
/// SLURM: sbatch, srun and sacct
pub mod slurm;
/// PBS: qsub and qstat
pub mod pbs;

use std::process::{Command, Output};

use log::debug;
use thiserror::Error;

use crate::job::JobOptions;

pub use kind::SchedulerKind;
pub use pbs::Pbs;
pub use slurm::Slurm;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unsupported scheduler {0:?} (expected slurm or pbs)")]
    UnsupportedScheduler(String),
    #[error("could not parse job id from {program} output: {output:?}")]
    JobIdParse { program: String, output: String },
    #[error("no status found for job {0}")]
    NoStatus(String),
    #[error("malformed {program} output: {reason}")]
    Malformed { program: String, reason: String },
    #[error("can't run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with code {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },
}

/// A job's state as reported by the scheduler
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    /// A state this adapter doesn't recognise, kept verbatim
    Unknown(String),
}

impl QueueState {
    /// Queued or running jobs must not be submitted again
    pub fn is_active(&self) -> bool {
        matches!(self, QueueState::Pending | QueueState::Running)
    }
}

pub trait Scheduler {
    fn kind(&self) -> SchedulerKind;

    /// Program used for batch submission
    fn submit_program(&self) -> &'static str;

    /// Program used for a live (blocking) run
    fn run_program(&self) -> &'static str;

    /// Render job options as command line arguments
    fn option_args(&self, options: &JobOptions) -> Vec<String>;

    /// Extract the job id from the stdout of the submit program
    fn parse_job_id(&self, stdout: &str) -> Result<String, SchedulerError>;

    /// Command that reports the state of a single job
    fn status_command(&self, job_id: &str) -> Command;

    /// Read the job state from the stdout of the status command
    fn parse_state(&self, job_id: &str, stdout: &str) -> Result<QueueState, SchedulerError>;

    /// Ask the scheduler for the current state of a job
    fn query_state(&self, job_id: &str) -> Result<QueueState, SchedulerError> {
        let mut command = self.status_command(job_id);
        let program = command.get_program().to_string_lossy().into_owned();
        debug!("Running {:?}", command);

        let output = command.output().map_err(|source| SchedulerError::Spawn {
            program: program.clone(),
            source,
        })?;
        let output = check_command_output(&program, output)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("{program} output:\n{stdout}");

        self.parse_state(job_id, &stdout)
    }
}

/// Create the adapter for a scheduler
pub fn scheduler_for(kind: SchedulerKind) -> Box<dyn Scheduler> {
    match kind {
        SchedulerKind::Slurm => Box::new(Slurm),
        SchedulerKind::Pbs => Box::new(Pbs),
    }
}

/// Turn a non-zero exit status into an error carrying stderr
pub fn check_command_output(program: &str, output: Output) -> Result<Output, SchedulerError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(SchedulerError::CommandFailed {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
