use std::process::Command;

use serde_json::Value;

use crate::job::JobOptions;
use crate::scheduler::{QueueState, Scheduler, SchedulerError, SchedulerKind};

/// PBS adapter
///
/// `qsub` prints the full job id (`1234.server`) on success. State is read from the JSON form
/// of `qstat`, with `-x` so finished jobs are still reported.
pub struct Pbs;

impl Scheduler for Pbs {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Pbs
    }

    fn submit_program(&self) -> &'static str {
        "qsub"
    }

    fn run_program(&self) -> &'static str {
        "qsub"
    }

    fn option_args(&self, options: &JobOptions) -> Vec<String> {
        let mut args = vec![
            "-l".to_string(),
            format!("mem={}mb", options.memory),
            "-l".to_string(),
            format!("ncpus={}", options.cpus),
            "-l".to_string(),
            format!("walltime={}", options.time),
        ];
        if let Some(partition) = &options.partition {
            args.push("-q".to_string());
            args.push(partition.clone());
        }
        args.push("-N".to_string());
        args.push(options.job_name.clone());
        args
    }

    fn parse_job_id(&self, stdout: &str) -> Result<String, SchedulerError> {
        stdout
            .lines()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .map(|l| l.to_string())
            .ok_or_else(|| SchedulerError::JobIdParse {
                program: self.submit_program().to_string(),
                output: stdout.to_string(),
            })
    }

    fn status_command(&self, job_id: &str) -> Command {
        let mut command = Command::new("qstat");
        command.args(["-f", job_id, "-F", "json", "-x"]);
        command
    }

    fn parse_state(&self, job_id: &str, stdout: &str) -> Result<QueueState, SchedulerError> {
        let data: Value = serde_json::from_str(stdout).map_err(|err| SchedulerError::Malformed {
            program: "qstat".to_string(),
            reason: err.to_string(),
        })?;

        let job = &data["Jobs"][job_id];
        if job.is_null() {
            return Err(SchedulerError::NoStatus(job_id.to_string()));
        }
        let state = job["job_state"]
            .as_str()
            .ok_or_else(|| SchedulerError::Malformed {
                program: "qstat".to_string(),
                reason: format!("job {job_id} has no job_state"),
            })?;

        let status = match state {
            "Q" | "H" | "W" | "T" | "S" => QueueState::Pending,
            "R" | "E" | "B" => QueueState::Running,
            "F" => match job["Exit_status"].as_i64() {
                Some(0) => QueueState::Completed,
                _ => QueueState::Failed,
            },
            other => QueueState::Unknown(other.to_string()),
        };
        Ok(status)
    }
}
