use std::process::Command;

use crate::job::JobOptions;
use crate::scheduler::{QueueState, Scheduler, SchedulerError, SchedulerKind};

/// SLURM adapter
///
/// Jobs are submitted with `sbatch`, run live with `srun` and polled with `sacct`, which also
/// knows about jobs that already left the queue.
pub struct Slurm;

impl Scheduler for Slurm {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Slurm
    }

    fn submit_program(&self) -> &'static str {
        "sbatch"
    }

    fn run_program(&self) -> &'static str {
        "srun"
    }

    fn option_args(&self, options: &JobOptions) -> Vec<String> {
        let mut args = vec![
            format!("--mem={}", options.memory),
            format!("--cpus-per-task={}", options.cpus),
            format!("--time={}", options.time),
        ];
        if let Some(partition) = &options.partition {
            args.push(format!("--partition={partition}"));
        }
        args.push(format!("--job-name={}", options.job_name));
        args
    }

    fn parse_job_id(&self, stdout: &str) -> Result<String, SchedulerError> {
        stdout
            .lines()
            .map(|l| l.trim())
            .find(|l| l.to_lowercase().starts_with("submitted batch job"))
            .and_then(|l| l.split_whitespace().nth(3))
            .map(|l| l.to_string())
            .ok_or_else(|| SchedulerError::JobIdParse {
                program: self.submit_program().to_string(),
                output: stdout.to_string(),
            })
    }

    fn status_command(&self, job_id: &str) -> Command {
        let mut command = Command::new("sacct");
        // State defaults to 10 characters, too narrow for CONFIGURING or OUT_OF_MEMORY
        command.args(["-j", job_id, "-X", "--format=JobID%30,State%30"]);
        command
    }

    /// sacct prints a header, a ruler of dashes, then one row per job step. The first row
    /// describes the allocation itself. Rows from a narrower table may still carry truncated
    /// states such as `CONFIGURI+`.
    fn parse_state(&self, job_id: &str, stdout: &str) -> Result<QueueState, SchedulerError> {
        let mut lines = stdout.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| SchedulerError::NoStatus(job_id.to_string()))?;
        let column = header
            .split_whitespace()
            .position(|c| c == "State")
            .ok_or_else(|| SchedulerError::Malformed {
                program: "sacct".to_string(),
                reason: format!("no State column in header {header:?}"),
            })?;

        let row = lines
            .find(|l| !l.trim_start().starts_with('-'))
            .ok_or_else(|| SchedulerError::NoStatus(job_id.to_string()))?;
        let state = row
            .split_whitespace()
            .nth(column)
            .ok_or_else(|| SchedulerError::Malformed {
                program: "sacct".to_string(),
                reason: format!("row {row:?} has no State field"),
            })?;

        Ok(parse_slurm_state(state))
    }
}

/// Every state sacct reports, used to recover values cut short by a narrow column
static SLURM_STATES: [&str; 14] = [
    "PENDING",
    "CONFIGURING",
    "REQUEUED",
    "SUSPENDED",
    "RUNNING",
    "COMPLETING",
    "COMPLETED",
    "FAILED",
    "NODE_FAIL",
    "OUT_OF_MEMORY",
    "BOOT_FAIL",
    "CANCELLED",
    "TIMEOUT",
    "DEADLINE",
];

fn parse_slurm_state(state: &str) -> QueueState {
    // sacct marks truncated values with a trailing '+'
    let state = match state.strip_suffix('+') {
        Some(prefix) => {
            let mut matches = SLURM_STATES.iter().filter(|known| known.starts_with(prefix));
            match (matches.next(), matches.next()) {
                (Some(known), None) => *known,
                _ => prefix,
            }
        }
        None => state,
    };

    match state {
        "PENDING" | "CONFIGURING" | "REQUEUED" | "SUSPENDED" => QueueState::Pending,
        "RUNNING" | "COMPLETING" => QueueState::Running,
        "COMPLETED" => QueueState::Completed,
        "FAILED" | "NODE_FAIL" | "OUT_OF_MEMORY" | "BOOT_FAIL" => QueueState::Failed,
        "CANCELLED" => QueueState::Cancelled,
        "TIMEOUT" | "DEADLINE" => QueueState::Timeout,
        other => QueueState::Unknown(other.to_string()),
    }
}

/// Format a SLURM time limit
///
/// Produces `days-hours` when days are given, `hours:minutes` when hours are given and plain
/// minutes otherwise. An all-zero request falls back to 15 minutes.
pub fn time_limit(days: u32, hours: u32, minutes: u32) -> String {
    if days == 0 && hours == 0 && minutes == 0 {
        return "15".to_string();
    }
    if days > 0 {
        format!("{days}-{hours}")
    } else if hours > 0 {
        format!("{hours}:{minutes}")
    } else {
        minutes.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SACCT_RUNNING: &str = "\
       JobID      State
------------ ----------
123456          RUNNING
123456.batch    RUNNING
";

    #[test]
    fn options_follow_fixed_order_and_skip_missing_partition() {
        let options = JobOptions::default();
        assert_eq!(
            Slurm.option_args(&options),
            vec!["--mem=500", "--cpus-per-task=1", "--time=00:15:00", "--job-name=CCJob"]
        );

        let options = JobOptions { partition: Some("short".to_string()), ..JobOptions::default() };
        assert!(Slurm.option_args(&options).contains(&"--partition=short".to_string()));
    }

    #[test]
    fn job_id_from_sbatch_output() {
        let id = Slurm.parse_job_id("Submitted batch job 987654\n").unwrap();
        assert_eq!(id, "987654");
    }

    #[test]
    fn job_id_missing() {
        let err = Slurm.parse_job_id("sbatch: error: invalid partition").unwrap_err();
        assert!(matches!(err, SchedulerError::JobIdParse { .. }));
    }

    #[test]
    fn state_read_from_state_column() {
        assert_eq!(Slurm.parse_state("123456", SACCT_RUNNING).unwrap(), QueueState::Running);
    }

    #[test]
    fn state_column_found_in_wider_table() {
        let out = "\
       JobID    JobName  Partition    Account  AllocCPUS      State ExitCode
------------ ---------- ---------- ---------- ---------- ---------- --------
42                 test     normal       proj          1  CANCELLED+     0:0
";
        assert_eq!(Slurm.parse_state("42", out).unwrap(), QueueState::Cancelled);
    }

    #[test]
    fn cancelled_by_user_is_cancelled() {
        let out = "JobID State\n----- -----\n7 CANCELLED by 1000\n";
        assert_eq!(Slurm.parse_state("7", out).unwrap(), QueueState::Cancelled);
    }

    #[test]
    fn no_rows_means_no_status() {
        let out = "       JobID      State \n------------ ---------- \n";
        let err = Slurm.parse_state("1", out).unwrap_err();
        assert!(matches!(err, SchedulerError::NoStatus(id) if id == "1"));
    }

    #[test]
    fn state_mapping() {
        assert_eq!(parse_slurm_state("PENDING"), QueueState::Pending);
        assert_eq!(parse_slurm_state("COMPLETED"), QueueState::Completed);
        assert_eq!(parse_slurm_state("OUT_OF_MEMORY"), QueueState::Failed);
        assert_eq!(parse_slurm_state("TIMEOUT"), QueueState::Timeout);
        assert_eq!(parse_slurm_state("WEIRD"), QueueState::Unknown("WEIRD".to_string()));
    }

    #[test]
    fn status_command_asks_for_wide_allocation_rows() {
        let command = Slurm.status_command("123");
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(command.get_program(), "sacct");
        assert_eq!(args, vec!["-j", "123", "-X", "--format=JobID%30,State%30"]);
    }

    #[test]
    fn truncated_states_are_recovered() {
        let out = "JobID State\n---------- ----------\n123 CONFIGURI+\n";
        let state = Slurm.parse_state("123", out).unwrap();
        assert_eq!(state, QueueState::Pending);
        assert!(state.is_active());

        let out = "JobID State\n---------- ----------\n124 OUT_OF_ME+\n";
        assert_eq!(Slurm.parse_state("124", out).unwrap(), QueueState::Failed);

        assert_eq!(parse_slurm_state("COMPLETIN+"), QueueState::Running);
        // "COMPLET" fits both COMPLETED and COMPLETING
        assert_eq!(parse_slurm_state("COMPLET+"), QueueState::Unknown("COMPLET".to_string()));
    }

    #[test]
    fn time_limit_formats() {
        assert_eq!(time_limit(0, 0, 0), "15");
        assert_eq!(time_limit(2, 5, 30), "2-5");
        assert_eq!(time_limit(0, 3, 20), "3:20");
        assert_eq!(time_limit(0, 0, 45), "45");
    }
}
