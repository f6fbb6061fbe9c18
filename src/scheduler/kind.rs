use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::scheduler::SchedulerError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum SchedulerKind {
    Slurm,
    Pbs,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchedulerKind::Slurm => write!(f, "slurm"),
            SchedulerKind::Pbs => write!(f, "pbs"),
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slurm" => Ok(SchedulerKind::Slurm),
            "pbs" => Ok(SchedulerKind::Pbs),
            _ => Err(SchedulerError::UnsupportedScheduler(s.to_string())),
        }
    }
}
