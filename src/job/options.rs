use log::info;

use crate::job::Job;

/// Resources requested from the scheduler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOptions {
    /// Memory in MB
    pub memory: u64,
    pub cpus: u32,
    /// Wall time in the scheduler's own format, e.g. `00:15:00` or `1-12`
    pub time: String,
    pub partition: Option<String>,
    pub job_name: String,
}

impl Default for JobOptions {
    fn default() -> Self {
        JobOptions {
            memory: 500,
            cpus: 1,
            time: "00:15:00".to_string(),
            partition: None,
            job_name: "CCJob".to_string(),
        }
    }
}

impl Job {
    /// All scheduler arguments: rendered job options followed by custom options
    pub fn job_options(&self) -> Vec<String> {
        let mut args = self.scheduler.option_args(&self.options);
        args.extend(self.custom_options.iter().cloned());
        args
    }

    /// Add scheduler arguments the job options don't cover
    ///
    /// With `use_long` each pair becomes a single `key=value` argument (`--qos=debug`), otherwise
    /// the key and value are passed as two arguments (`-A project`). Flags go last.
    pub fn set_custom_options<K, V>(&mut self, flags: &[&str], pairs: &[(K, V)], use_long: bool)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            if use_long {
                self.custom_options.push(format!("{key}={value}"));
            } else {
                self.custom_options.push(key.to_string());
                self.custom_options.push(value.to_string());
            }
        }
        self.custom_options.extend(flags.iter().map(|f| f.to_string()));

        if !self.custom_options.is_empty() {
            info!("Custom options specified: {}", self.custom_options.join(" "));
        }
    }

    pub fn custom_options(&self) -> &[String] {
        &self.custom_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Input;
    use crate::scheduler::{scheduler_for, SchedulerKind};
    use tempfile::TempDir;

    fn job(dir: &TempDir, kind: SchedulerKind) -> Job {
        let input = Input::new(&dir.path().join("h2o.in"), String::new()).unwrap();
        Job::new(input, scheduler_for(kind), "meta.json")
    }

    #[test]
    fn long_custom_options_follow_job_options() {
        let dir = TempDir::new().unwrap();
        let mut job = job(&dir, SchedulerKind::Slurm);
        job.set_custom_options(&["--exclusive"], &[("--qos", "debug")], true);

        let args = job.job_options();
        assert_eq!(args[args.len() - 2..], ["--qos=debug", "--exclusive"]);
        assert_eq!(args[0], "--mem=500");
    }

    #[test]
    fn short_custom_options_are_split() {
        let dir = TempDir::new().unwrap();
        let mut job = job(&dir, SchedulerKind::Pbs);
        job.set_custom_options::<&str, &str>(&[], &[("-A", "chem42")], false);
        assert_eq!(job.custom_options(), ["-A", "chem42"]);
        assert!(job.job_options().ends_with(&["-A".to_string(), "chem42".to_string()]));
    }
}
