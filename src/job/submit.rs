use std::fs::File;
use std::process::{Command, Stdio};

use log::{debug, info, warn};

use crate::job::{Job, JobError};
use crate::scheduler::SchedulerError;

impl Job {
    /// Submit the job in batch mode
    ///
    /// Returns the scheduler job id. A submission whose output doesn't contain an id is logged
    /// and returns `None`, as does a dry run.
    pub fn submit(&mut self, dry_run: bool) -> Result<Option<String>, JobError> {
        let program = self.scheduler.submit_program();
        let mut command = self.command(program)?;
        if dry_run {
            info!("dry-run: {}", render(&command));
            return Ok(None);
        }

        info!("Running {}", render(&command));
        let output = command.output().map_err(|source| SchedulerError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("{program} stderr: {}", stderr.trim());
        }
        debug!("{program} stdout: {stdout}");

        match self.scheduler.parse_job_id(&stdout) {
            Ok(job_id) => {
                info!("{} job id: {job_id}", self.scheduler.kind());
                self.meta.jobid = Some(job_id.clone());
                Ok(Some(job_id))
            }
            Err(err) => {
                warn!("{err}, stdout was: {}", stdout.trim());
                Ok(None)
            }
        }
    }

    /// Run the job live and wait for it
    ///
    /// Output of the run program is captured in `stdout.txt` and `stderr.txt` in the working
    /// directory.
    pub fn run(&mut self, dry_run: bool) -> Result<(), JobError> {
        let program = self.scheduler.run_program();
        let mut command = self.command(program)?;
        if dry_run {
            info!("dry-run: {}", render(&command));
            return Ok(());
        }

        let capture = |name: &str| {
            let path = self.input.wdir.join(name);
            File::create(&path).map_err(|source| JobError::Capture { path, source })
        };
        command
            .stdout(Stdio::from(capture("stdout.txt")?))
            .stderr(Stdio::from(capture("stderr.txt")?));

        info!("Running {}", render(&command));
        let status = command.status().map_err(|source| SchedulerError::Spawn {
            program: program.to_string(),
            source,
        })?;
        if !status.success() {
            warn!("{program} exited with {status}, see stderr.txt in {}", self.input.wdir.display());
        }
        Ok(())
    }

    /// `<program> <job options> <script> <input>`, run from the working directory
    fn command(&self, program: &str) -> Result<Command, JobError> {
        let script = self
            .script
            .as_ref()
            .ok_or_else(|| JobError::MissingScript(self.input.wdir.clone()))?;

        let mut command = Command::new(program);
        command
            .args(self.job_options())
            .arg(script)
            .arg(&self.input.filename)
            .current_dir(&self.input.wdir);
        Ok(command)
    }
}

fn render(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().into_owned()];
    parts.extend(command.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}
