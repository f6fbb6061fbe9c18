use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde_json::{Map, Value};

use ccjob::discover::{find_eleconfig, read_eleconfig, read_fragments};
use ccjob::input::Input;
use ccjob::job::{Assessment, CheckOptions, Job, JobOptions, SuccessCheck};
use ccjob::meta;
use ccjob::scheduler::{scheduler_for, SchedulerKind};
use ccjob::templates;

#[derive(Parser, Debug)]
#[command(name = "ccjob", version, about = "Submit and track quantum chemistry jobs on SLURM and PBS clusters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a batch job unless it already finished or is still queued
    Submit(SubmitArgs),
    /// Run a job live unless it already finished or is still queued
    Run(SubmitArgs),
    /// Check a job and update its meta record without submitting
    Status(StatusArgs),
    /// Render an input file from a template
    Render(RenderArgs),
    /// List built-in templates
    Templates,
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Path to the input file, its directory is the job's working directory
    #[arg(short, long)]
    input: PathBuf,
    #[arg(short, long, value_enum, default_value_t = SchedulerKind::Slurm)]
    scheduler: SchedulerKind,
    /// Name of the meta record kept in the working directory
    #[arg(long, default_value = "meta.json")]
    meta_file: String,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Extension of the output file (<input basename>.<extension>)
    #[arg(long, default_value = "out")]
    out_extension: String,
    /// A line containing this string marks a successful run
    #[arg(long, default_value = ccjob::job::success::DEFAULT_SUCCESS_STRING)]
    success_string: String,
    /// Ignore an existing meta record
    #[arg(long)]
    ignore_meta: bool,
}

#[derive(Args, Debug)]
struct ResourceArgs {
    /// Submit script, called with the input file name as its argument
    #[arg(long)]
    script: String,
    /// Memory in MB
    #[arg(long, default_value_t = 500)]
    mem: u64,
    #[arg(long, default_value_t = 1)]
    cpus: u32,
    /// Wall time in scheduler format
    #[arg(long, default_value = "00:15:00")]
    time: String,
    #[arg(long)]
    partition: Option<String>,
    #[arg(long, default_value = "CCJob")]
    job_name: String,
    /// Extra scheduler option as key=value, may be repeated
    #[arg(long = "custom", value_name = "KEY=VALUE")]
    custom: Vec<String>,
    /// Extra scheduler flag without a value, may be repeated
    #[arg(long = "flag", allow_hyphen_values = true)]
    flags: Vec<String>,
    /// Pass custom options as "key value" instead of "key=value"
    #[arg(long)]
    short_options: bool,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    #[command(flatten)]
    job: JobArgs,
    #[command(flatten)]
    resources: ResourceArgs,
    #[command(flatten)]
    check: CheckArgs,
    /// Log the submit command without running it or recording a submission
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[command(flatten)]
    job: JobArgs,
    #[command(flatten)]
    check: CheckArgs,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Built-in template name or path to a template file
    #[arg(short, long)]
    template: String,
    /// Where to write the rendered input
    #[arg(short, long)]
    output: PathBuf,
    /// Template value as key=value, may be repeated. Values are parsed as JSON when possible.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
    /// Directory holding an electronic configuration file (charges and multiplicities)
    #[arg(long)]
    eleconfig_dir: Option<PathBuf>,
    /// Coordinate file with fragments split by a separator line
    #[arg(long)]
    fragments: Option<PathBuf>,
    #[arg(long, default_value = "----")]
    separator: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit(args) => smart(args, false),
        Commands::Run(args) => smart(args, true),
        Commands::Status(args) => status(args),
        Commands::Render(args) => render(args),
        Commands::Templates => {
            for name in templates::builtin_names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn smart(args: SubmitArgs, live: bool) -> Result<()> {
    let mut job = open_job(&args.job)?.with_script(args.resources.script.clone());
    job = job.with_options(JobOptions {
        memory: args.resources.mem,
        cpus: args.resources.cpus,
        time: args.resources.time.clone(),
        partition: args.resources.partition.clone(),
        job_name: args.resources.job_name.clone(),
    });

    let pairs = args
        .resources
        .custom
        .iter()
        .map(|kv| split_key_value(kv))
        .collect::<Result<Vec<(&str, &str)>>>()?;
    let flags: Vec<&str> = args.resources.flags.iter().map(|f| f.as_str()).collect();
    if !pairs.is_empty() || !flags.is_empty() {
        job.set_custom_options(&flags, &pairs, !args.resources.short_options);
    }

    let check = check_options(&args.check);
    let assessment = if live {
        job.smart_run(&check, args.dry_run)
    } else {
        job.smart_submit(&check, args.dry_run)
    }
    .with_context(|| format!("Can't process job {}", args.job.input.display()))?;

    report(&job, assessment);
    Ok(())
}

fn status(args: StatusArgs) -> Result<()> {
    let mut job = open_job(&args.job)?;
    let assessment = job
        .assess(&check_options(&args.check))
        .with_context(|| format!("Can't check job {}", args.job.input.display()))?;
    report(&job, assessment);
    Ok(())
}

fn render(args: RenderArgs) -> Result<()> {
    let template = match templates::builtin(&args.template) {
        Some(template) => template.to_string(),
        None => fs::read_to_string(&args.template)
            .with_context(|| format!("{} is neither a built-in template nor a readable file", args.template))?,
    };

    let mut vars = Map::new();
    if let Some(dir) = &args.eleconfig_dir {
        let path = find_eleconfig(dir)?;
        for (key, value) in read_eleconfig(&path)? {
            vars.insert(key, Value::from(value));
        }
    }
    if let Some(path) = &args.fragments {
        for (name, text) in read_fragments(path, &args.separator)?.rendered() {
            vars.insert(fragment_key(&name), Value::String(text));
        }
    }
    for kv in &args.set {
        let (key, value) = split_key_value(kv)?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        vars.insert(key.to_string(), value);
    }

    let input = Input::from_template(&template, &args.output, &vars)
        .with_context(|| format!("Can't render {}", args.template))?;
    info!("Rendered {} into {}", args.template, input.filepath.display());
    Ok(())
}

fn open_job(args: &JobArgs) -> Result<Job> {
    let input = Input::from_file(&args.input)?;
    Ok(Job::new(input, scheduler_for(args.scheduler), &args.meta_file))
}

fn check_options(args: &CheckArgs) -> CheckOptions {
    CheckOptions {
        out_extension: args.out_extension.clone(),
        success: SuccessCheck::contains(args.success_string.clone()),
        ignore_meta: args.ignore_meta,
    }
}

fn report(job: &Job, assessment: Assessment) {
    let state = match assessment {
        Assessment::Finished => "finished",
        Assessment::Active => "queued",
        Assessment::NeedsSubmission => "needs submission",
    };
    println!(
        "{}: {} [{}]{}",
        display_dir(&job.meta().wdir),
        state,
        meta::display_status(job.status()),
        job.job_id().map(|id| format!(" job {id}")).unwrap_or_default()
    );
}

fn display_dir(dir: &Path) -> String {
    format!("{}/", dir.display())
}

/// Fragment names map onto the placeholders used by the templates
fn fragment_key(name: &str) -> String {
    match name {
        "A" => "frag_a".to_string(),
        "B" => "frag_b".to_string(),
        "AB" => "xyz".to_string(),
        other => format!("xyz_{}", other.to_lowercase()),
    }
}

fn split_key_value(kv: &str) -> Result<(&str, &str)> {
    kv.split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {kv:?}"))
}
