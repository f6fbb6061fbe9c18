//! Submit quantum chemistry jobs to SLURM or PBS and keep track of which ones are done
//!
//! A job lives in its own working directory next to its input file. A small JSON record in that
//! directory remembers the last submission, so running the same submission script twice only
//! resubmits jobs that are neither finished nor still queued.

/// Input files written directly or rendered from templates
pub mod input;
/// Built-in input templates and default values
pub mod templates;
/// Persisted job state
pub mod meta;
/// SLURM and PBS adapters
pub mod scheduler;
/// The job lifecycle: assess, submit, run
pub mod job;
/// Output, electronic configuration and fragment file helpers
pub mod discover;
