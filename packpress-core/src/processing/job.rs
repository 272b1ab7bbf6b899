//! Per-job state machine.
//!
//! Each job runs a single forward pass through its stages; there are no
//! retries at the job level (upload-internal retries are separate). A
//! failure in any stage moves the job to Failed and skips the rest. The
//! temporary working directory is removed on every exit path by the
//! `JobWorkspace` guard.

use crate::archive::{build_archive, output_extension};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::extract::extract_archive;
use crate::images::recompress_images;
use crate::normalize::{clean_files, detect_content_folder, format_name, rename_files, DeleteRules};
use crate::post::PostRequest;
use crate::temp_files::JobWorkspace;
use crate::upload::UploadClient;
use log::{debug, error, info};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stages of a job's life, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Extracting,
    Normalizing,
    Cleaning,
    Renaming,
    Recompressing,
    Archiving,
    Uploading,
    Submitting,
    Completed,
    /// Benign early terminal: extraction produced nothing to process.
    Skipped,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Extracting => "extracting",
            Self::Normalizing => "normalizing",
            Self::Cleaning => "cleaning",
            Self::Renaming => "renaming",
            Self::Recompressing => "recompressing",
            Self::Archiving => "archiving",
            Self::Uploading => "uploading",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One source archive's end-to-end processing unit, exclusively owned by
/// the worker running it.
#[derive(Debug)]
pub struct ArchiveJob {
    pub source_path: PathBuf,
    pub temp_dir: Option<PathBuf>,
    pub content_folder: Option<PathBuf>,
    pub formatted_name: Option<String>,
    pub state: JobState,
}

impl ArchiveJob {
    fn new(source_path: &Path) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            temp_dir: None,
            content_folder: None,
            formatted_name: None,
            state: JobState::Queued,
        }
    }

    fn advance(&mut self, state: JobState) {
        debug!(
            "job '{}': {} -> {state}",
            self.source_path.display(),
            self.state
        );
        self.state = state;
    }
}

/// Outcome of one job, collected by the worker pool.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub archive: String,
    pub state: JobState,
    pub formatted_name: Option<String>,
    pub uploaded: usize,
    pub submitted: bool,
    pub error: Option<String>,
}

/// Runs one archive through the full stage sequence. Never panics or
/// propagates errors: every failure is folded into the returned report so
/// the worker can move on to the next job.
pub fn process_job(
    config: &Config,
    client: &UploadClient,
    rules: &DeleteRules,
    source_path: &Path,
) -> JobReport {
    let archive = source_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<invalid>")
        .to_string();

    let mut job = ArchiveJob::new(source_path);
    match run_stages(config, client, rules, &mut job) {
        Ok(report) => report,
        Err(e) => {
            error!("job '{archive}' failed while {}: {e}", job.state);
            job.advance(JobState::Failed);
            JobReport {
                archive,
                state: JobState::Failed,
                formatted_name: job.formatted_name.clone(),
                uploaded: 0,
                submitted: false,
                error: Some(e.to_string()),
            }
        }
    }
}

fn run_stages(
    config: &Config,
    client: &UploadClient,
    rules: &DeleteRules,
    job: &mut ArchiveJob,
) -> CoreResult<JobReport> {
    let archive = job
        .source_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<invalid>")
        .to_string();
    let stem = job
        .source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("archive")
        .to_string();

    job.advance(JobState::Extracting);
    let workspace = JobWorkspace::create(&config.temp.directory, &stem)?;
    job.temp_dir = Some(workspace.path().to_path_buf());
    extract_archive(&job.source_path, workspace.path(), &config.unpack.password)?;

    job.advance(JobState::Normalizing);
    let Some(content) = detect_content_folder(workspace.path())? else {
        info!("'{archive}': no content folder and no images, skipping");
        job.advance(JobState::Skipped);
        return Ok(JobReport {
            archive,
            state: JobState::Skipped,
            formatted_name: None,
            uploaded: 0,
            submitted: false,
            error: None,
        });
    };

    let mut formatted = format_name(&stem);
    if formatted.is_empty() {
        // A name made only of size tags and brackets formats to nothing;
        // keep the raw stem rather than producing unnamed output.
        formatted = stem.clone();
    }

    // Give the payload folder its canonical name unless the extraction
    // root itself is the payload.
    let content = if content != workspace.path() {
        let target = workspace.path().join(&formatted);
        if target != content {
            std::fs::rename(&content, &target)?;
        }
        target
    } else {
        content
    };
    job.content_folder = Some(content.clone());
    job.formatted_name = Some(formatted.clone());

    job.advance(JobState::Cleaning);
    clean_files(&content, rules)?;

    job.advance(JobState::Renaming);
    rename_files(&content, &config.file_name.prefix)?;

    job.advance(JobState::Recompressing);
    recompress_images(&content, &config.compress_img)?;

    job.advance(JobState::Archiving);
    let extension = output_extension(&config.compress_file.format);
    let output_path = config
        .output
        .directory
        .join(format!("{formatted}.{extension}"));
    build_archive(&content, &output_path, &config.compress_file)?;

    job.advance(JobState::Uploading);
    let assets = client.upload_files(&content, config.worker.upload)?;
    let urls: Vec<String> = assets.iter().map(|a| a.url.clone()).collect();

    let mut submitted = false;
    if !urls.is_empty() {
        job.advance(JobState::Submitting);
        let post = PostRequest::new(&formatted, &urls);
        let (ok, _body) = client.submit_post(&post);
        if !ok {
            return Err(CoreError::Upload(format!(
                "post submission failed for '{formatted}'"
            )));
        }
        submitted = true;
    }

    job.advance(JobState::Completed);
    info!("'{archive}' completed ({} files uploaded)", urls.len());
    Ok(JobReport {
        archive,
        state: JobState::Completed,
        formatted_name: Some(formatted),
        uploaded: urls.len(),
        submitted,
        error: None,
    })
}
