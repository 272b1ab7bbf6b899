//! Job queue and unpack worker pool.
//!
//! The queue is fully populated before any worker starts; a fixed number
//! of scoped threads pop jobs until it drains, then exit. A failing job is
//! logged through its report and never stops the worker or its siblings.

use crate::config::Config;
use crate::discovery::find_archives;
use crate::error::CoreResult;
use crate::normalize::DeleteRules;
use crate::processing::job::{process_job, JobReport};
use crate::upload::UploadClient;
use log::info;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scans the source directory and processes every discovered archive.
///
/// Blocks until the job queue fully drains; returns one report per job, in
/// completion order (not discovery order when multiple workers run).
pub fn run_pipeline(config: &Config, client: &UploadClient) -> CoreResult<Vec<JobReport>> {
    let rules = DeleteRules::compile(&config.delete)?;

    let files = find_archives(&config.source.directory)?;
    for file in &files {
        info!("found archive: {}", file.display());
    }
    if files.is_empty() {
        info!(
            "no archives found in '{}'",
            config.source.directory.display()
        );
        return Ok(Vec::new());
    }

    let workers = config.worker.unpack.max(1).min(files.len());
    info!("processing {} archives with {workers} workers", files.len());

    let queue = Mutex::new(files.into_iter().collect::<VecDeque<_>>());
    let reports = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let next = queue
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .pop_front();
                let Some(path) = next else { break };

                info!("processing: {}", path.display());
                let report = process_job(config, client, &rules, &path);
                reports
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(report);
            });
        }
    });

    let reports = reports
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    info!("all {} jobs finished", reports.len());
    Ok(reports)
}
