//! Core library for the packpress archive normalization and publishing
//! pipeline.
//!
//! The pipeline scans a source directory for archives, dispatches them to
//! a bounded worker pool and runs each through a fixed stage sequence:
//! extraction with password cascading, content normalization, cleanup and
//! sequential renaming, image recompression, re-archiving, retried upload
//! and post submission. Failures are isolated per job and every job's
//! temporary directory is removed on all exit paths.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use packpress_core::{Config, UploadClient, run_pipeline};
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("config.toml")).unwrap();
//! config.validate().unwrap();
//!
//! let client = UploadClient::new(&config).unwrap();
//! let reports = run_pipeline(&config, &client).unwrap();
//! for report in reports {
//!     println!("{}: {}", report.archive, report.state);
//! }
//! ```

pub mod archive;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod images;
pub mod normalize;
pub mod post;
pub mod processing;
pub mod temp_files;
pub mod upload;

// Re-exports for public API
pub use archive::{build_archive, output_extension, OutputFormat};
pub use config::Config;
pub use discovery::find_archives;
pub use error::{CoreError, CoreResult};
pub use extract::{extract_archive, ArchiveFormat};
pub use normalize::format_name;
pub use post::PostRequest;
pub use processing::{run_pipeline, JobReport, JobState};
pub use temp_files::JobWorkspace;
pub use upload::{RetryPolicy, UploadClient, UploadedAsset};
