//! Configuration structures for the packpress-core library.
//!
//! The configuration is loaded once from a TOML file, validated, and passed
//! by reference to every component. Nothing mutates it after load.

use crate::error::{CoreError, CoreResult};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default rename prefix applied during the rename stage.
pub const DEFAULT_FILE_PREFIX: &str = "fantwo";

/// Default output image format for the recompression stage.
pub const DEFAULT_IMAGE_FORMAT: &str = "webp";

/// Default output image quality (1-100).
pub const DEFAULT_IMAGE_QUALITY: u8 = 80;

/// Default maximum long-edge size in pixels. Zero disables downscaling.
pub const DEFAULT_LONG_WIDTH: u32 = 1280;

/// Default archive output format.
pub const DEFAULT_ARCHIVE_FORMAT: &str = "7z";

/// Default 7z compression method.
pub const DEFAULT_ARCHIVE_METHOD: &str = "lzma2";

/// Default archive compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 5;

/// Authentication fields sent as request headers. All are required and
/// must be non-blank; `UploadClient::new` enforces this.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token: String,
    pub did: String,
    pub d_name: String,
    pub d_type: String,
}

/// Endpoint URLs for upload and post creation.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlConfig {
    pub upload: String,
    pub create: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_dir")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TempConfig {
    #[serde(default = "default_temp_dir")]
    pub directory: PathBuf,
}

/// Password candidates for extraction, tried in listed order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnpackConfig {
    #[serde(default)]
    pub password: Vec<String>,
}

/// Deletion rules applied during the cleanup stage. Each entry is a regex;
/// `prefix` patterns match at the start of the file name, `suffix` patterns
/// at the end, and `extra` patterns must match the whole file stem.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteConfig {
    #[serde(default)]
    pub prefix: Vec<String>,
    #[serde(default)]
    pub suffix: Vec<String>,
    #[serde(default)]
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileNameConfig {
    #[serde(default = "default_file_prefix")]
    pub prefix: String,
}

/// Image recompression settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompressImgConfig {
    #[serde(default = "default_image_format")]
    pub format: String,
    #[serde(default = "default_image_quality")]
    pub quality: u8,
    /// Maximum long-edge size in pixels; images are never upscaled.
    #[serde(default = "default_long_width")]
    pub long_width: u32,
}

/// Archive build settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompressFileConfig {
    #[serde(default = "default_archive_format")]
    pub format: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    #[serde(default = "default_archive_method")]
    pub method: String,
}

/// Worker pool sizes: `unpack` drains the job queue, `upload` parallelizes
/// file uploads within a single job.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_count")]
    pub unpack: usize,
    #[serde(default = "default_worker_count")]
    pub upload: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_logger_name")]
    pub name: String,
    /// Optional log file path. When absent, logging is console-only.
    #[serde(default)]
    pub file_name: Option<PathBuf>,
}

/// Main configuration structure for the packpress-core library.
///
/// Typically created by the CLI from a TOML file and passed to
/// `run_pipeline`. An immutable snapshot: components borrow it, none of
/// them write to it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    pub url: UrlConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub temp: TempConfig,
    #[serde(default)]
    pub unpack: UnpackConfig,
    #[serde(default)]
    pub delete: DeleteConfig,
    #[serde(default)]
    pub file_name: FileNameConfig,
    #[serde(default)]
    pub compress_img: CompressImgConfig,
    #[serde(default)]
    pub compress_file: CompressFileConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("./archives")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_file_prefix() -> String {
    DEFAULT_FILE_PREFIX.to_string()
}

fn default_image_format() -> String {
    DEFAULT_IMAGE_FORMAT.to_string()
}

fn default_image_quality() -> u8 {
    DEFAULT_IMAGE_QUALITY
}

fn default_long_width() -> u32 {
    DEFAULT_LONG_WIDTH
}

fn default_archive_format() -> String {
    DEFAULT_ARCHIVE_FORMAT.to_string()
}

fn default_archive_method() -> String {
    DEFAULT_ARCHIVE_METHOD.to_string()
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_worker_count() -> usize {
    1
}

fn default_logger_name() -> String {
    "packpress".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: default_source_dir(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

impl Default for TempConfig {
    fn default() -> Self {
        Self {
            directory: default_temp_dir(),
        }
    }
}

impl Default for FileNameConfig {
    fn default() -> Self {
        Self {
            prefix: default_file_prefix(),
        }
    }
}

impl Default for CompressImgConfig {
    fn default() -> Self {
        Self {
            format: default_image_format(),
            quality: default_image_quality(),
            long_width: default_long_width(),
        }
    }
}

impl Default for CompressFileConfig {
    fn default() -> Self {
        Self {
            format: default_archive_format(),
            password: None,
            compression_level: default_compression_level(),
            method: default_archive_method(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            unpack: default_worker_count(),
            upload: default_worker_count(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: default_logger_name(),
            file_name: None,
        }
    }
}

impl Config {
    /// Loads and parses a TOML configuration file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read config file '{}': {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("cannot parse config file: {e}")))
    }

    /// Validates the loaded configuration. Startup-fatal problems are
    /// reported here so no job trips over them mid-run.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.source.directory.is_dir() {
            return Err(CoreError::Config(format!(
                "source directory '{}' does not exist",
                self.source.directory.display()
            )));
        }
        if self.worker.unpack == 0 || self.worker.upload == 0 {
            return Err(CoreError::Config(
                "worker counts must be at least 1".to_string(),
            ));
        }
        if self.compress_img.quality == 0 || self.compress_img.quality > 100 {
            return Err(CoreError::Config(format!(
                "image quality must be 1-100, got {}",
                self.compress_img.quality
            )));
        }
        for pattern in self
            .delete
            .prefix
            .iter()
            .chain(&self.delete.suffix)
            .chain(&self.delete.extra)
        {
            Regex::new(pattern).map_err(|e| {
                CoreError::Config(format!("invalid delete rule '{pattern}': {e}"))
            })?;
        }
        Ok(())
    }
}
