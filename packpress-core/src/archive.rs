//! Archive building: re-packages the normalized content folder.
//!
//! Polymorphic over the output codec. The streamed formats (gz/bz2/xz)
//! build an uncompressed TAR into a temporary file first and compress it
//! into the final output; the temporary file is removed on every exit path
//! by the `NamedTempFile` guard.

use crate::config::CompressFileConfig;
use crate::error::{CoreError, CoreResult};
use crate::temp_files::create_temp_file;
use log::{error, info, warn};
use sevenz_rust::lzma::LZMA2Options;
use sevenz_rust::{AesEncoderOptions, SevenZArchiveEntry, SevenZMethod, SevenZMethodConfiguration};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Supported output codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    SevenZip,
    Zip,
    Tar,
    Gzip,
    Bzip2,
    Xz,
}

impl OutputFormat {
    /// Parses the configured format string. Unknown strings yield `None`;
    /// `build_archive` decides what to do with those.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "7z" => Some(Self::SevenZip),
            "zip" => Some(Self::Zip),
            "tar" => Some(Self::Tar),
            "gz" | "gzip" => Some(Self::Gzip),
            "bz2" | "bzip2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::SevenZip => "7z",
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::Gzip => "tar.gz",
            Self::Bzip2 => "tar.bz2",
            Self::Xz => "tar.xz",
        }
    }
}

/// File extension for the configured format string. Unknown formats map to
/// the seven-zip default, matching the fallback in `build_archive`.
pub fn output_extension(format: &str) -> &'static str {
    OutputFormat::parse(format).map_or("7z", OutputFormat::extension)
}

/// Builds an archive of the direct children of `folder` at `output_path`.
///
/// An unknown format string logs the error, builds the seven-zip default at
/// the requested path, and still returns `UnsupportedOutputFormat`. The
/// output exists even though the call reports failure; callers relying on
/// the file must treat this error as "fell back to 7z".
pub fn build_archive(
    folder: &Path,
    output_path: &Path,
    config: &CompressFileConfig,
) -> CoreResult<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let format = match OutputFormat::parse(&config.format) {
        Some(format) => format,
        None => {
            error!(
                "unsupported archive format '{}', falling back to 7z",
                config.format
            );
            build_7z(folder, output_path, config)?;
            return Err(CoreError::UnsupportedOutputFormat(config.format.clone()));
        }
    };

    match format {
        OutputFormat::SevenZip => build_7z(folder, output_path, config)?,
        OutputFormat::Zip => build_zip(folder, output_path, config)?,
        OutputFormat::Tar => {
            let writer = File::create(output_path)?;
            write_tar(folder, writer)?;
        }
        OutputFormat::Gzip | OutputFormat::Bzip2 | OutputFormat::Xz => {
            build_streamed(folder, output_path, config, format)?;
        }
    }

    info!(
        "built {:?} archive '{}' (level {}, method {})",
        format,
        output_path.display(),
        config.compression_level,
        config.method
    );
    Ok(())
}

fn build_7z(folder: &Path, output_path: &Path, config: &CompressFileConfig) -> CoreResult<()> {
    let mut writer = sevenz_rust::SevenZWriter::create(output_path)
        .map_err(|e| CoreError::Build(e.to_string()))?;

    let mut methods: Vec<SevenZMethodConfiguration> = Vec::new();
    if let Some(password) = nonblank(&config.password) {
        methods.push(AesEncoderOptions::new(password.into()).into());
    }
    methods.push(sevenz_method(&config.method, config.compression_level));
    writer.set_content_methods(methods);

    // Each file is pushed under its bare name so the entry names are
    // independent of where the content folder happens to live.
    for path in list_files(folder)? {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::Build(format!("non-UTF8 file name: {}", path.display())))?;
        let entry = SevenZArchiveEntry::from_path(&path, name.to_string());
        writer
            .push_archive_entry(entry, Some(File::open(&path)?))
            .map_err(|e| CoreError::Build(e.to_string()))?;
    }
    writer
        .finish()
        .map_err(|e| CoreError::Build(e.to_string()))?;
    Ok(())
}

/// Maps the configured 7z method name to a sevenz content method. Unknown
/// method names fall back to LZMA2 at the configured level.
fn sevenz_method(method: &str, level: u32) -> SevenZMethodConfiguration {
    match method.to_lowercase().as_str() {
        "lzma" => SevenZMethodConfiguration::new(SevenZMethod::LZMA),
        "bzip2" => SevenZMethodConfiguration::new(SevenZMethod::BZIP2),
        "deflate" => SevenZMethodConfiguration::new(SevenZMethod::DEFLATE),
        "copy" => SevenZMethodConfiguration::new(SevenZMethod::COPY),
        _ => LZMA2Options::with_preset(level).into(),
    }
}

fn build_zip(folder: &Path, output_path: &Path, config: &CompressFileConfig) -> CoreResult<()> {
    let file = File::create(output_path)?;
    let mut writer = zip::ZipWriter::new(file);

    // Compression-level values select the method: 0 stored, 1 deflate,
    // 2 bzip2, anything else deflate. Level 3 nominally means lzma, but
    // the zip writer cannot produce LZMA streams, so it deflates instead
    // (the same fallback the 7z builder uses for unknown methods).
    let method = match config.compression_level {
        0 => CompressionMethod::Stored,
        1 => CompressionMethod::Deflated,
        2 => CompressionMethod::Bzip2,
        3 => {
            warn!("zip output does not support lzma (level 3), using deflate");
            CompressionMethod::Deflated
        }
        _ => CompressionMethod::Deflated,
    };
    let mut options = SimpleFileOptions::default().compression_method(method);
    if let Some(password) = nonblank(&config.password) {
        options = options.with_aes_encryption(zip::AesMode::Aes256, password);
    }

    for path in list_files(folder)? {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::Build(format!("non-UTF8 file name: {}", path.display())))?;
        writer
            .start_file(name, options)
            .map_err(|e| CoreError::Build(e.to_string()))?;
        io::copy(&mut File::open(&path)?, &mut writer)?;
    }
    writer
        .finish()
        .map_err(|e| CoreError::Build(e.to_string()))?;
    Ok(())
}

/// Writes an uncompressed TAR of the folder's direct children.
fn write_tar<W: io::Write>(folder: &Path, writer: W) -> CoreResult<W> {
    let mut builder = tar::Builder::new(writer);
    for path in list_files(folder)? {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::Build(format!("non-UTF8 file name: {}", path.display())))?;
        builder.append_path_with_name(&path, name)?;
    }
    Ok(builder.into_inner()?)
}

fn build_streamed(
    folder: &Path,
    output_path: &Path,
    config: &CompressFileConfig,
    format: OutputFormat,
) -> CoreResult<()> {
    let temp_dir = output_path.parent().unwrap_or_else(|| Path::new("."));
    let temp_tar = create_temp_file(temp_dir, "packpress", "tar")?;

    write_tar(folder, temp_tar.reopen()?)?;

    let mut reader = temp_tar.reopen()?;
    let output = File::create(output_path)?;
    let level = config.compression_level;
    match format {
        OutputFormat::Gzip => {
            let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::new(level.min(9)));
            io::copy(&mut reader, &mut encoder)?;
            encoder.finish()?;
        }
        OutputFormat::Bzip2 => {
            let mut encoder = bzip2::write::BzEncoder::new(output, bzip2::Compression::new(level.clamp(1, 9)));
            io::copy(&mut reader, &mut encoder)?;
            encoder.finish()?;
        }
        OutputFormat::Xz => {
            let mut encoder = xz2::write::XzEncoder::new(output, level.min(9));
            io::copy(&mut reader, &mut encoder)?;
            encoder.finish()?;
        }
        _ => unreachable!("build_streamed called for non-streamed format"),
    }

    Ok(())
}

/// Direct-child files of the folder, sorted for reproducible entry order.
fn list_files(folder: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            path.is_file().then_some(path)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn nonblank(password: &Option<String>) -> Option<&str> {
    password.as_deref().map(str::trim).filter(|p| !p.is_empty())
}
