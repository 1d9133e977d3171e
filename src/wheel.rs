// SPDX-FileCopyrightText: The friendly-dist-manager authors
// SPDX-License-Identifier: MPL-2.0

//! Wheel archives
//!
//! Files are collected into a staging directory first, then the archive is
//! assembled in one pass: the `.dist-info` trio (`WHEEL`, `METADATA`,
//! `RECORD`) is generated next to the staged payload and everything is
//! written into a deflate compressed zip named after the distribution and
//! its tags.

use std::{
    env,
    fs::{self, File},
    io::{self, Read as _},
    path::{Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest as _, Sha256};
use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::metadata::CoreMetadata;

const WHEEL_FORMAT_VERSION: &str = "1.0";

/// Environment override for the staging directory location.
const STAGING_DIR_ENV: &str = "TFC_TEMP_DIR";

/// A failure while assembling a wheel.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The output file is already present.
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    /// A source path without a final component cannot be staged.
    #[error("source path has no file name: {0}")]
    NoFileName(PathBuf),

    /// Reading or writing a file failed.
    #[error("failed to access '{path}'")]
    Io {
        /// The path that could not be accessed.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The zip layer rejected the archive.
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),

    /// Enumerating the staged files failed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

fn io_error(path: &Path, source: io::Error) -> BuildError {
    BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug)]
enum Staging {
    Temp(TempDir),
    Pinned(PathBuf),
}

impl Staging {
    fn resolve() -> Result<Self, BuildError> {
        if let Some(pinned) = env::var_os(STAGING_DIR_ENV) {
            let pinned = PathBuf::from(pinned);
            if !pinned.exists() {
                fs::create_dir_all(&pinned).map_err(|source| io_error(&pinned, source))?;
            }
            return Ok(Self::Pinned(pinned));
        }
        let temp = TempDir::new().map_err(|source| io_error(Path::new("."), source))?;
        Ok(Self::Temp(temp))
    }

    fn dir(&self) -> &Path {
        match self {
            Self::Temp(temp) => temp.path(),
            Self::Pinned(pinned) => pinned,
        }
    }
}

/// Builder for one wheel archive.
#[derive(Debug)]
pub struct WheelBuilder {
    dist_name: String,
    dist_version: String,
    python_tag: String,
    abi_tag: String,
    platform_tag: String,
    build_tag: Option<String>,
    metadata: CoreMetadata,
    staging: Staging,
}

impl WheelBuilder {
    /// Create a builder for a pure, platform independent distribution.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the staging directory cannot be set up.
    pub fn new(
        dist_name: impl Into<String>,
        dist_version: impl Into<String>,
    ) -> Result<Self, BuildError> {
        let dist_name = dist_name.into();
        let dist_version = dist_version.into();
        let metadata = CoreMetadata::new(dist_name.clone(), dist_version.clone());
        Ok(Self {
            dist_name,
            dist_version,
            python_tag: "py3".to_owned(),
            abi_tag: "none".to_owned(),
            platform_tag: "any".to_owned(),
            build_tag: None,
            metadata,
            staging: Staging::resolve()?,
        })
    }

    /// Attach an optional build tag to the archive name.
    #[must_use]
    pub fn with_build_tag(mut self, build_tag: impl Into<String>) -> Self {
        self.build_tag = Some(build_tag.into());
        self
    }

    /// The metadata document shipped inside the archive.
    #[must_use]
    pub fn metadata(&self) -> &CoreMetadata {
        &self.metadata
    }

    /// Mutable access to the metadata document for enrichment.
    pub fn metadata_mut(&mut self) -> &mut CoreMetadata {
        &mut self.metadata
    }

    /// Directory where package data is staged before archiving.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        self.staging.dir()
    }

    /// The fully qualified file name of the archive to be generated.
    #[must_use]
    pub fn filename(&self) -> String {
        let Self {
            dist_name,
            dist_version,
            python_tag,
            abi_tag,
            platform_tag,
            build_tag,
            ..
        } = self;
        match build_tag {
            Some(build_tag) => format!(
                "{dist_name}-{dist_version}-{build_tag}-{python_tag}-{abi_tag}-{platform_tag}.whl"
            ),
            None => {
                format!("{dist_name}-{dist_version}-{python_tag}-{abi_tag}-{platform_tag}.whl")
            }
        }
    }

    /// Stage a file for packaging.
    ///
    /// `target_path` is the location, relative to the archive root, where
    /// the file should end up.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the file cannot be copied into the
    /// staging directory.
    pub fn add_file(&self, src_file: &Path, target_path: &Path) -> Result<(), BuildError> {
        debug!(
            src = %src_file.display(),
            target = %target_path.display(),
            "staging file"
        );
        let file_name = src_file
            .file_name()
            .ok_or_else(|| BuildError::NoFileName(src_file.to_path_buf()))?;
        let target_dir = self.staging.dir().join(target_path);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(|source| io_error(&target_dir, source))?;
        }
        let target_file = target_dir.join(file_name);
        fs::copy(src_file, &target_file).map_err(|source| io_error(src_file, source))?;
        Ok(())
    }

    fn dist_info_dir_name(&self) -> String {
        format!(
            "{name}-{version}.dist-info",
            name = self.dist_name,
            version = self.dist_version
        )
    }

    fn write_dist_info(&self) -> Result<(), BuildError> {
        let info_dir = self.staging.dir().join(self.dist_info_dir_name());
        fs::create_dir_all(&info_dir).map_err(|source| io_error(&info_dir, source))?;

        let wheel_file = info_dir.join("WHEEL");
        let wheel_data = [
            format!("Wheel-Version: {WHEEL_FORMAT_VERSION}"),
            format!(
                "Generator: friendly_dist_manager ({})",
                env!("CARGO_PKG_VERSION")
            ),
            "Root-Is-Purelib: true".to_owned(),
            format!(
                "Tag: {python}-{abi}-{platform}",
                python = self.python_tag,
                abi = self.abi_tag,
                platform = self.platform_tag
            ),
        ]
        .join("\n");
        fs::write(&wheel_file, wheel_data).map_err(|source| io_error(&wheel_file, source))?;

        let meta_file = info_dir.join("METADATA");
        fs::write(&meta_file, self.metadata.render())
            .map_err(|source| io_error(&meta_file, source))?;

        // The RECORD must index itself, without digest and size fields, so
        // it is written only after every other staged file is accounted for.
        let record_file = info_dir.join("RECORD");
        let mut record_data = String::new();
        for staged in staged_files(self.staging.dir()) {
            let staged = staged?;
            let rel_path = archive_path(self.staging.dir(), staged.path());
            let digest = urlsafe_sha256(staged.path())?;
            let size = staged.metadata()?.len();
            record_data.push_str(&format!("{rel_path},sha256={digest},{size}\n"));
        }
        let rel_record = archive_path(self.staging.dir(), &record_file);
        record_data.push_str(&format!("{rel_record},,\n"));
        fs::write(&record_file, record_data).map_err(|source| io_error(&record_file, source))?;
        Ok(())
    }

    /// Assemble the archive in the given output directory.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::AlreadyExists`] if the output file is already
    /// present, and other [`BuildError`] variants for I/O and archiving
    /// failures.
    pub fn build(&self, output_path: &Path) -> Result<PathBuf, BuildError> {
        let output_file = output_path.join(self.filename());
        if output_file.exists() {
            return Err(BuildError::AlreadyExists(output_file));
        }

        self.write_dist_info()?;

        let file = File::create(&output_file).map_err(|source| io_error(&output_file, source))?;
        let mut archive = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for staged in staged_files(self.staging.dir()) {
            let staged = staged?;
            let rel_path = archive_path(self.staging.dir(), staged.path());
            archive.start_file(rel_path, options)?;
            let mut src =
                File::open(staged.path()).map_err(|source| io_error(staged.path(), source))?;
            io::copy(&mut src, &mut archive)
                .map_err(|source| io_error(staged.path(), source))?;
        }
        archive.finish()?;
        Ok(output_file)
    }
}

fn staged_files(
    staging_dir: &Path,
) -> impl Iterator<Item = Result<walkdir::DirEntry, walkdir::Error>> {
    WalkDir::new(staging_dir)
        .sort_by_file_name()
        .into_iter()
        .filter(|entry| match entry {
            Ok(entry) => entry.file_type().is_file(),
            Err(_) => true,
        })
}

/// Relative archive path with forward slash separators.
fn archive_path(staging_dir: &Path, file_path: &Path) -> String {
    let rel_path = file_path.strip_prefix(staging_dir).unwrap_or(file_path);
    let components: Vec<_> = rel_path
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect();
    components.join("/")
}

fn urlsafe_sha256(file_path: &Path) -> Result<String, BuildError> {
    let mut src = File::open(file_path).map_err(|source| io_error(file_path, source))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8 * 1024];
    loop {
        let read = src
            .read(&mut buffer)
            .map_err(|source| io_error(file_path, source))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use super::*;

    fn read_archive_entry(wheel: &Path, entry: &str) -> String {
        let file = File::open(wheel).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut content = String::new();
        archive
            .by_name(entry)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    fn archive_names(wheel: &Path) -> Vec<String> {
        let file = File::open(wheel).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        archive.file_names().map(ToOwned::to_owned).collect()
    }

    #[test]
    fn filename_carries_name_version_and_tags() {
        let builder = WheelBuilder::new("MyDist", "1.2.3").unwrap();
        let filename = builder.filename();
        assert!(filename.contains("MyDist"));
        assert!(filename.contains("1.2.3"));
        assert!(filename.ends_with(".whl"));
        assert_eq!("MyDist-1.2.3-py3-none-any.whl", filename);
    }

    #[test]
    fn filename_with_build_tag() {
        let builder = WheelBuilder::new("MyDist", "1.2.3")
            .unwrap()
            .with_build_tag("1");
        assert_eq!("MyDist-1.2.3-1-py3-none-any.whl", builder.filename());
    }

    #[test]
    fn should_refuse_to_overwrite_existing_output() {
        let out_dir = tempfile::tempdir().unwrap();
        let builder = WheelBuilder::new("MyDist", "1.2.3").unwrap();
        fs::write(out_dir.path().join(builder.filename()), "").unwrap();
        assert!(matches!(
            builder.build(out_dir.path()),
            Err(BuildError::AlreadyExists(_))
        ));
    }

    #[test]
    fn empty_package_contains_dist_info_trio() {
        let out_dir = tempfile::tempdir().unwrap();
        let builder = WheelBuilder::new("MyDist", "1.2.3").unwrap();
        let wheel = builder.build(out_dir.path()).unwrap();
        let names = archive_names(&wheel);
        assert_eq!(3, names.len());
        assert!(names.contains(&"MyDist-1.2.3.dist-info/METADATA".to_owned()));
        assert!(names.contains(&"MyDist-1.2.3.dist-info/RECORD".to_owned()));
        assert!(names.contains(&"MyDist-1.2.3.dist-info/WHEEL".to_owned()));
    }

    #[test]
    fn added_files_end_up_in_the_archive() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let ver_file = src_dir.path().join("version.py");
        fs::write(&ver_file, "__version__='1.0.0'").unwrap();

        let builder = WheelBuilder::new("MyDist", "1.2.3").unwrap();
        builder.add_file(&ver_file, Path::new("")).unwrap();
        let wheel = builder.build(out_dir.path()).unwrap();
        assert!(archive_names(&wheel).contains(&"version.py".to_owned()));
    }

    #[test]
    fn nested_target_paths_are_preserved() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let src_file = src_dir.path().join("core.py");
        fs::write(&src_file, "pass").unwrap();

        let builder = WheelBuilder::new("MyDist", "1.2.3").unwrap();
        builder
            .add_file(&src_file, Path::new("mydist/internals"))
            .unwrap();
        let wheel = builder.build(out_dir.path()).unwrap();
        assert!(archive_names(&wheel).contains(&"mydist/internals/core.py".to_owned()));
    }

    #[test]
    fn wheel_file_declares_format_and_tag() {
        let out_dir = tempfile::tempdir().unwrap();
        let builder = WheelBuilder::new("MyDist", "1.2.3").unwrap();
        let wheel = builder.build(out_dir.path()).unwrap();
        let content = read_archive_entry(&wheel, "MyDist-1.2.3.dist-info/WHEEL");
        let lines: Vec<_> = content.lines().collect();
        assert_eq!("Wheel-Version: 1.0", lines[0]);
        assert!(lines[1].starts_with("Generator: friendly_dist_manager ("));
        assert_eq!("Root-Is-Purelib: true", lines[2]);
        assert_eq!("Tag: py3-none-any", lines[3]);
    }

    #[test]
    fn metadata_document_is_rendered_into_the_archive() {
        let out_dir = tempfile::tempdir().unwrap();
        let mut builder = WheelBuilder::new("MyDist", "1.2.3").unwrap();
        builder.metadata_mut().summary = Some("A test distribution".to_owned());
        let wheel = builder.build(out_dir.path()).unwrap();
        let content = read_archive_entry(&wheel, "MyDist-1.2.3.dist-info/METADATA");
        assert!(content.starts_with("Metadata-Version: 2.2\nName: MyDist\nVersion: 1.2.3"));
        assert!(content.contains("Summary: A test distribution"));
    }

    #[test]
    fn record_indexes_every_file_and_lists_itself_last() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let payload = "__version__='1.0.0'";
        let ver_file = src_dir.path().join("version.py");
        fs::write(&ver_file, payload).unwrap();

        let builder = WheelBuilder::new("MyDist", "1.2.3").unwrap();
        builder.add_file(&ver_file, Path::new("")).unwrap();
        let wheel = builder.build(out_dir.path()).unwrap();
        let record = read_archive_entry(&wheel, "MyDist-1.2.3.dist-info/RECORD");
        let lines: Vec<_> = record.lines().collect();
        assert_eq!(4, lines.len());
        assert_eq!("MyDist-1.2.3.dist-info/RECORD,,", *lines.last().unwrap());

        let expected_digest = URL_SAFE_NO_PAD.encode(Sha256::digest(payload.as_bytes()));
        let version_row = lines
            .iter()
            .find(|line| line.starts_with("version.py,"))
            .unwrap();
        assert_eq!(
            format!("version.py,sha256={expected_digest},{}", payload.len()),
            *version_row
        );
    }
}
