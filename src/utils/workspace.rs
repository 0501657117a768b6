//! Project directory layout: where each phase reads and writes its artifacts.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::utils::config::{OutputNames, PackagePaths};

/// Directory listing outputs.
#[derive(Clone, Debug)]
pub struct ListingPaths {
    pub dirs: PathBuf,
    pub files: PathBuf,
    pub errors: PathBuf,
}

/// Skeleton outputs: created target directories and the error log.
#[derive(Clone, Debug)]
pub struct SkeletonPaths {
    pub created: PathBuf,
    pub errors: PathBuf,
}

#[derive(Clone, Debug)]
pub struct SlicePaths {
    pub batches_dir: PathBuf,
    pub errors: PathBuf,
}

#[derive(Clone, Debug)]
pub struct CopyPaths {
    pub backup_log: PathBuf,
    pub errors: PathBuf,
}

/// A project directory plus the stamp of the current run.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
    stamp: String,
}

impl Workspace {
    /// Open (creating if needed) the project directory, stamped with the local time.
    pub fn open(root: &Path) -> Result<Self> {
        let stamp = Local::now().format(OutputNames::TIMESTAMP_FORMAT).to_string();
        Self::with_stamp(root, &stamp)
    }

    pub fn with_stamp(root: &Path, stamp: &str) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("create project directory {}", root.display()))?;
        Ok(Workspace {
            root: root.to_path_buf(),
            stamp: stamp.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(dir)
    }

    pub fn listing_paths(&self) -> Result<ListingPaths> {
        let dir = self.subdir(OutputNames::LISTING_DIR)?;
        Ok(ListingPaths {
            dirs: dir.join(OutputNames::listing_dirs(&self.stamp)),
            files: dir.join(OutputNames::listing_files(&self.stamp)),
            errors: dir.join(OutputNames::listing_errors(&self.stamp)),
        })
    }

    pub fn skeleton_paths(&self) -> Result<SkeletonPaths> {
        let dir = self.subdir(OutputNames::SKELETON_DIR)?;
        Ok(SkeletonPaths {
            created: dir.join(OutputNames::skeleton_dirs(&self.stamp)),
            errors: dir.join(OutputNames::skeleton_errors(&self.stamp)),
        })
    }

    /// Creates both the batches directory and the slice errors directory.
    pub fn slice_paths(&self) -> Result<SlicePaths> {
        let batches_dir = self.subdir(&OutputNames::batches_dir(&self.stamp))?;
        let errors_dir = self.subdir(&OutputNames::batches_errors_dir(&self.stamp))?;
        Ok(SlicePaths {
            batches_dir,
            errors: errors_dir.join(OutputNames::slice_errors(&self.stamp)),
        })
    }

    pub fn copy_paths(&self) -> Result<CopyPaths> {
        let dir = self.subdir(OutputNames::COPY_DIR)?;
        Ok(CopyPaths {
            backup_log: dir.join(OutputNames::backup_log(&self.stamp)),
            errors: dir.join(OutputNames::copy_errors(&self.stamp)),
        })
    }

    /// Append `"<local time> <line>"` to the project's operation log.
    pub fn write_op_log(&self, line: &str) -> Result<()> {
        let path = self.root.join(PackagePaths::get().op_log_filename());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open operation log {}", path.display()))?;
        writeln!(file, "{} {}", Local::now().format("%Y-%m-%d %H:%M:%S"), line)
            .with_context(|| format!("write operation log {}", path.display()))
    }
}
