//! Staging of the packer's working directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::platform::VENDOR_DIR;

/// Files copied next to the rewritten entry point when present.
pub const DEFAULT_MANIFEST: &[&str] = &["package.json", "sdk.d.ts", "yoga.wasm"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage_dir: PathBuf,
    pub copied: Vec<String>,
    /// Manifest entries absent from the resource root.
    pub skipped: Vec<String>,
    pub vendor_files: usize,
}

/// Copy the manifest files and the `vendor/` tree from `resource_root` into `stage_dir`.
pub fn stage_build_dir(resource_root: &Path, stage_dir: &Path, manifest: &[String]) -> Result<StageReport> {
    fs::create_dir_all(stage_dir)
        .with_context(|| format!("Failed to create stage directory {}", stage_dir.display()))?;

    let mut report = StageReport {
        stage_dir: stage_dir.to_path_buf(),
        ..Default::default()
    };

    for name in manifest {
        let src = resource_root.join(name);
        if !src.is_file() {
            debug!("skip {}: not present", src.display());
            report.skipped.push(name.clone());
            continue;
        }
        let dest = stage_dir.join(name);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::copy(&src, &dest).with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
        info!("copied {}", name);
        report.copied.push(name.clone());
    }

    let vendor_src = resource_root.join(VENDOR_DIR);
    if vendor_src.is_dir() {
        report.vendor_files = copy_tree(&vendor_src, &stage_dir.join(VENDOR_DIR))?;
        info!("copied {} directory ({} files)", VENDOR_DIR, report.vendor_files);
    }

    Ok(report)
}

/// Recursively copy `src` into `dest`, returning the number of files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("Failed to compute relative path")?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {} to {}", entry.path().display(), target.display()))?;
            files += 1;
        } else {
            warn!("skipping non-regular entry {}", entry.path().display());
        }
    }
    Ok(files)
}
