//! Copying referenced assets into the destination media root.
//!
//! Three operations realize the destination tree:
//!
//! - [`reset`] empties the media root before a run, keeping only sidecar
//!   metadata files, so nothing from a previous maquette leaks into the next.
//! - [`Materializer::copy_into`] copies one referenced file.
//! - [`mirror`] copies a whole folder, skipping excluded folder names.
//!
//! # Resolution
//!
//! A reference is resolved against the source root in two steps:
//!
//! 1. the exact path, relative to the source root;
//! 2. the [`SourceIndex`] entry for the reference's base name.
//!
//! An unresolved reference is not an error: it is logged, counted, and the
//! copy is skipped. A name shared by several source files resolves to the
//! first one in walk order and is reported as ambiguous.
//!
//! # Idempotence
//!
//! Existing destination files are never overwritten. Re-running on a
//! partially cleared destination therefore keeps what is already there, even
//! when the source has changed since. Such files are detected by comparing
//! SHA-256 digests and reported as stale, but they still win.

use crate::index::SourceIndex;
use crate::paths;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Cannot prepare destination {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where a resolved file lands under the media root.
#[derive(Debug, Clone, Copy)]
pub enum Placement<'a> {
    /// Mirror the source file's folder, minus the `Assets/` and `Media/`
    /// wrappers of the source convention.
    Mirrored,
    /// Directly inside this folder (relative to the media root), file name kept.
    Flat(&'a str),
}

/// How a reference was resolved to a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Exact(PathBuf),
    ByName { path: PathBuf, candidates: usize },
}

impl Resolution {
    pub fn path(&self) -> &Path {
        match self {
            Self::Exact(path) | Self::ByName { path, .. } => path,
        }
    }
}

/// Result of a single [`Materializer::copy_into`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// File copied to `dest`.
    Copied(PathBuf),
    /// `dest` already existed and was kept. `stale` if its content differs
    /// from the resolved source.
    Present { dest: PathBuf, stale: bool },
    /// Dry run: the file would be copied to `dest`.
    Planned(PathBuf),
    /// Neither lookup resolved the reference.
    Missing,
    /// Resolved, but the copy failed (logged).
    Failed,
}

/// A reference resolved by name while several files shared that name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousAsset {
    pub reference: String,
    pub chosen: PathBuf,
    pub candidates: usize,
}

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyStats {
    pub copied: u32,
    pub present: u32,
    pub stale: u32,
    pub planned: u32,
    pub missing: u32,
    pub failed: u32,
    pub ambiguous: u32,
}

impl CopyStats {
    pub fn total(&self) -> u32 {
        self.copied + self.present + self.planned + self.missing + self.failed
    }
}

impl fmt::Display for CopyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.planned > 0 {
            write!(f, "{} to copy", self.planned)?;
        } else {
            write!(f, "{} copied", self.copied)?;
            if self.present > 0 {
                write!(f, ", {} already present", self.present)?;
            }
        }
        if self.stale > 0 {
            write!(f, ", {} stale", self.stale)?;
        }
        if self.missing > 0 {
            write!(f, ", {} missing", self.missing)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.ambiguous > 0 {
            write!(f, ", {} ambiguous", self.ambiguous)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

/// Copies referenced assets for one run.
///
/// Holds the run's [`SourceIndex`] by reference; nothing outlives the run.
pub struct Materializer<'a> {
    source_root: &'a Path,
    media_root: &'a Path,
    index: &'a SourceIndex,
    dry_run: bool,
    stats: CopyStats,
    missing: Vec<String>,
    ambiguous: Vec<AmbiguousAsset>,
}

impl<'a> Materializer<'a> {
    pub fn new(source_root: &'a Path, media_root: &'a Path, index: &'a SourceIndex) -> Self {
        Self {
            source_root,
            media_root,
            index,
            dry_run: false,
            stats: CopyStats::default(),
            missing: Vec::new(),
            ambiguous: Vec::new(),
        }
    }

    /// Resolve and report, but never touch the destination.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn media_root(&self) -> &Path {
        self.media_root
    }

    /// Resolve `reference` to a source file: exact relative path first,
    /// then the index by base name.
    pub fn resolve(&self, reference: &str) -> Option<Resolution> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let unified = reference.replace('\\', "/");
        let exact = if Path::new(&unified).is_absolute() {
            PathBuf::from(&unified)
        } else {
            self.source_root.join(&unified)
        };
        if exact.is_file() {
            return Some(Resolution::Exact(exact));
        }
        self.index.find(&unified).map(|hit| Resolution::ByName {
            path: hit.path.to_path_buf(),
            candidates: hit.candidates,
        })
    }

    /// Copy the file behind `reference` into the media root.
    ///
    /// Never fails: unresolved references and I/O errors are logged, counted
    /// and reported through the returned [`CopyOutcome`].
    pub fn copy_into(&mut self, reference: &str, placement: Placement<'_>) -> CopyOutcome {
        let Some(resolution) = self.resolve(reference) else {
            tracing::warn!("Missing asset: {}", reference);
            self.stats.missing += 1;
            if !self.missing.iter().any(|m| m == reference) {
                self.missing.push(reference.to_string());
            }
            return CopyOutcome::Missing;
        };

        if let Resolution::ByName { path, candidates } = &resolution {
            tracing::debug!("Resolved {} by name -> {}", reference, path.display());
            if *candidates > 1 {
                tracing::warn!(
                    "Ambiguous asset {}: {} files share the name, using {}",
                    reference,
                    candidates,
                    path.display()
                );
                self.stats.ambiguous += 1;
                self.ambiguous.push(AmbiguousAsset {
                    reference: reference.to_string(),
                    chosen: path.clone(),
                    candidates: *candidates,
                });
            }
        }

        let source = resolution.path();
        let dest = self.destination_for(source, placement);

        if dest.exists() {
            let stale = !same_content(source, &dest);
            if stale {
                tracing::warn!(
                    "Keeping existing {} although {} differs",
                    dest.display(),
                    source.display()
                );
                self.stats.stale += 1;
            }
            self.stats.present += 1;
            return CopyOutcome::Present { dest, stale };
        }

        if self.dry_run {
            self.stats.planned += 1;
            return CopyOutcome::Planned(dest);
        }

        match copy_file(source, &dest) {
            Ok(()) => {
                tracing::debug!("Copied {} -> {}", source.display(), dest.display());
                self.stats.copied += 1;
                CopyOutcome::Copied(dest)
            }
            Err(e) => {
                tracing::warn!("Failed to copy {} -> {}: {}", source.display(), dest.display(), e);
                self.stats.failed += 1;
                CopyOutcome::Failed
            }
        }
    }

    /// Destination path of a resolved source file.
    pub fn destination_for(&self, source: &Path, placement: Placement<'_>) -> PathBuf {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match placement {
            Placement::Flat(folder) => self.media_root.join(folder).join(file_name),
            Placement::Mirrored => {
                let relative = match source.strip_prefix(self.source_root) {
                    Ok(rel) => paths::media_relative(&rel.to_string_lossy()),
                    Err(_) => file_name,
                };
                self.media_root.join(relative)
            }
        }
    }

    pub fn stats(&self) -> &CopyStats {
        &self.stats
    }

    /// Consume the materializer, returning its counters and findings.
    pub fn finish(self) -> (CopyStats, Vec<String>, Vec<AmbiguousAsset>) {
        (self.stats, self.missing, self.ambiguous)
    }
}

fn copy_file(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

/// SHA-256 hash of a file's contents, returned as a hex string.
///
/// The file is streamed through the hasher, so videos are never held in
/// memory whole.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Files of different sizes differ without being read.
fn same_content(a: &Path, b: &Path) -> bool {
    let sizes = fs::metadata(a).and_then(|ma| Ok((ma.len(), fs::metadata(b)?.len())));
    match sizes {
        Ok((la, lb)) if la == lb => {}
        _ => return false,
    }
    match (hash_file(a), hash_file(b)) {
        (Ok(ha), Ok(hb)) => ha == hb,
        _ => false,
    }
}

/// Counters for [`reset`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResetStats {
    pub removed_dirs: u32,
    pub removed_files: u32,
    pub kept: u32,
    pub failed: u32,
}

/// Empty `media_root`, creating it if needed.
///
/// Every subdirectory is removed recursively and every top-level file whose
/// extension is not in `keep_extensions` (case-insensitive, no dot) is
/// deleted. Individual failures are logged and counted; only an unusable
/// media root is an error. The reset is not transactional.
pub fn reset(media_root: &Path, keep_extensions: &[String]) -> Result<ResetStats, MaterializeError> {
    let fatal = |source| MaterializeError::Destination {
        path: media_root.to_path_buf(),
        source,
    };
    fs::create_dir_all(media_root).map_err(fatal)?;

    let mut stats = ResetStats::default();
    for entry in fs::read_dir(media_root).map_err(fatal)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry in {}: {}", media_root.display(), e);
                stats.failed += 1;
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            match fs::remove_dir_all(&path) {
                Ok(()) => stats.removed_dirs += 1,
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", path.display(), e);
                    stats.failed += 1;
                }
            }
        } else if has_extension(&path, keep_extensions) {
            stats.kept += 1;
        } else {
            match fs::remove_file(&path) {
                Ok(()) => stats.removed_files += 1,
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", path.display(), e);
                    stats.failed += 1;
                }
            }
        }
    }

    tracing::info!(
        "Cleared {}: {} folders, {} files removed, {} sidecars kept",
        media_root.display(),
        stats.removed_dirs,
        stats.removed_files,
        stats.kept
    );
    Ok(stats)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// Recursively copy `src` into `dst`.
///
/// Subdirectories whose name matches an entry of `excluded`
/// (case-insensitive) are skipped. The check is made at every level, so an
/// excluded name is skipped wherever it appears. Existing destination files
/// are kept. Returns the number of files copied.
///
/// Only an unreadable `src` or an uncreatable `dst` is an error. Below that,
/// a folder that cannot be read or created is logged and skipped, and the
/// rest of the tree is still mirrored.
pub fn mirror(src: &Path, dst: &Path, excluded: &[String]) -> io::Result<u32> {
    fs::create_dir_all(dst)?;
    let entries = sorted_entries(src)?;
    Ok(mirror_entries(entries, dst, excluded))
}

fn mirror_entries(entries: Vec<PathBuf>, dst: &Path, excluded: &[String]) -> u32 {
    let mut copied = 0;
    for src_path in entries {
        let Some(name) = src_path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let dst_path = dst.join(&name);

        if src_path.is_dir() {
            if excluded.iter().any(|x| x.eq_ignore_ascii_case(&name)) {
                tracing::debug!("Mirror skips excluded folder {}", src_path.display());
                continue;
            }
            let children = fs::create_dir_all(&dst_path).and_then(|_| sorted_entries(&src_path));
            match children {
                Ok(children) => copied += mirror_entries(children, &dst_path, excluded),
                Err(e) => tracing::warn!("Mirror skips {}: {}", src_path.display(), e),
            }
        } else if !dst_path.exists() {
            match fs::copy(&src_path, &dst_path) {
                Ok(_) => copied += 1,
                Err(e) => tracing::warn!("Failed to copy {}: {}", src_path.display(), e),
            }
        }
    }
    copied
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(entry) => entries.push(entry.path()),
            Err(e) => tracing::warn!("Mirror skips an entry of {}: {}", dir.display(), e),
        }
    }
    entries.sort();
    Ok(entries)
}
