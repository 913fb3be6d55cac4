//! One preparation run, end to end.
//!
//! ```text
//! 1. Parse     Data.json        →  raw item tree         (fails fast on format errors)
//! 2. Reset     dest/Media/      →  empty media root      (sidecars kept)
//! 3. Mirror    Assets/Media/    →  dest/Media/           (optional)
//! 4. Index     source tree      →  name → paths lookup    (destination pruned)
//! 5. Transform raw items        →  NormalizedConfig      (copies every resolved asset)
//! 6. Repair    written paths    →  folder spellings fixed against the finished media root
//! 7. Write     NormalizedConfig →  dest/config.json      (temp file + rename)
//! ```
//!
//! The previous output document is removed first, so a failed run never
//! leaves one behind. The descriptor is then parsed before the media root is
//! touched: a malformed document leaves the media files in place. Once the
//! media root has been cleared the run is not transactional, and a failure
//! part-way keeps whatever was copied so far.
//!
//! A dry run (`check`) performs steps 1, 4 and 5 without touching the
//! destination and reports what would be copied and what is missing.

use crate::config::PrepConfig;
use crate::descriptor::{self, DescriptorError};
use crate::index::{IndexError, SourceIndex};
use crate::materialize::{self, AmbiguousAsset, CopyStats, MaterializeError, Materializer, ResetStats};
use crate::transform::{self, Transformer};
use crate::types::NormalizedConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Cannot read descriptor {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error("Cannot write output document {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Resolve and report without touching the destination.
    pub dry_run: bool,
}

/// Everything a run produced, for reporting.
#[derive(Debug)]
pub struct RunReport {
    pub config: NormalizedConfig,
    pub stats: CopyStats,
    /// `None` on dry runs.
    pub reset: Option<ResetStats>,
    /// Files copied by the whole-folder mirror.
    pub mirrored: u32,
    pub indexed_files: usize,
    /// References that resolved to no source file.
    pub missing: Vec<String>,
    /// References resolved by a name several files share.
    pub ambiguous: Vec<AmbiguousAsset>,
    /// Written paths with no file behind them in the destination.
    pub dangling: Vec<String>,
    /// Output document, `None` on dry runs.
    pub output_path: Option<PathBuf>,
}

/// Run one preparation of `source_root` into `dest_root`.
pub fn build(
    source_root: &Path,
    dest_root: &Path,
    config: &PrepConfig,
    options: BuildOptions,
) -> Result<RunReport, BuildError> {
    let layout = &config.destination;
    let media_root = layout.media_root(dest_root);
    let output_path = layout.config_path(dest_root);

    if !options.dry_run {
        remove_previous_output(&output_path);
    }

    let descriptor_path = config.descriptor_path(source_root);
    let text = fs::read_to_string(&descriptor_path).map_err(|source| BuildError::DescriptorRead {
        path: descriptor_path.clone(),
        source,
    })?;
    let raw = descriptor::parse(&text)?;
    tracing::info!(
        "Parsed {}: {} items",
        descriptor_path.display(),
        raw.items.len()
    );

    let mut reset = None;
    let mut mirrored = 0;
    if !options.dry_run {
        reset = Some(materialize::reset(&media_root, &layout.keep_extensions)?);
        if config.mirror.enabled {
            mirrored = mirror_source(source_root, &media_root, config);
        }
    }

    let index = SourceIndex::build_excluding(source_root, Some(dest_root))?;

    let mut materializer =
        Materializer::new(source_root, &media_root, &index).dry_run(options.dry_run);
    let mut normalized = Transformer::new(&mut materializer, layout).transform(&raw.items);
    let (stats, missing, ambiguous) = materializer.finish();

    let mut dangling = Vec::new();
    let mut written = None;
    if !options.dry_run {
        transform::repair_paths(&mut normalized, &layout.media_dir, &media_root);
        dangling = dangling_paths(&normalized, dest_root);
        write_output(&output_path, &normalized)?;
        tracing::info!("Wrote {}", output_path.display());
        written = Some(output_path);
    }

    Ok(RunReport {
        config: normalized,
        stats,
        reset,
        mirrored,
        indexed_files: index.file_count(),
        missing,
        ambiguous,
        dangling,
        output_path: written,
    })
}

fn remove_previous_output(path: &Path) {
    if path.is_file()
        && let Err(e) = fs::remove_file(path)
    {
        tracing::warn!("Failed to remove previous {}: {}", path.display(), e);
    }
}

fn mirror_source(source_root: &Path, media_root: &Path, config: &PrepConfig) -> u32 {
    let mirror_src = source_root.join(&config.mirror.source_dir);
    if !mirror_src.is_dir() {
        tracing::warn!("Mirror source {} not found, skipping", mirror_src.display());
        return 0;
    }
    match materialize::mirror(&mirror_src, media_root, &config.mirror.exclude) {
        Ok(count) => {
            tracing::info!("Mirrored {} files from {}", count, mirror_src.display());
            count
        }
        Err(e) => {
            tracing::warn!("Mirror of {} failed: {}", mirror_src.display(), e);
            0
        }
    }
}

/// Written asset paths that do not exist under `dest_root`.
fn dangling_paths(config: &NormalizedConfig, dest_root: &Path) -> Vec<String> {
    let mut dangling = Vec::new();
    for equipment in &config.equipments {
        for path in equipment.asset_paths() {
            if !dest_root.join(path).is_file() {
                tracing::warn!("{}: {} has no file in the destination", equipment.name, path);
                dangling.push(path.to_string());
            }
        }
    }
    dangling
}

/// Serialize and write through a temp file, so the document is either
/// complete or absent.
fn write_output(path: &Path, config: &NormalizedConfig) -> Result<(), BuildError> {
    let json = serde_json::to_string_pretty(config)?;
    let write_err = |source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}
