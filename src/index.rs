//! Filename lookup over the source tree.
//!
//! Descriptor documents reference files by paths that are often stale: the
//! folder was renamed, the file was moved next to a sibling, or the path was
//! written on another machine. The [`SourceIndex`] is built once per run by a
//! single recursive walk and maps each base name (case-insensitive) to every
//! file carrying it, so a broken reference can still be resolved by name
//! without re-walking the tree.
//!
//! ## Duplicates
//!
//! Names that occur more than once keep all their paths, in walk order.
//! [`SourceIndex::find`] returns the first one together with the candidate
//! count, so callers can tell an unambiguous hit from a best-effort guess.
//!
//! The walk visits directory entries sorted by file name, which keeps "first"
//! stable across runs on the same tree.
//!
//! ## Destination
//!
//! A destination folder nested in the source is left out of the walk
//! ([`SourceIndex::build_excluding`]), so a previous run's output never
//! answers a lookup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cannot read source root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Point-in-time snapshot of the files under a source root.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    root: PathBuf,
    by_name: HashMap<String, Vec<PathBuf>>,
    file_count: usize,
}

/// Result of a name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup<'a> {
    /// First candidate in walk order.
    pub path: &'a Path,
    /// Number of indexed files sharing the name (always >= 1).
    pub candidates: usize,
}

impl Lookup<'_> {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

impl SourceIndex {
    /// Walk `root` recursively and index every regular file.
    ///
    /// Failing to read the root itself is fatal. Unreadable entries deeper in
    /// the tree are logged and skipped.
    pub fn build(root: &Path) -> Result<Self, IndexError> {
        Self::build_excluding(root, None)
    }

    /// Like [`build`](Self::build), but prunes the `excluded` subtree.
    ///
    /// The destination usually lives inside the source (`--source .`,
    /// `--dest dist`); its files must never resolve a reference. `excluded`
    /// is compared after canonicalization, so any spelling of the same
    /// folder matches. A missing folder or one outside `root` prunes nothing.
    pub fn build_excluding(root: &Path, excluded: Option<&Path>) -> Result<Self, IndexError> {
        let mut by_name: HashMap<String, Vec<PathBuf>> = HashMap::new();
        let mut file_count = 0;
        let pruned = excluded.and_then(|dir| nested_in(root, dir));
        if let Some(dir) = &pruned {
            tracing::debug!("Index skips {}", dir.display());
        }

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| pruned.as_deref() != Some(e.path()));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(IndexError::Root {
                        path: root.to_path_buf(),
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry while indexing: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_lowercase();
            by_name
                .entry(key)
                .or_default()
                .push(entry.into_path());
            file_count += 1;
        }

        tracing::info!(
            "Source index built: {} files, {} distinct names under {}",
            file_count,
            by_name.len(),
            root.display()
        );

        Ok(Self {
            root: root.to_path_buf(),
            by_name,
            file_count,
        })
    }

    /// Look up a file by base name.
    ///
    /// `reference` may be a bare file name or any path string; only its last
    /// segment is used (either separator style). Matching ignores case.
    pub fn find(&self, reference: &str) -> Option<Lookup<'_>> {
        let candidates = self.candidates(reference);
        candidates.first().map(|path| Lookup {
            path,
            candidates: candidates.len(),
        })
    }

    /// All indexed paths sharing the base name of `reference`, in walk order.
    pub fn candidates(&self, reference: &str) -> &[PathBuf] {
        let name = base_name(reference).to_lowercase();
        if name.is_empty() {
            return &[];
        }
        self.by_name.get(&name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Total number of indexed files, duplicates included.
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Number of distinct (case-folded) base names.
    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }
}

/// `dir` spelled under `root` when it is a strict descendant of it.
fn nested_in(root: &Path, dir: &Path) -> Option<PathBuf> {
    let root_abs = root.canonicalize().ok()?;
    let dir_abs = dir.canonicalize().ok()?;
    let relative = dir_abs.strip_prefix(&root_abs).ok()?;
    if relative.as_os_str().is_empty() {
        tracing::warn!("Destination is the source root, nothing excluded from the index");
        return None;
    }
    Some(root.join(relative))
}

/// Last segment of a path string, accepting `/` and `\` separators.
pub(crate) fn base_name(reference: &str) -> &str {
    reference
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
}
