//! Descriptor generation from an asset-folder layout.
//!
//! Authoring tools scaffold one folder per maquette:
//!
//! ```text
//! Pump/                            # Maquette root, item name = folder name
//! ├── Pump.glb                     # Model fallback (base name only)
//! ├── ModelInfos/
//! │   ├── 3DMODEL/pump.glb         # Model file (first *.glb)
//! │   ├── QRCode/QRCode.png        # QR image (first image)
//! │   ├── Button_Images/Start.png  # One button per image, label = stem
//! │   ├── Video/intro.mp4          # First video file
//! │   └── Description/specs.xlsx   # Key/value rows of the first workbook
//! └── ModelParts/
//!     └── Motor/                   # Part, same shape without ModelInfos
//!         ├── Button_Images/
//!         ├── Video/
//!         ├── Description/
//!         └── Rotor/               # Sub-part
//! ```
//!
//! [`describe`] turns such a folder into a [`RawDescriptor`] with one item.
//! Paths are relative to the maquette root with `/` separators. Folder
//! listings are sorted by name so "first" is stable across platforms.
//!
//! # Descriptions
//!
//! The first `*.xlsx` in a `Description/` folder supplies the node's
//! description: column A is the key, column B the value, and the first row
//! is a header. Office lock files (`~$specs.xlsx`) are skipped. A workbook
//! that cannot be read is logged and yields no description.

use crate::descriptor::{RawButton, RawDescriptionEntry, RawDescriptor, RawNode};
use calamine::{Reader, Xlsx, open_workbook};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

const INFOS_DIR: &str = "ModelInfos";
const PARTS_DIR: &str = "ModelParts";
const MODEL_DIR: &str = "3DMODEL";
const QR_DIR: &str = "QRCode";
const BUTTONS_DIR: &str = "Button_Images";
const VIDEO_DIR: &str = "Video";
const DESCRIPTION_DIR: &str = "Description";

/// QR path written when `ModelInfos/QRCode` holds no image.
const DEFAULT_QR: &str = "QRCode.png";

#[derive(Error, Debug)]
pub enum DescribeError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build the descriptor for the maquette folder at `root`.
pub fn describe(root: &Path) -> Result<RawDescriptor, DescribeError> {
    if !root.is_dir() {
        return Err(DescribeError::NotADirectory(root.to_path_buf()));
    }
    let name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "maquette".to_string());

    let infos = root.join(INFOS_DIR);
    if !infos.is_dir() {
        tracing::warn!("{} not found, item will carry no media", infos.display());
    }
    let parts_dir = root.join(PARTS_DIR);
    let parts = if parts_dir.is_dir() {
        scan_parts(&parts_dir, root)?
    } else {
        Vec::new()
    };

    let item = RawNode {
        name,
        qr_image_path: qr_image(&infos, root)?,
        model_file_path: model_file(&infos, root)?,
        video_path: first_video(&infos, root)?,
        description: description(&infos)?,
        buttons: buttons(&infos, root)?,
        parts,
        ..RawNode::default()
    };
    tracing::info!(
        "Described {}: {} top-level parts, {} buttons",
        item.name,
        item.parts.len(),
        item.buttons.len()
    );
    Ok(RawDescriptor { items: vec![item] })
}

/// Write `descriptor` as a pretty-printed item array to `path`.
pub fn write_descriptor(descriptor: &RawDescriptor, path: &Path) -> Result<(), DescribeError> {
    let json = serde_json::to_string_pretty(&descriptor.items)?;
    fs::write(path, json).map_err(|source| DescribeError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn model_file(infos: &Path, root: &Path) -> Result<String, DescribeError> {
    if let Some(glb) = sorted_files(&infos.join(MODEL_DIR))?
        .into_iter()
        .find(|p| has_extension(p, &["glb"]))
    {
        return Ok(relative(&glb, root));
    }
    let fallback = sorted_files(root)?
        .into_iter()
        .find(|p| has_extension(p, &["glb"]))
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));
    Ok(fallback.unwrap_or_default())
}

fn qr_image(infos: &Path, root: &Path) -> Result<String, DescribeError> {
    Ok(sorted_files(&infos.join(QR_DIR))?
        .into_iter()
        .find(|p| has_extension(p, IMAGE_EXTENSIONS))
        .map(|p| relative(&p, root))
        .unwrap_or_else(|| DEFAULT_QR.to_string()))
}

fn first_video(folder: &Path, root: &Path) -> Result<String, DescribeError> {
    Ok(sorted_files(&folder.join(VIDEO_DIR))?
        .into_iter()
        .find(|p| has_extension(p, VIDEO_EXTENSIONS))
        .map(|p| relative(&p, root))
        .unwrap_or_default())
}

fn buttons(folder: &Path, root: &Path) -> Result<Vec<RawButton>, DescribeError> {
    let mut buttons: Vec<RawButton> = sorted_files(&folder.join(BUTTONS_DIR))?
        .into_iter()
        .filter(|p| has_extension(p, IMAGE_EXTENSIONS))
        .map(|p| RawButton {
            label: p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            image_path: relative(&p, root),
        })
        .collect();
    buttons.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(buttons)
}

fn description(folder: &Path) -> Result<Vec<RawDescriptionEntry>, DescribeError> {
    let workbook = sorted_files(&folder.join(DESCRIPTION_DIR))?
        .into_iter()
        .find(|p| has_extension(p, &["xlsx"]) && !is_lock_file(p));
    Ok(workbook.map(|p| read_workbook(&p)).unwrap_or_default())
}

fn is_lock_file(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n.to_string_lossy().starts_with("~$"))
}

/// Rows 2 and down of the first sheet as key/value pairs.
fn read_workbook(path: &Path) -> Vec<RawDescriptionEntry> {
    let mut workbook: Xlsx<_> = match open_workbook(path) {
        Ok(workbook) => workbook,
        Err(e) => {
            tracing::warn!("Cannot open {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            tracing::warn!("Cannot read the first sheet of {}: {}", path.display(), e);
            return Vec::new();
        }
        None => return Vec::new(),
    };
    let Some((last_row, _)) = range.end() else {
        return Vec::new();
    };

    let cell = |row: u32, col: u32| {
        range
            .get_value((row, col))
            .map(|v| v.to_string().trim().to_string())
            .unwrap_or_default()
    };
    let mut entries = Vec::new();
    for row in 1..=last_row {
        let (key, value) = (cell(row, 0), cell(row, 1));
        if !key.is_empty() || !value.is_empty() {
            entries.push(RawDescriptionEntry { key, value });
        }
    }
    tracing::debug!("{}: {} description rows", path.display(), entries.len());
    entries
}

/// Every sub-folder of `folder` except the media folders is a part.
fn scan_parts(folder: &Path, root: &Path) -> Result<Vec<RawNode>, DescribeError> {
    let mut parts = Vec::new();
    for dir in sorted_entries(folder)?.into_iter().filter(|p| p.is_dir()) {
        let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if [BUTTONS_DIR, VIDEO_DIR, DESCRIPTION_DIR].contains(&name.as_str()) {
            continue;
        }
        parts.push(RawNode {
            name,
            video_path: first_video(&dir, root)?,
            description: description(&dir)?,
            buttons: buttons(&dir, root)?,
            parts: scan_parts(&dir, root)?,
            ..RawNode::default()
        });
    }
    Ok(parts)
}

/// Sorted entries of `dir`; a missing folder is empty.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, DescribeError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let read_err = |source| DescribeError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(read_err)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    entries.sort();
    Ok(entries)
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, DescribeError> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file())
        .collect())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| {
            let e = e.to_string_lossy();
            extensions.iter().any(|x| x.eq_ignore_ascii_case(&e))
        })
        .unwrap_or(false)
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
