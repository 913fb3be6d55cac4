//! Shared test utilities for the maquette-prep test suite.
//!
//! Provides file and workbook fixtures, model-tree lookups, and a shape assertion for
//! the part hierarchy produced by the transform phase.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_maquette();
//! let equipment = &config.equipments[0];
//!
//! let motor = find_part(&equipment.model, "Motor");
//! assert_eq!(motor.id, "motor");
//!
//! assert_part_shape(&equipment.model, &[
//!     ("Motor", &["Rotor"]),
//!     ("Valve", &[]),
//! ]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::types::Model;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `contents` to `root/rel`, creating parent folders.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Write an xlsx workbook whose first sheet holds a header row followed by
/// `rows` in columns A and B. Empty strings leave the cell blank.
pub fn write_workbook(root: &Path, rel: &str, rows: &[(&str, &str)]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Key").unwrap();
    sheet.write_string(0, 1, "Value").unwrap();
    for (i, (key, value)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        if !key.is_empty() {
            sheet.write_string(row, 0, *key).unwrap();
        }
        if !value.is_empty() {
            sheet.write_string(row, 1, *value).unwrap();
        }
    }
    workbook.save(&path).unwrap();
}

/// A source tree in the asset-folder layout `describe` reads:
///
/// ```text
/// Pump/
/// ├── Pump.glb
/// ├── ModelInfos/{QRCode, 3DMODEL, Button_Images, Video}
/// └── ModelParts/Motor/{Button_Images, Rotor/Video}
///                Valve/
/// ```
pub fn setup_maquette() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_file(root, "Pump.glb", "glb-root");
    write_file(root, "ModelInfos/QRCode/QRCode.png", "qr");
    write_file(root, "ModelInfos/3DMODEL/pump.glb", "glb");
    write_file(root, "ModelInfos/Button_Images/Start.png", "start");
    write_file(root, "ModelInfos/Button_Images/Stop.png", "stop");
    write_file(root, "ModelInfos/Video/intro.mp4", "video");
    write_file(root, "ModelInfos/Description/notes.xlsx", "xlsx");
    write_file(root, "ModelParts/Motor/Button_Images/Open.png", "open");
    write_file(root, "ModelParts/Motor/Rotor/Video/spin.mp4", "spin");
    fs::create_dir_all(root.join("ModelParts/Valve")).unwrap();
    tmp
}

// =========================================================================
// Model lookups (panic with a clear message on miss)
// =========================================================================

/// Find a direct part of `model` by name. Panics if not found.
pub fn find_part<'a>(model: &'a Model, name: &str) -> &'a Model {
    model
        .parts
        .iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| {
            let names = part_names(model);
            panic!("part '{name}' not found under '{}'. Available: {names:?}", model.name)
        })
}

/// Names of the direct parts of `model`, in order.
pub fn part_names(model: &Model) -> Vec<&str> {
    model.parts.iter().map(|p| p.name.as_str()).collect()
}

/// Assert the two top levels of the part tree.
///
/// Each entry is `(part, sub_parts)`. Use `&[]` for leaf parts.
pub fn assert_part_shape(model: &Model, expected: &[(&str, &[&str])]) {
    let expected_names: Vec<&str> = expected.iter().map(|(n, _)| *n).collect();
    assert_eq!(part_names(model), expected_names, "parts of '{}' mismatch", model.name);

    for (name, children) in expected {
        let part = find_part(model, name);
        assert_eq!(
            part_names(part),
            children.to_vec(),
            "sub-parts of '{name}' mismatch"
        );
    }
}
