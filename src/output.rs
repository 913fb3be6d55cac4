//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every entity
//! (equipment, part, sub-part) leads with its positional index and name;
//! the asset paths written to the configuration are shown as indented
//! context lines underneath. The report reads as an inventory of the
//! maquette while still letting users trace each entry to a media file.
//!
//! # Output Format
//!
//! ## Build / Check
//!
//! ```text
//! 001 Hydraulic Pump (QR_HYDRAULIC_PUMP)
//!     QR: Media/QRCode/qr.png
//!     Model: Media/Models/pump.glb
//!     Weight: 12 kg
//!     001 Motor (2 buttons)
//!         Video: Media/Videos/motor.mp4
//!         001 Rotor
//!     002 Valve
//!
//! Assets
//!     3 copied, 1 already present, 2 missing (6 total)
//!
//! Missing
//!     Assets/QRCode/lost.png
//!
//! Ambiguous
//!     icon.png → a/icon.png (3 candidates)
//!
//! Wrote dist/config.json
//! ```
//!
//! ## Describe
//!
//! ```text
//! 001 Pump
//!     QR: ModelInfos/QRCode/QRCode.png
//!     Model: ModelInfos/3DMODEL/pump.glb
//!     001 Motor (1 button)
//!
//! Wrote Pump/Data.json
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::descriptor::{RawDescriptor, RawNode};
use crate::pipeline::RunReport;
use crate::types::{Equipment, Model};
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + name, with an optional
/// button count.
///
/// ```text
/// 001 Motor (2 buttons)
/// 002 Valve
/// ```
fn entity_header(index: usize, name: &str, buttons: usize) -> String {
    match buttons {
        0 => format!("{} {}", format_index(index), name),
        1 => format!("{} {} (1 button)", format_index(index), name),
        n => format!("{} {} ({} buttons)", format_index(index), name, n),
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

/// Push a `Label: value` context line when `value` is non-empty.
fn context_line(lines: &mut Vec<String>, depth: usize, label: &str, value: &str) {
    if !value.is_empty() {
        lines.push(format!("{}{}: {}", indent(depth), label, value));
    }
}

// ============================================================================
// Build / Check output
// ============================================================================

fn equipment_lines(lines: &mut Vec<String>, index: usize, equipment: &Equipment) {
    lines.push(format!(
        "{} {} ({})",
        format_index(index),
        equipment.name,
        equipment.tag
    ));
    context_line(lines, 1, "QR", &equipment.qr_image_path);
    context_line(lines, 1, "Model", &equipment.model.model_file_path);
    model_body(lines, &equipment.model, 1);
}

/// Context lines and parts of a node whose header is already written.
fn model_body(lines: &mut Vec<String>, model: &Model, depth: usize) {
    if let Some(first) = model.description.lines().next() {
        let truncated = truncate_desc(first.trim(), 60);
        if !truncated.is_empty() {
            lines.push(format!("{}{}", indent(depth), truncated));
        }
    }
    context_line(lines, depth, "Video", &model.video);
    context_line(lines, depth, "Datasheet", &model.datasheet_url);

    for (i, part) in model.parts.iter().enumerate() {
        lines.push(format!(
            "{}{}",
            indent(depth),
            entity_header(i + 1, &part.name, part.buttons.len())
        ));
        model_body(lines, part, depth + 1);
    }
}

/// Format the report of a `build` or `check` run.
pub fn format_build_output(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, equipment) in report.config.equipments.iter().enumerate() {
        equipment_lines(&mut lines, i + 1, equipment);
    }

    lines.push(String::new());
    lines.push("Assets".to_string());
    lines.push(format!("    {}", report.stats));
    if report.mirrored > 0 {
        lines.push(format!("    {} mirrored", report.mirrored));
    }
    if let Some(reset) = &report.reset {
        lines.push(format!(
            "    {} folders and {} files cleared, {} sidecars kept",
            reset.removed_dirs, reset.removed_files, reset.kept
        ));
    }

    if !report.missing.is_empty() {
        lines.push(String::new());
        lines.push("Missing".to_string());
        for reference in &report.missing {
            lines.push(format!("    {}", reference));
        }
    }

    if !report.ambiguous.is_empty() {
        lines.push(String::new());
        lines.push("Ambiguous".to_string());
        for asset in &report.ambiguous {
            lines.push(format!(
                "    {} → {} ({} candidates)",
                asset.reference,
                asset.chosen.display(),
                asset.candidates
            ));
        }
    }

    if !report.dangling.is_empty() {
        lines.push(String::new());
        lines.push("Dangling".to_string());
        for path in &report.dangling {
            lines.push(format!("    {}", path));
        }
    }

    lines.push(String::new());
    match &report.output_path {
        Some(path) => lines.push(format!("Wrote {}", path.display())),
        None => lines.push("Dry run, nothing written".to_string()),
    }

    lines
}

/// Print build/check output to stdout.
pub fn print_build_output(report: &RunReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Describe output
// ============================================================================

fn raw_parts(lines: &mut Vec<String>, parts: &[RawNode], depth: usize) {
    for (i, part) in parts.iter().enumerate() {
        lines.push(format!(
            "{}{}",
            indent(depth),
            entity_header(i + 1, &part.name, part.buttons.len())
        ));
        context_line(lines, depth + 1, "Video", &part.video_path);
        raw_parts(lines, &part.parts, depth + 1);
    }
}

/// Format the descriptor produced by `describe`.
pub fn format_describe_output(descriptor: &RawDescriptor, written: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, item) in descriptor.items.iter().enumerate() {
        lines.push(entity_header(i + 1, &item.name, item.buttons.len()));
        context_line(&mut lines, 1, "QR", &item.qr_image_path);
        context_line(&mut lines, 1, "Model", &item.model_file_path);
        context_line(&mut lines, 1, "Video", &item.video_path);
        raw_parts(&mut lines, &item.parts, 1);
    }
    lines.push(String::new());
    lines.push(format!("Wrote {}", written.display()));
    lines
}

/// Print describe output to stdout.
pub fn print_describe_output(descriptor: &RawDescriptor, written: &Path) {
    for line in format_describe_output(descriptor, written) {
        println!("{}", line);
    }
}
