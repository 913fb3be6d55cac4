//! Identifier derivation shared by every node of the configuration tree.
//!
//! Equipment and parts are keyed by their display names. The client runtime
//! addresses them through a derived `id` and, for equipment, a QR `tag`:
//!
//! - `"Hydraulic Pump"` → id `"hydraulic_pump"`
//! - `"Hydraulic Pump"` → tag `"QR_HYDRAULIC_PUMP"`
//!
//! Only spaces are replaced. Other punctuation is kept as-is so ids stay
//! recognisable next to the folder names they came from.

use crate::types::DescriptionItem;

/// Prefix of every equipment QR tag.
pub const TAG_PREFIX: &str = "QR_";

/// Derive a node id: spaces become underscores, then lower-cased.
///
/// - `"Pump"` → `"pump"`
/// - `"Main Valve 2"` → `"main_valve_2"`
/// - `"Already_Snake"` → `"already_snake"`
pub fn node_id(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

/// Derive the QR tag of an equipment from its id.
pub fn equipment_tag(id: &str) -> String {
    format!("{TAG_PREFIX}{}", id.to_uppercase())
}

/// Render description entries as `key: value` lines joined by `\n`.
///
/// This is the only way the `description` text of a node is produced; it is
/// recomputed from the entries every time and never read from input.
pub fn render_description(items: &[DescriptionItem]) -> String {
    items
        .iter()
        .map(|item| format!("{}: {}", item.key, item.value))
        .collect::<Vec<_>>()
        .join("\n")
}
