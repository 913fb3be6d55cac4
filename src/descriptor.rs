//! Raw descriptor documents.
//!
//! The descriptor is the loosely-structured input describing one maquette:
//! a list of items (equipment), each with nested parts and sub-parts. It has
//! been written by several generations of tooling, so parsing is tolerant:
//!
//! - The array may be wrapped in arbitrary text. Everything from the first
//!   `[` to the last `]` is taken as the item array.
//! - Field names come in several spellings (`qrImagePath` / `qr_image_url`,
//!   `description` / `Description`, ...). All are accepted.
//! - `null` is treated like an absent field. Unknown fields are ignored.
//!
//! Items and parts share one recursive shape, [`RawNode`]. Fields that only
//! make sense on an item (`qrImagePath`, `modelFilePath`) are ignored below
//! the root.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Descriptor contains no item array (no '[' ... ']' pair)")]
    NoArray,
    #[error("Descriptor is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Descriptor node at {path} has an empty name")]
    EmptyName { path: String },
}

/// Parsed descriptor: the item array, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDescriptor {
    pub items: Vec<RawNode>,
}

/// An item, part, or sub-part of the descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "null_default",
        alias = "qr_image_url",
        alias = "qrImageUrl",
        skip_serializing_if = "String::is_empty"
    )]
    pub qr_image_path: String,
    #[serde(
        default,
        deserialize_with = "null_default",
        alias = "modelFileUrl",
        alias = "modelFileURL",
        skip_serializing_if = "String::is_empty"
    )]
    pub model_file_path: String,
    #[serde(default, deserialize_with = "null_default", alias = "video")]
    pub video_path: String,
    #[serde(
        default,
        deserialize_with = "null_default",
        alias = "datasheet",
        alias = "datasheetUrl"
    )]
    pub datasheet_path: String,
    #[serde(default, deserialize_with = "null_default", alias = "Description")]
    pub description: Vec<RawDescriptionEntry>,
    #[serde(default, deserialize_with = "null_default", alias = "Buttons")]
    pub buttons: Vec<RawButton>,
    #[serde(default, deserialize_with = "null_default")]
    pub parts: Vec<RawNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDescriptionEntry {
    #[serde(default, deserialize_with = "null_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_default")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawButton {
    #[serde(default, deserialize_with = "null_default", alias = "name")]
    pub label: String,
    #[serde(default, deserialize_with = "null_default", alias = "image")]
    pub image_path: String,
}

impl RawNode {
    /// Parts of an item, with a synthetic wrapper removed.
    ///
    /// A single child carrying the item's exact name and grandchildren of
    /// its own is a wrapper left by older generators; its children are
    /// returned instead of it. Only items get this treatment: a part that
    /// contains a same-named part is modelled as declared.
    pub fn effective_parts(&self) -> &[RawNode] {
        match self.parts.as_slice() {
            [only] if only.name == self.name && !only.parts.is_empty() => &only.parts,
            parts => parts,
        }
    }

    /// First declared child, before wrapper collapsing.
    pub fn first_part(&self) -> Option<&RawNode> {
        self.parts.first()
    }
}

#[derive(Deserialize)]
struct Envelope {
    items: Vec<RawNode>,
}

/// Locate the item array inside `text`: first `[` through last `]`.
pub fn extract_array(text: &str) -> Result<&str, DescriptorError> {
    let start = text.find('[').ok_or(DescriptorError::NoArray)?;
    let end = text.rfind(']').ok_or(DescriptorError::NoArray)?;
    if end < start {
        return Err(DescriptorError::NoArray);
    }
    Ok(&text[start..=end])
}

/// Parse a descriptor document.
///
/// The located array is wrapped in a single-field `{"items": ...}` envelope
/// before deserializing. Every node must carry a non-empty name.
pub fn parse(text: &str) -> Result<RawDescriptor, DescriptorError> {
    let array = extract_array(text)?;
    let envelope: Envelope = serde_json::from_str(&format!("{{\"items\":{array}}}"))?;
    for (i, item) in envelope.items.iter().enumerate() {
        check_names(item, &format!("item {}", i + 1))?;
    }
    Ok(RawDescriptor {
        items: envelope.items,
    })
}

fn check_names(node: &RawNode, path: &str) -> Result<(), DescriptorError> {
    if node.name.trim().is_empty() {
        return Err(DescriptorError::EmptyName {
            path: path.to_string(),
        });
    }
    for (i, part) in node.parts.iter().enumerate() {
        check_names(part, &format!("{path} / part {}", i + 1))?;
    }
    Ok(())
}

/// Deserialize `null` as the type's default.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
