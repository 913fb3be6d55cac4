//! Normalized configuration document consumed by the client runtime.
//!
//! Field names are part of the runtime contract and are serialized exactly
//! as the runtime reads them (`qrImagePath`, `descriptionItems`, ...). Every
//! sequence is always present, possibly empty, and every path field is an
//! empty string rather than null when there is no asset.

use serde::{Deserialize, Serialize};

/// Top-level output document: one [`Equipment`] per descriptor item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedConfig {
    pub equipments: Vec<Equipment>,
}

/// Root described entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    /// Item name with spaces → underscores, lower-cased.
    pub id: String,
    /// `QR_` + upper-cased id.
    pub tag: String,
    pub name: String,
    /// Destination-relative path of the QR image, or empty.
    pub qr_image_path: String,
    /// Model tree rooted at the equipment itself.
    pub model: Model,
}

impl Equipment {
    /// Visit every asset path of this equipment: QR image, model file, and
    /// each node's video and button images. Datasheet links are not visited.
    pub fn for_each_path_mut(&mut self, mut f: impl FnMut(&mut String)) {
        f(&mut self.qr_image_path);
        f(&mut self.model.model_file_path);
        self.model.for_each_media_path_mut(&mut f);
    }

    /// Non-empty asset paths, in tree order.
    pub fn asset_paths(&self) -> Vec<&str> {
        let mut out = vec![self.qr_image_path.as_str(), self.model.model_file_path.as_str()];
        self.model.collect_media_paths(&mut out);
        out.retain(|p| !p.is_empty());
        out
    }
}

/// One node of the model tree: the equipment root or any part/sub-part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub name: String,
    /// Only populated on the equipment root.
    pub model_file_path: String,
    pub description_items: Vec<DescriptionItem>,
    /// Rendered from `description_items`, see [`crate::naming::render_description`].
    pub description: String,
    pub buttons: Vec<Button>,
    pub video: String,
    pub datasheet_url: String,
    pub parts: Vec<Model>,
}

impl Model {
    /// Depth-first count of this node and all of its descendants.
    pub fn node_count(&self) -> usize {
        1 + self.parts.iter().map(Model::node_count).sum::<usize>()
    }

    fn for_each_media_path_mut(&mut self, f: &mut impl FnMut(&mut String)) {
        f(&mut self.video);
        for button in &mut self.buttons {
            f(&mut button.image_file_name);
        }
        for part in &mut self.parts {
            part.for_each_media_path_mut(f);
        }
    }

    fn collect_media_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.video);
        out.extend(self.buttons.iter().map(|b| b.image_file_name.as_str()));
        for part in &self.parts {
            part.collect_media_paths(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionItem {
    pub key: String,
    pub value: String,
}

impl DescriptionItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub id: String,
    pub image_file_name: String,
}
