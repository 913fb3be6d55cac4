//! Descriptor → normalized configuration.
//!
//! Walks the raw item/part tree depth-first and builds the strictly-shaped
//! [`NormalizedConfig`]. Every node, root or nested, goes through the same
//! mapper ([`Transformer::model`]); the root only adds its id/tag, QR image
//! and model file, and may inherit fields from its first part.
//!
//! ## Item-level fallback
//!
//! Older descriptors push the item's own data one level down into a first,
//! synthetic part. When an item has no description, buttons, video or
//! datasheet of its own, each of these is taken from its *first declared*
//! part, independently. The fallback is one level deep and never looks at
//! later parts.
//!
//! ## Assets
//!
//! Every file reference is written as its canonical path
//! ([`paths::normalize`]) and copied through the [`Materializer`]. A missing
//! file keeps its computed path and is skipped. Button images that are
//! already in the destination convention are not copied again. Datasheets
//! are links and are passed through untouched.
//!
//! Order is preserved everywhere: items, parts, description entries and
//! buttons come out in document order.

use crate::config::DestinationConfig;
use crate::descriptor::{self, DescriptorError, RawButton, RawDescriptionEntry, RawNode};
use crate::index::base_name;
use crate::materialize::{Materializer, Placement};
use crate::naming;
use crate::paths;
use crate::types::{Button, DescriptionItem, Equipment, Model, NormalizedConfig};
use std::path::Path;

/// Maps raw descriptor nodes and copies their assets.
pub struct Transformer<'m, 'a> {
    materializer: &'m mut Materializer<'a>,
    layout: &'m DestinationConfig,
}

impl<'m, 'a> Transformer<'m, 'a> {
    pub fn new(materializer: &'m mut Materializer<'a>, layout: &'m DestinationConfig) -> Self {
        Self {
            materializer,
            layout,
        }
    }

    /// Parse `text` and transform it.
    pub fn transform_text(&mut self, text: &str) -> Result<NormalizedConfig, DescriptorError> {
        let raw = descriptor::parse(text)?;
        Ok(self.transform(&raw.items))
    }

    /// Transform parsed items, one [`Equipment`] per item.
    pub fn transform(&mut self, items: &[RawNode]) -> NormalizedConfig {
        NormalizedConfig {
            equipments: items.iter().map(|item| self.equipment(item)).collect(),
        }
    }

    fn equipment(&mut self, item: &RawNode) -> Equipment {
        let id = naming::node_id(&item.name);
        let tag = naming::equipment_tag(&id);
        tracing::debug!("Transforming equipment {} ({})", item.name, id);

        let qr_image_path = self.asset(&item.qr_image_path);
        let mut model = self.node(item, item.effective_parts(), item.first_part());
        model.model_file_path = self.model_file(&item.model_file_path);

        Equipment {
            id,
            tag,
            name: item.name.clone(),
            qr_image_path,
            model,
        }
    }

    /// Map one part and, recursively, its declared parts.
    pub fn model(&mut self, node: &RawNode) -> Model {
        self.node(node, &node.parts, None)
    }

    /// `parts` are the children to descend into; only the item level
    /// collapses a wrapper. `inherit` is the node whose fields fill in for
    /// absent ones, and only the item level passes one.
    fn node(&mut self, node: &RawNode, parts: &[RawNode], inherit: Option<&RawNode>) -> Model {
        let description_src = pick(&node.description, inherit.map(|p| &p.description));
        let buttons_src = pick(&node.buttons, inherit.map(|p| &p.buttons));
        let video_src = pick_str(&node.video_path, inherit.map(|p| p.video_path.as_str()));
        let datasheet_src = pick_str(
            &node.datasheet_path,
            inherit.map(|p| p.datasheet_path.as_str()),
        );

        let description_items = description_items(description_src);
        let description = naming::render_description(&description_items);
        let buttons = buttons_src.iter().map(|b| self.button(b)).collect();
        let video = self.asset(video_src);
        let parts = parts.iter().map(|part| self.model(part)).collect();

        Model {
            id: naming::node_id(&node.name),
            name: node.name.clone(),
            model_file_path: String::new(),
            description_items,
            description,
            buttons,
            video,
            datasheet_url: datasheet_src.trim().to_string(),
            parts,
        }
    }

    fn button(&mut self, raw: &RawButton) -> Button {
        let marker = &self.layout.media_dir;
        let image_file_name = paths::normalize(&raw.image_path, marker);
        if !image_file_name.is_empty() && !paths::is_canonical(&raw.image_path, marker) {
            self.materializer
                .copy_into(&raw.image_path, Placement::Mirrored);
        }
        Button {
            id: raw.label.clone(),
            image_file_name,
        }
    }

    /// Canonical path of a media reference; copies the file when it resolves.
    fn asset(&mut self, reference: &str) -> String {
        let canonical = paths::normalize(reference, &self.layout.media_dir);
        if !canonical.is_empty() {
            self.materializer.copy_into(reference, Placement::Mirrored);
        }
        canonical
    }

    /// The model file always lands in the models folder under its own name.
    fn model_file(&mut self, reference: &str) -> String {
        let reference = reference.trim();
        let file_name = base_name(reference);
        if file_name.is_empty() {
            return String::new();
        }
        self.materializer
            .copy_into(reference, Placement::Flat(&self.layout.models_dir));
        format!(
            "{}/{}/{}",
            self.layout.media_dir, self.layout.models_dir, file_name
        )
    }
}

/// Own value unless empty, else the inherited one.
fn pick<'n, T>(own: &'n [T], inherited: Option<&'n Vec<T>>) -> &'n [T] {
    match inherited {
        Some(fallback) if own.is_empty() => fallback.as_slice(),
        _ => own,
    }
}

fn pick_str<'n>(own: &'n str, inherited: Option<&'n str>) -> &'n str {
    match inherited {
        Some(fallback) if own.trim().is_empty() => fallback,
        _ => own,
    }
}

fn description_items(entries: &[RawDescriptionEntry]) -> Vec<DescriptionItem> {
    entries
        .iter()
        .map(|e| DescriptionItem::new(e.key.trim(), e.value.trim()))
        .collect()
}

/// Second pass: fix up folder spellings against the completed media root.
///
/// Runs after every copy so the result does not depend on copy order. See
/// [`paths::repair_first_segment`].
pub fn repair_paths(config: &mut NormalizedConfig, media_marker: &str, media_root: &Path) {
    for equipment in &mut config.equipments {
        equipment.for_each_path_mut(|path| {
            if !path.is_empty() {
                *path = paths::repair_first_segment(path, media_marker, media_root);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SourceIndex;
    use crate::test_helpers::{assert_part_shape, find_part, write_file};
    use std::fs;
    use tempfile::TempDir;

    struct Run {
        source: TempDir,
        dest: TempDir,
    }

    impl Run {
        fn new() -> Self {
            Self {
                source: TempDir::new().unwrap(),
                dest: TempDir::new().unwrap(),
            }
        }

        fn transform(&self, text: &str) -> NormalizedConfig {
            let index = SourceIndex::build(self.source.path()).unwrap();
            let layout = DestinationConfig::default();
            let media = layout.media_root(self.dest.path());
            let mut materializer = Materializer::new(self.source.path(), &media, &index);
            let mut transformer = Transformer::new(&mut materializer, &layout);
            transformer.transform_text(text).unwrap()
        }

        fn media(&self, rel: &str) -> std::path::PathBuf {
            self.dest.path().join("Media").join(rel)
        }
    }

    #[test]
    fn id_and_tag_derived_from_name() {
        let run = Run::new();
        let config = run.transform(r#"[{"name": "Hydraulic Pump"}]"#);
        let eq = &config.equipments[0];
        assert_eq!(eq.id, "hydraulic_pump");
        assert_eq!(eq.tag, "QR_HYDRAULIC_PUMP");
        assert_eq!(eq.name, "Hydraulic Pump");
        assert_eq!(eq.model.id, "hydraulic_pump");
    }

    #[test]
    fn bare_item_yields_empty_but_present_fields() {
        let run = Run::new();
        let config = run.transform(r#"[{"name": "Pump"}]"#);
        let eq = &config.equipments[0];
        assert_eq!(eq.qr_image_path, "");
        let model = &eq.model;
        assert!(model.description_items.is_empty());
        assert!(model.buttons.is_empty());
        assert!(model.parts.is_empty());
        assert_eq!(model.description, "");
        assert_eq!(model.video, "");
        assert_eq!(model.datasheet_url, "");
        assert_eq!(model.model_file_path, "");
    }

    #[test]
    fn item_inherits_from_first_part_only() {
        let run = Run::new();
        let config = run.transform(
            r#"[{"name": "Pump", "parts": [
                {"name": "Pump Info",
                 "description": [{"key": "Weight", "value": "12 kg"}],
                 "buttons": [{"label": "Open", "imagePath": "Buttons/open.png"}],
                 "videoPath": "Videos/first.mp4",
                 "datasheetPath": "docs/first.pdf"},
                {"name": "Second",
                 "description": [{"key": "Other", "value": "x"}],
                 "buttons": [{"label": "Close", "imagePath": "Buttons/close.png"}],
                 "videoPath": "Videos/second.mp4",
                 "datasheetPath": "docs/second.pdf"}
            ]}]"#,
        );
        let model = &config.equipments[0].model;
        assert_eq!(model.description_items, vec![DescriptionItem::new("Weight", "12 kg")]);
        assert_eq!(model.description, "Weight: 12 kg");
        assert_eq!(model.buttons[0].id, "Open");
        assert_eq!(model.buttons.len(), 1);
        assert_eq!(model.video, "Media/Videos/first.mp4");
        assert_eq!(model.datasheet_url, "docs/first.pdf");
    }

    #[test]
    fn fallback_is_per_field() {
        let run = Run::new();
        let config = run.transform(
            r#"[{"name": "Pump",
                 "videoPath": "Videos/own.mp4",
                 "parts": [{"name": "Info",
                   "videoPath": "Videos/part.mp4",
                   "description": [{"key": "K", "value": "V"}]}]}]"#,
        );
        let model = &config.equipments[0].model;
        assert_eq!(model.video, "Media/Videos/own.mp4");
        assert_eq!(model.description, "K: V");
    }

    #[test]
    fn fallback_is_not_recursive() {
        let run = Run::new();
        let config = run.transform(
            r#"[{"name": "Pump", "parts": [
                {"name": "Info", "parts": [
                    {"name": "Deep", "description": [{"key": "K", "value": "V"}]}
                ]}
            ]}]"#,
        );
        let model = &config.equipments[0].model;
        assert!(model.description_items.is_empty());
        let info = find_part(model, "Info");
        assert!(info.description_items.is_empty());
    }

    #[test]
    fn synthetic_wrapper_part_is_elided() {
        let run = Run::new();
        let config = run.transform(
            r#"[{"name": "Pump", "parts": [
                {"name": "Pump", "parts": [{"name": "Motor"}, {"name": "Valve"}]}
            ]}]"#,
        );
        assert_part_shape(&config.equipments[0].model, &[("Motor", &[]), ("Valve", &[])]);
    }

    #[test]
    fn same_named_part_below_item_level_is_kept() {
        let run = Run::new();
        let config = run.transform(
            r#"[{"name": "Pump", "parts": [
                {"name": "Motor", "parts": [
                    {"name": "Motor", "parts": [{"name": "Rotor"}, {"name": "Stator"}]}
                ]},
                {"name": "Valve"}
            ]}]"#,
        );
        let model = &config.equipments[0].model;
        assert_part_shape(model, &[("Motor", &["Motor"]), ("Valve", &[])]);
        assert_part_shape(find_part(model, "Motor"), &[("Motor", &["Rotor", "Stator"])]);
        assert_eq!(model.node_count(), 6);
    }

    #[test]
    fn nested_parts_map_recursively_in_order() {
        let run = Run::new();
        let config = run.transform(
            r#"[{"name": "Pump", "parts": [
                {"name": "Motor", "parts": [{"name": "Rotor"}, {"name": "Stator"}]},
                {"name": "Valve"}
            ]}]"#,
        );
        let model = &config.equipments[0].model;
        assert_part_shape(model, &[("Motor", &["Rotor", "Stator"]), ("Valve", &[])]);
        assert_eq!(find_part(model, "Motor").parts[0].id, "rotor");
        assert_eq!(model.node_count(), 5);
    }

    #[test]
    fn part_resolves_its_own_fields() {
        let run = Run::new();
        write_file(run.source.path(), "Assets/Media/Video/motor.mp4", "v");
        let config = run.transform(
            r#"[{"name": "Pump", "description": [{"key": "A", "value": "1"}], "parts": [
                {"name": "Motor",
                 "videoPath": "Assets/Media/Video/motor.mp4",
                 "datasheetPath": " https://example.com/motor.pdf ",
                 "description": [{"key": "Speed", "value": "1500 rpm"}, {"key": "Poles", "value": "4"}]}
            ]}]"#,
        );
        let motor = find_part(&config.equipments[0].model, "Motor");
        assert_eq!(motor.video, "Media/Videos/motor.mp4");
        assert_eq!(motor.datasheet_url, "https://example.com/motor.pdf");
        assert_eq!(motor.description, "Speed: 1500 rpm\nPoles: 4");
        assert_eq!(motor.model_file_path, "");
        assert!(run.media("Videos/motor.mp4").exists());
    }

    #[test]
    fn qr_image_copied_and_normalized() {
        let run = Run::new();
        write_file(run.source.path(), "Assets/QRCode/qr.png", "qr");
        let config = run.transform(r#"[{"name": "Pump", "qrImagePath": "Assets/QRCode/qr.png"}]"#);
        assert_eq!(config.equipments[0].qr_image_path, "Media/QRCode/qr.png");
        assert!(run.media("QRCode/qr.png").exists());
    }

    #[test]
    fn model_file_lands_in_models_folder() {
        let run = Run::new();
        write_file(run.source.path(), "ModelInfos/3DMODEL/pump.glb", "glb");
        let config = run.transform(
            r#"[{"name": "Pump", "modelFileUrl": "ModelInfos/3DMODEL/pump.glb"}]"#,
        );
        assert_eq!(config.equipments[0].model.model_file_path, "Media/Models/pump.glb");
        assert!(run.media("Models/pump.glb").exists());
    }

    #[test]
    fn relocated_asset_found_by_name() {
        let run = Run::new();
        write_file(run.source.path(), "misc/qr.png", "qr");
        let config = run.transform(r#"[{"name": "Pump", "qrImagePath": "C:/old/Assets/QRCode/qr.png"}]"#);
        assert_eq!(config.equipments[0].qr_image_path, "Media/QRCode/qr.png");
        assert!(run.media("misc/qr.png").exists());
    }

    #[test]
    fn missing_button_image_keeps_computed_path() {
        let run = Run::new();
        let config = run.transform(
            r#"[{"name": "Pump", "buttons": [{"label": "Open", "imagePath": "Assets/Buttons/missing.png"}]}]"#,
        );
        let button = &config.equipments[0].model.buttons[0];
        assert_eq!(button.id, "Open");
        assert_eq!(button.image_file_name, "Media/Buttons/missing.png");
        assert!(!run.media("Buttons").exists());
    }

    #[test]
    fn canonical_button_image_is_not_copied() {
        let run = Run::new();
        write_file(run.source.path(), "Media/Buttons/open.png", "b");
        let config = run.transform(
            r#"[{"name": "Pump", "buttons": [{"label": "Open", "imagePath": "Media/Buttons/open.png"}]}]"#,
        );
        assert_eq!(
            config.equipments[0].model.buttons[0].image_file_name,
            "Media/Buttons/open.png"
        );
        assert!(!run.media("Buttons/open.png").exists());
    }

    #[test]
    fn buttons_keep_document_order() {
        let run = Run::new();
        let config = run.transform(
            r#"[{"name": "Pump", "buttons": [
                {"label": "Z", "imagePath": ""},
                {"label": "A", "imagePath": ""},
                {"label": "M", "imagePath": ""}
            ]}]"#,
        );
        let ids: Vec<&str> = config.equipments[0]
            .model
            .buttons
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["Z", "A", "M"]);
    }

    #[test]
    fn items_keep_document_order() {
        let run = Run::new();
        let config = run.transform(r#"[{"name": "B"}, {"name": "A"}]"#);
        let ids: Vec<&str> = config.equipments.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn format_error_propagates() {
        let run = Run::new();
        let index = SourceIndex::build(run.source.path()).unwrap();
        let layout = DestinationConfig::default();
        let media = layout.media_root(run.dest.path());
        let mut materializer = Materializer::new(run.source.path(), &media, &index);
        let mut transformer = Transformer::new(&mut materializer, &layout);
        assert!(matches!(
            transformer.transform_text("no array here"),
            Err(DescriptorError::NoArray)
        ));
    }

    #[test]
    fn repair_pass_rewrites_spaced_folder() {
        let run = Run::new();
        write_file(run.source.path(), "ButtonImages/open.png", "b");
        let mut config = run.transform(
            r#"[{"name": "Pump", "buttons": [{"label": "Open", "imagePath": "Button Images/open.png"}]}]"#,
        );
        // Resolved by name and mirrored under its real folder
        assert!(run.media("ButtonImages/open.png").exists());
        assert_eq!(
            config.equipments[0].model.buttons[0].image_file_name,
            "Media/Button Images/open.png"
        );

        repair_paths(&mut config, "Media", &run.dest.path().join("Media"));
        assert_eq!(
            config.equipments[0].model.buttons[0].image_file_name,
            "Media/ButtonImages/open.png"
        );
    }

    #[test]
    fn transform_is_deterministic() {
        let run = Run::new();
        write_file(run.source.path(), "QRCode/qr.png", "qr");
        let text = r#"[{"name": "Pump", "qrImagePath": "QRCode/qr.png", "parts": [{"name": "A"}]}]"#;
        let first = serde_json::to_string(&run.transform(text)).unwrap();
        fs::remove_dir_all(run.dest.path().join("Media")).unwrap();
        let second = serde_json::to_string(&run.transform(text)).unwrap();
        assert_eq!(first, second);
    }
}
