//! Canonical destination paths for descriptor references.
//!
//! Descriptor documents carry paths in every shape the authoring tools ever
//! produced: project-relative (`Assets/Media/QRCode/qr.png`), absolute from
//! another machine (`C:/proj/Assets/Media/Video/clip.mp4`), relative to the
//! maquette folder (`ModelInfos/QRCode/qr.png`), or already canonical
//! (`Media/QRCode/qr.png`). The output document needs exactly one shape: a
//! path relative to the destination root, starting with the media-root marker.
//!
//! ## Passes
//!
//! Normalization runs in two passes:
//!
//! 1. [`normalize`] is purely lexical. It unifies separators, strips the
//!    `Assets/` and `Media/` wrappers of the source convention, renames the
//!    legacy `video/` folder to `Videos/` and prefixes the marker.
//! 2. [`repair_first_segment`] runs once every copy has finished. If the
//!    first folder under the media root does not exist but its space-stripped
//!    spelling does (`Button Images` vs `ButtonImages`), the path is rewritten
//!    to the folder that was actually materialized.
//!
//! Keeping the filesystem probe out of the first pass means the written
//! paths do not depend on the order in which assets were copied.
//!
//! ## Examples
//!
//! ```text
//! C:/proj/Assets/Media/Video/clip.mp4  →  Media/Videos/clip.mp4
//! Assets/QRCode/qr.png                 →  Media/QRCode/qr.png
//! /home/someone/qr.png                 →  Media/qr.png
//! ""                                   →  ""
//! ```

use std::path::Path;

const ASSETS_SEGMENT: &str = "Assets";
const SOURCE_MEDIA_SEGMENT: &str = "Media";
const LEGACY_VIDEO_SEGMENT: &str = "video";
const VIDEO_SEGMENT: &str = "Videos";

/// Lexically normalize `path` to a canonical destination-relative path.
///
/// Returns an empty string for empty input; callers treat that as "no asset".
pub fn normalize(path: &str, media_marker: &str) -> String {
    let relative = media_relative(path);
    if relative.is_empty() {
        return String::new();
    }
    format!("{media_marker}/{relative}")
}

/// Path of an asset below the media root, without the marker.
///
/// Applies every lexical rule of [`normalize`] except the final prefix. The
/// materializer uses it to place copied files so that written paths and
/// copied files follow the same rules.
pub fn media_relative(path: &str) -> String {
    let unified = unify_separators(path.trim());
    if unified.is_empty() {
        return String::new();
    }

    let marker = format!("/{ASSETS_SEGMENT}/");
    let mut rest: &str = if let Some(pos) = unified.find(&marker) {
        &unified[pos + marker.len()..]
    } else if let Some(stripped) = strip_segment(&unified, ASSETS_SEGMENT) {
        stripped
    } else if is_rooted(&unified) {
        // An absolute path without an Assets/ segment carries no usable
        // structure: keep the file name only.
        crate::index::base_name(&unified)
    } else {
        &unified
    };

    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    if let Some(stripped) = strip_segment(rest, ASSETS_SEGMENT) {
        rest = stripped;
    }
    if let Some(stripped) = strip_segment(rest, SOURCE_MEDIA_SEGMENT) {
        rest = stripped;
    }

    rename_legacy_video(rest)
}

/// Rewrite the first folder of a canonical path to its space-stripped
/// spelling when only that spelling exists under `media_root`.
///
/// Paths that do not start with the marker, single-segment paths, and paths
/// whose folder exists as written are returned unchanged.
pub fn repair_first_segment(canonical: &str, media_marker: &str, media_root: &Path) -> String {
    let Some(rest) = strip_segment(canonical, media_marker) else {
        return canonical.to_string();
    };
    let Some((first, tail)) = rest.split_once('/') else {
        return canonical.to_string();
    };
    if !first.contains(' ') || media_root.join(first).is_dir() {
        return canonical.to_string();
    }
    let compact: String = first.chars().filter(|c| *c != ' ').collect();
    if compact.is_empty() || !media_root.join(&compact).is_dir() {
        return canonical.to_string();
    }
    tracing::debug!("Repaired folder {:?} -> {:?} in {}", first, compact, canonical);
    format!("{media_marker}/{compact}/{tail}")
}

/// Whether `path` already follows the destination convention
/// (`<marker>/...`), in either separator style.
pub fn is_canonical(path: &str, media_marker: &str) -> bool {
    strip_segment(&unify_separators(path.trim()), media_marker).is_some()
}

fn unify_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Strip a leading `segment/` (exact case) from `path`.
fn strip_segment<'a>(path: &'a str, segment: &str) -> Option<&'a str> {
    path.strip_prefix(segment)?.strip_prefix('/')
}

/// Rooted: `/x`, `//server/x`, or a drive letter `C:/x` / `C:x`.
fn is_rooted(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn rename_legacy_video(path: &str) -> String {
    match path.split_once('/') {
        Some((first, tail)) if first.eq_ignore_ascii_case(LEGACY_VIDEO_SEGMENT) => {
            format!("{VIDEO_SEGMENT}/{tail}")
        }
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MARKER: &str = "Media";

    #[test]
    fn absolute_windows_path_with_assets() {
        assert_eq!(
            normalize("C:/proj/Assets/Media/Video/clip.mp4", MARKER),
            "Media/Videos/clip.mp4"
        );
    }

    #[test]
    fn backslashes_are_unified() {
        assert_eq!(
            normalize("C:\\proj\\Assets\\Media\\QRCode\\qr.png", MARKER),
            "Media/QRCode/qr.png"
        );
    }

    #[test]
    fn leading_assets_segment() {
        assert_eq!(normalize("Assets/QRCode/qr.png", MARKER), "Media/QRCode/qr.png");
    }

    #[test]
    fn leading_assets_media_segments() {
        assert_eq!(
            normalize("Assets/Media/Buttons/open.png", MARKER),
            "Media/Buttons/open.png"
        );
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(normalize("", MARKER), "");
        assert_eq!(normalize("   ", MARKER), "");
    }

    #[test]
    fn rooted_path_without_assets_collapses_to_file_name() {
        assert_eq!(normalize("/home/someone/qr.png", MARKER), "Media/qr.png");
        assert_eq!(normalize("D:/exports/pump.glb", MARKER), "Media/pump.glb");
    }

    #[test]
    fn relative_path_is_kept() {
        assert_eq!(
            normalize("ModelInfos/QRCode/qr.png", MARKER),
            "Media/ModelInfos/QRCode/qr.png"
        );
    }

    #[test]
    fn canonical_path_is_stable() {
        let once = normalize("Media/QRCode/qr.png", MARKER);
        assert_eq!(once, "Media/QRCode/qr.png");
        assert_eq!(normalize(&once, MARKER), once);
    }

    #[test]
    fn legacy_video_folder_renamed() {
        assert_eq!(normalize("video/clip.mp4", MARKER), "Media/Videos/clip.mp4");
        assert_eq!(normalize("Video/clip.mp4", MARKER), "Media/Videos/clip.mp4");
    }

    #[test]
    fn videos_folder_untouched() {
        assert_eq!(normalize("Videos/clip.mp4", MARKER), "Media/Videos/clip.mp4");
    }

    #[test]
    fn nested_video_folder_untouched() {
        assert_eq!(
            normalize("Parts/Video/clip.mp4", MARKER),
            "Media/Parts/Video/clip.mp4"
        );
    }

    #[test]
    fn dot_prefix_stripped() {
        assert_eq!(normalize("./Assets/x.png", MARKER), "Media/x.png");
    }

    #[test]
    fn custom_marker_is_prefixed() {
        assert_eq!(normalize("Assets/QRCode/qr.png", "Content"), "Content/QRCode/qr.png");
    }

    #[test]
    fn media_relative_strips_wrappers() {
        assert_eq!(media_relative("Assets/Media/Video/a.mp4"), "Videos/a.mp4");
        assert_eq!(media_relative("Media/Buttons/b.png"), "Buttons/b.png");
        assert_eq!(media_relative("Buttons/b.png"), "Buttons/b.png");
    }

    #[test]
    fn canonical_detection() {
        assert!(is_canonical("Media/Buttons/b.png", MARKER));
        assert!(is_canonical("Media\\Buttons\\b.png", MARKER));
        assert!(!is_canonical("Assets/Media/Buttons/b.png", MARKER));
        assert!(!is_canonical("MediaX/b.png", MARKER));
    }

    #[test]
    fn repair_uses_space_stripped_folder_when_only_it_exists() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("ButtonImages")).unwrap();

        assert_eq!(
            repair_first_segment("Media/Button Images/open.png", MARKER, tmp.path()),
            "Media/ButtonImages/open.png"
        );
    }

    #[test]
    fn repair_keeps_existing_folder() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Button Images")).unwrap();
        fs::create_dir_all(tmp.path().join("ButtonImages")).unwrap();

        assert_eq!(
            repair_first_segment("Media/Button Images/open.png", MARKER, tmp.path()),
            "Media/Button Images/open.png"
        );
    }

    #[test]
    fn repair_is_noop_when_neither_exists() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            repair_first_segment("Media/Button Images/open.png", MARKER, tmp.path()),
            "Media/Button Images/open.png"
        );
    }

    #[test]
    fn repair_ignores_single_segment_and_foreign_paths() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("qr.png")).unwrap();
        assert_eq!(repair_first_segment("Media/q r.png", MARKER, tmp.path()), "Media/q r.png");
        assert_eq!(repair_first_segment("", MARKER, tmp.path()), "");
        assert_eq!(
            repair_first_segment("Other/A B/x.png", MARKER, tmp.path()),
            "Other/A B/x.png"
        );
    }
}
