//! # Maquette Prep
//!
//! Prepares a maquette's source folder for packaging into the client
//! application. A maquette is described by a loosely-structured descriptor
//! (`Data.json`) that references a 3D model, QR image, button images, videos
//! and datasheets scattered across the source tree. This crate turns that
//! into a self-contained media folder plus one normalized configuration
//! document the runtime can read directly.
//!
//! # Architecture: One Run, Seven Steps
//!
//! ```text
//! 1. Parse     Data.json     →  RawDescriptor     (tolerant of legacy layouts)
//! 2. Reset     dest/Media/   →  empty media root
//! 3. Mirror    Assets/Media/ →  dest/Media/       (optional)
//! 4. Index     source tree   →  SourceIndex       (file name → paths)
//! 5. Transform RawDescriptor →  NormalizedConfig  (copies each referenced asset)
//! 6. Repair    written paths →  folder spellings checked against the media root
//! 7. Write     config.json   ←  NormalizedConfig
//! ```
//!
//! Output is deterministic: the same source tree always produces a
//! byte-identical configuration document.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Runs the steps above and returns a [`pipeline::RunReport`] |
//! | [`descriptor`] | Raw descriptor parsing: array extraction, field aliases, name checks |
//! | [`transform`] | Maps raw items to equipment and model trees, driving the materializer |
//! | [`materialize`] | Copies assets into the media root, resets it, mirrors folders |
//! | [`index`] | Whole-tree file-name index used to find relocated assets |
//! | [`paths`] | Lexical path normalization into the canonical media-root form |
//! | [`naming`] | Id, tag and description rendering rules |
//! | [`types`] | The normalized configuration document |
//! | [`config`] | `maquette.toml` loading, merging and validation |
//! | [`describe`] | Generates a descriptor from the scaffolded asset-folder layout |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Paths Relative to the Destination Root
//!
//! Every path written to the configuration starts with the media folder name
//! (`Media/QRCode/qr.png`). The runtime resolves them against the folder the
//! configuration document lives in, so the whole destination can be moved as
//! one unit.
//!
//! ## Copy Location Derived From the Written Path
//!
//! Where an asset is copied and what path the configuration records are
//! computed by the same function ([`paths::media_relative`]). A reference
//! that resolves exactly always ends up where its written path points. Only
//! assets found by name elsewhere in the tree can leave a written path with
//! no file behind it; those are reported, never silently dropped.
//!
//! ## Existing Files Win
//!
//! A destination file that already exists is never overwritten within a run.
//! Its content is hashed against the source and a mismatch is reported as
//! stale, so a second pass over the same destination is a no-op.
//!
//! ## Explicit Index
//!
//! The file-name index is a value built once per run and passed down, not
//! global state. Lookups report how many files share the name so ambiguous
//! resolutions show up in the run report.

pub mod config;
pub mod describe;
pub mod descriptor;
pub mod index;
pub mod materialize;
pub mod naming;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod transform;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
