//! Snapshot documents for Trackbook
//!
//! A snapshot is the complete dataset plus metadata, serialized as a single
//! JSON document. It is the unit of export, import and backup.
//!
//! # Components
//!
//! - `DatasetCodec`: reads the live dataset into a `SnapshotDocument`, and
//!   wipes/loads the live dataset from one
//! - `LocalSnapshotStore`: private safety snapshots taken before an import
//! - `naming`: the `{kind}_{yyyy-MM-dd_HH-mm-ss}.json` file convention
//! - `EntityKind` / `IMPORT_ORDER`: the collections and the order in which
//!   they must be loaded
//!
//! # Document Format
//!
//! ```json
//! {
//!   "metadata": { "createdAt": "...", "appVersion": "0.1.0",
//!                 "deviceName": "laptop", "schemaVersion": 2 },
//!   "userPreferences": { "currencyCode": "USD", "languageCode": "en",
//!                        "colorSchemeCode": "system" },
//!   "entityCollections": { "projects": [ ... ], "checklists": [ ... ] }
//! }
//! ```

mod codec;
mod document;
mod kind;
mod local_store;
pub mod naming;

pub use codec::{DatasetCodec, SCHEMA_VERSION};
pub use document::{EntityCollections, SnapshotDocument, SnapshotMetadata};
pub use kind::{EntityKind, IMPORT_ORDER};
pub use local_store::LocalSnapshotStore;
pub use naming::SnapshotKind;
