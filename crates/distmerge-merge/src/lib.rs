//! Class-level merge logic for distmerge.
//!
//! Reconciles a client and a server build of the same class into one class
//! whose distribution-exclusive parts carry a provenance marker.
//!
//! # Key Types
//!
//! - [`merge_members`] / [`Merged`] / [`Origin`] -- ordered three-way merge of field and method lists
//! - [`reconcile_interfaces`] / [`reconcile_inner_classes`] -- interface and inner-class unions
//! - [`AnnotationScheme`] -- the three marker generations and version-based selection
//! - [`ClassMerger`] -- per-class merge and whole-class tagging
//! - [`marker_class_models`] -- class definitions of the marker types

pub mod class_merge;
pub mod error;
pub mod markers;
pub mod members;
pub mod scheme;
pub mod structure;
pub mod version;

pub use class_merge::{ClassMerger, MergedClass};
pub use error::{MergeError, MergeResult};
pub use markers::marker_class_models;
pub use members::{merge_members, Fields, MemberKind, Merged, Methods, Origin, Side};
pub use scheme::AnnotationScheme;
pub use structure::{reconcile_inner_classes, reconcile_interfaces, InterfaceDelta};
pub use version::{GameVersion, PreRelease, Threshold};
