//! Merge and strip pipelines for distmerge.
//!
//! Drives the class-level merge over whole client and server archives, and
//! removes provenance markers from merged archives again.
//!
//! # Key Types
//!
//! - [`MergeEngine`] / [`MergeReport`] -- archive-level merge run
//! - [`Stripper`] / [`StripTargets`] / [`StripReport`] -- marker removal driven by directive files
//! - [`ClassFilter`] -- white- and blacklists by class name and package
//! - [`MergeConfig`] -- TOML-loadable run configuration
//! - [`load_class_names`] -- class lists from ProGuard, SRG, TSRG and Tiny mappings

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod strip;

pub use config::MergeConfig;
pub use engine::{MergeEngine, MergeReport};
pub use error::{EngineError, EngineResult};
pub use filter::ClassFilter;
pub use mapping::{load_class_names, parse_class_names, MappingFormat};
pub use strip::{StripReport, StripTargets, Stripper};

// Re-export key types
pub use distmerge_merge::{AnnotationScheme, Side};
