//! Archive I/O for distmerge.
//!
//! Reads class files out of client and server jars and writes merged
//! archives whose entries all carry one fixed timestamp.
//!
//! # Architecture
//!
//! - **ClassMap**: raw class bytes keyed by binary name, in archive order (an `IndexMap`)
//! - **extract / extract_bundled**: plain jars, and server jars nested in a bundler container
//! - **Manifest**: main-section manifest attributes and the bundler versions list
//! - **OutputArchive**: duplicate-checked zip writer with pinned timestamps

pub mod error;
pub mod extract;
pub mod manifest;
pub mod output;

pub use error::{ArchiveError, ArchiveResult};
pub use extract::{
    bundled_server_jar, extract, extract_bundled, is_class_entry, open_archive, read_classes,
    read_classes_with_resources, ClassMap, ExtractOptions,
};
pub use manifest::{parse_bundle_list, BundleEntry, Manifest};
pub use output::{fixed_timestamp, OutputArchive};

// Entry metadata types used by callers that copy entries verbatim.
pub use zip::read::ZipFile;
pub use zip::{DateTime, ZipArchive};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn extracted_classes_land_in_output() {
        let mut source = OutputArchive::new(Cursor::new(Vec::new())).unwrap();
        source.write_class("a/One", b"one").unwrap();
        source.write_class("a/Two", b"two").unwrap();
        source.write_entry("pack.mcmeta", b"{}").unwrap();
        let bytes = source.finish().unwrap().into_inner();

        let mut input = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = OutputArchive::new(Cursor::new(Vec::new())).unwrap();
        let classes = read_classes_with_resources(&mut input, &mut out, false).unwrap();
        for (name, data) in classes.iter() {
            out.write_class(name, data).unwrap();
        }
        let merged = out.finish().unwrap().into_inner();

        let mut check = ZipArchive::new(Cursor::new(merged)).unwrap();
        let names: Vec<&str> = check.file_names().collect();
        assert_eq!(names.len(), 3);
        let mut data = Vec::new();
        check.by_name("a/Two.class").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"two");
    }
}
