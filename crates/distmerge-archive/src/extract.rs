//! Class extraction from plain and bundled jars.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use indexmap::IndexMap;
use zip::ZipArchive;

use crate::error::{ArchiveError, ArchiveResult};
use crate::manifest::{parse_bundle_list, Manifest};
use crate::output::{read_entry, OutputArchive};

pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";
pub const VERSIONS_LIST: &str = "META-INF/versions.list";
pub const VERSIONS_DIR: &str = "META-INF/versions/";
pub const BUNDLER_FORMAT: &str = "Bundler-Format";
pub const SUPPORTED_BUNDLER_FORMAT: &str = "1.0";

/// Raw class files keyed by binary class name, in archive order.
///
/// A repeated name replaces the earlier bytes and keeps the earlier position.
pub type ClassMap = IndexMap<String, Vec<u8>>;

/// How non-class entries are treated while extracting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Copy resources into the output archive.
    pub copy_resources: bool,
    /// Include `META-INF` resources when copying.
    pub keep_meta: bool,
}

/// Whether a zip entry name denotes a class file.
pub fn is_class_entry(name: &str) -> bool {
    name.ends_with(".class") && !name.starts_with('.')
}

/// Open a zip archive on disk.
pub fn open_archive(path: &Path) -> ArchiveResult<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

type ResourceSink<'a> = &'a mut dyn FnMut(&str, &mut dyn Read) -> ArchiveResult<()>;

fn collect<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    mut resources: Option<ResourceSink<'_>>,
) -> ArchiveResult<ClassMap> {
    let mut classes = ClassMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        if let Some(class_name) = name.strip_suffix(".class").filter(|_| is_class_entry(&name)) {
            let data = read_entry(&mut file)?;
            if classes.insert(class_name.to_string(), data).is_some() {
                tracing::warn!(class = class_name, "class appears twice in archive, keeping the later copy");
            }
        } else if let Some(sink) = resources.as_mut() {
            sink(&name, &mut file)?;
        }
    }
    Ok(classes)
}

/// Read every class of an open archive, ignoring resources.
pub fn read_classes<R: Read + Seek>(archive: &mut ZipArchive<R>) -> ArchiveResult<ClassMap> {
    collect(archive, None)
}

/// Read every class of an open archive, copying resources into `out`.
///
/// The first resource with a given name wins; later duplicates, and names
/// already present in `out`, are skipped. `META-INF` entries are skipped
/// unless `keep_meta` is set. Copied resources get the fixed timestamp.
pub fn read_classes_with_resources<R: Read + Seek, W: Write + Seek>(
    archive: &mut ZipArchive<R>,
    out: &mut OutputArchive<W>,
    keep_meta: bool,
) -> ArchiveResult<ClassMap> {
    let mut sink = |name: &str, file: &mut dyn Read| -> ArchiveResult<()> {
        if !keep_meta && name.starts_with("META-INF") {
            return Ok(());
        }
        if out.contains(name) {
            tracing::trace!(entry = name, "resource already copied");
            return Ok(());
        }
        let data = read_entry(file)?;
        out.write_entry(name, &data)
    };
    collect(archive, Some(&mut sink))
}

/// Extract the classes of a plain jar, optionally copying its resources.
pub fn extract<W: Write + Seek>(
    path: &Path,
    out: Option<&mut OutputArchive<W>>,
    options: ExtractOptions,
) -> ArchiveResult<ClassMap> {
    let mut archive = open_archive(path)?;
    let classes = match out {
        Some(out) if options.copy_resources => read_classes_with_resources(&mut archive, out, options.keep_meta)?,
        _ => read_classes(&mut archive)?,
    };
    tracing::debug!(archive = %path.display(), classes = classes.len(), "extracted archive");
    Ok(classes)
}

fn read_text<R: Read + Seek>(archive: &mut ZipArchive<R>, label: &str, entry: &str) -> ArchiveResult<String> {
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingEntry {
                archive: label.to_string(),
                entry: entry.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    let data = read_entry(&mut file)?;
    String::from_utf8(data).map_err(|_| ArchiveError::NotText(entry.to_string()))
}

/// Locate the nested server jar inside a bundled server archive and return
/// its bytes.
///
/// The manifest must carry `Bundler-Format: 1.0` and `META-INF/versions.list`
/// must hold exactly one record; its path names the jar under
/// `META-INF/versions/`.
pub fn bundled_server_jar<R: Read + Seek>(archive: &mut ZipArchive<R>, label: &str) -> ArchiveResult<Vec<u8>> {
    let manifest = Manifest::parse(&read_text(archive, label, MANIFEST_NAME)?);
    let format = manifest
        .main_attribute(BUNDLER_FORMAT)
        .ok_or_else(|| ArchiveError::MissingBundlerFormat {
            archive: label.to_string(),
        })?;
    if format != SUPPORTED_BUNDLER_FORMAT {
        return Err(ArchiveError::UnsupportedBundlerFormat {
            archive: label.to_string(),
            format: format.to_string(),
        });
    }

    let versions = parse_bundle_list(&read_text(archive, label, VERSIONS_LIST)?).map_err(|line| {
        ArchiveError::InvalidVersionsLine {
            archive: label.to_string(),
            line,
        }
    })?;
    let [entry] = versions.as_slice() else {
        return Err(ArchiveError::VersionsCount {
            archive: label.to_string(),
            count: versions.len(),
        });
    };

    let jar_name = format!("{VERSIONS_DIR}{}", entry.path);
    tracing::debug!(archive = label, jar = %jar_name, id = %entry.id, "found bundled server jar");
    let mut file = match archive.by_name(&jar_name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingEntry {
                archive: label.to_string(),
                entry: jar_name,
            })
        }
        Err(e) => return Err(e.into()),
    };
    read_entry(&mut file)
}

/// Extract the classes of the server jar nested in a bundled server archive.
pub fn extract_bundled(path: &Path) -> ArchiveResult<ClassMap> {
    let label = path.display().to_string();
    let mut outer = open_archive(path)?;
    let jar = bundled_server_jar(&mut outer, &label)?;
    let mut inner = ZipArchive::new(Cursor::new(jar))?;
    let classes = read_classes(&mut inner)?;
    tracing::debug!(archive = %label, classes = classes.len(), "extracted bundled server");
    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    fn archive(entries: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
        ZipArchive::new(Cursor::new(zip_of(entries))).unwrap()
    }

    fn bundled(manifest: &str, versions: Option<&str>, nested: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut entries: Vec<(&str, &[u8])> = vec![(MANIFEST_NAME, manifest.as_bytes())];
        if let Some(v) = versions {
            entries.push((VERSIONS_LIST, v.as_bytes()));
        }
        let jars: Vec<(String, Vec<u8>)> = nested
            .iter()
            .map(|(name, data)| (format!("{VERSIONS_DIR}{name}"), data.to_vec()))
            .collect();
        for (name, data) in &jars {
            entries.push((name.as_str(), data.as_slice()));
        }
        archive(&entries)
    }

    #[test]
    fn class_entries_are_recognized() {
        assert!(is_class_entry("a/B.class"));
        assert!(!is_class_entry(".hidden.class"));
        assert!(!is_class_entry("a/B.txt"));
    }

    #[test]
    fn classes_keep_archive_order() {
        let mut a = archive(&[
            ("z/Last.class", b"1"),
            ("a/", b""),
            ("a/First.class", b"2"),
            ("readme.txt", b"hi"),
            (".skip.class", b"3"),
        ]);
        let classes = read_classes(&mut a).unwrap();
        assert_eq!(classes.keys().collect::<Vec<_>>(), vec!["z/Last", "a/First"]);
        assert_eq!(classes.get("a/First").map(Vec::as_slice), Some(&b"2"[..]));
    }

    #[test]
    fn resources_are_copied_first_wins_without_meta() {
        let mut out = OutputArchive::new(Cursor::new(Vec::new())).unwrap();
        out.write_entry("shared.txt", b"already").unwrap();
        let mut a = archive(&[
            ("a/B.class", b"c"),
            ("data/x.txt", b"x"),
            ("META-INF/MANIFEST.MF", b"m"),
            ("shared.txt", b"later"),
        ]);
        let classes = read_classes_with_resources(&mut a, &mut out, false).unwrap();
        assert_eq!(classes.len(), 1);
        assert!(out.contains("data/x.txt"));
        assert!(!out.contains("META-INF/MANIFEST.MF"));
        assert!(!out.contains("a/B.class"));

        let bytes = out.finish().unwrap().into_inner();
        let mut written = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut shared = String::new();
        written.by_name("shared.txt").unwrap().read_to_string(&mut shared).unwrap();
        assert_eq!(shared, "already");
    }

    #[test]
    fn keep_meta_copies_meta_inf() {
        let mut out = OutputArchive::new(Cursor::new(Vec::new())).unwrap();
        let mut a = archive(&[("META-INF/MANIFEST.MF", b"m")]);
        read_classes_with_resources(&mut a, &mut out, true).unwrap();
        assert!(out.contains("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn bundled_server_jar_is_found() {
        let server = zip_of(&[("a/S.class", b"s")]);
        let mut a = bundled(
            "Manifest-Version: 1.0\nBundler-Format: 1.0\n",
            Some("abc\tserver-1.18\t1.18/server-1.18.jar\n"),
            &[("1.18/server-1.18.jar", &server)],
        );
        let jar = bundled_server_jar(&mut a, "server.jar").unwrap();
        let classes = read_classes(&mut ZipArchive::new(Cursor::new(jar)).unwrap()).unwrap();
        assert_eq!(classes.keys().collect::<Vec<_>>(), vec!["a/S"]);
    }

    #[test]
    fn bundled_failures_are_reported_in_order() {
        let mut no_manifest = archive(&[("a/B.class", b"c")]);
        assert!(matches!(
            bundled_server_jar(&mut no_manifest, "s"),
            Err(ArchiveError::MissingEntry { entry, .. }) if entry == MANIFEST_NAME
        ));

        let mut no_format = bundled("Manifest-Version: 1.0\n", Some("a\tb\tc.jar\n"), &[]);
        assert!(matches!(
            bundled_server_jar(&mut no_format, "s"),
            Err(ArchiveError::MissingBundlerFormat { .. })
        ));

        let mut bad_format = bundled("Bundler-Format: 2.0\n", None, &[]);
        assert!(matches!(
            bundled_server_jar(&mut bad_format, "s"),
            Err(ArchiveError::UnsupportedBundlerFormat { format, .. }) if format == "2.0"
        ));

        let mut no_list = bundled("Bundler-Format: 1.0\n", None, &[]);
        assert!(matches!(
            bundled_server_jar(&mut no_list, "s"),
            Err(ArchiveError::MissingEntry { entry, .. }) if entry == VERSIONS_LIST
        ));

        let mut two = bundled("Bundler-Format: 1.0\n", Some("a\tb\tc.jar\nd\te\tf.jar\n"), &[]);
        assert!(matches!(
            bundled_server_jar(&mut two, "s"),
            Err(ArchiveError::VersionsCount { count: 2, .. })
        ));

        let mut bad_line = bundled("Bundler-Format: 1.0\n", Some("a b c\n"), &[]);
        assert!(matches!(
            bundled_server_jar(&mut bad_line, "s"),
            Err(ArchiveError::InvalidVersionsLine { .. })
        ));

        let mut missing_jar = bundled("Bundler-Format: 1.0\n", Some("a\tb\tc.jar\n"), &[]);
        assert!(matches!(
            bundled_server_jar(&mut missing_jar, "s"),
            Err(ArchiveError::MissingEntry { entry, .. }) if entry == "META-INF/versions/c.jar"
        ));
    }

    #[test]
    fn extract_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.jar");
        std::fs::write(&path, zip_of(&[("a/B.class", b"c"), ("x.txt", b"x")])).unwrap();

        let mut out = OutputArchive::new(Cursor::new(Vec::new())).unwrap();
        let options = ExtractOptions {
            copy_resources: true,
            keep_meta: false,
        };
        let classes = extract(&path, Some(&mut out), options).unwrap();
        assert_eq!(classes.len(), 1);
        assert!(out.contains("x.txt"));

        let missing = extract::<Cursor<Vec<u8>>>(&dir.path().join("nope.jar"), None, options);
        assert!(matches!(missing, Err(ArchiveError::Io { .. })));
    }
}
