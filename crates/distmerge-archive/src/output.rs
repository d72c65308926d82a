//! Output archive with pinned entry timestamps.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{ArchiveError, ArchiveResult};

/// Timestamp given to every generated entry: 1989-12-18 16:00:00.
///
/// Wall-clock times would make two runs over the same inputs differ.
pub fn fixed_timestamp() -> ArchiveResult<DateTime> {
    DateTime::from_date_and_time(1989, 12, 18, 16, 0, 0).map_err(|_| ArchiveError::InvalidTimestamp)
}

/// Writes entries into a zip archive, refusing duplicate names.
pub struct OutputArchive<W: Write + Seek> {
    zip: ZipWriter<W>,
    names: HashSet<String>,
    timestamp: DateTime,
}

impl OutputArchive<BufWriter<File>> {
    /// Create (or truncate) an archive file, creating parent directories.
    pub fn create(path: &Path) -> ArchiveResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| ArchiveError::io(path, e))?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> OutputArchive<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> ArchiveResult<Self> {
        Ok(Self {
            zip: ZipWriter::new(writer),
            names: HashSet::new(),
            timestamp: fixed_timestamp()?,
        })
    }

    /// Whether an entry with this name was already written.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn claim(&mut self, name: &str) -> ArchiveResult<()> {
        if !self.names.insert(name.to_string()) {
            return Err(ArchiveError::DuplicateEntry(name.to_string()));
        }
        Ok(())
    }

    /// Write an entry with the fixed timestamp.
    pub fn write_entry(&mut self, name: &str, data: &[u8]) -> ArchiveResult<()> {
        self.write_with(name, data, self.timestamp)
    }

    /// Write an entry keeping a given modification time.
    pub fn write_entry_at(&mut self, name: &str, data: &[u8], modified: Option<DateTime>) -> ArchiveResult<()> {
        self.write_with(name, data, modified.unwrap_or(self.timestamp))
    }

    fn write_with(&mut self, name: &str, data: &[u8], modified: DateTime) -> ArchiveResult<()> {
        self.claim(name)?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(modified);
        self.zip.start_file(name, options)?;
        self.zip.write_all(data)?;
        tracing::trace!(entry = name, bytes = data.len(), "wrote entry");
        Ok(())
    }

    /// Write `<class_name>.class` with the fixed timestamp.
    pub fn write_class(&mut self, class_name: &str, data: &[u8]) -> ArchiveResult<()> {
        self.write_entry(&format!("{class_name}.class"), data)
    }

    /// Copy an entry from another archive byte for byte, metadata included.
    pub fn copy_raw<R: Read>(&mut self, file: zip::read::ZipFile<'_, R>) -> ArchiveResult<()> {
        let name = file.name().to_string();
        self.claim(&name)?;
        self.zip.raw_copy_file(file)?;
        Ok(())
    }

    /// Write the central directory and return the writer.
    pub fn finish(self) -> ArchiveResult<W> {
        Ok(self.zip.finish()?)
    }
}

/// Read a whole entry into memory.
pub(crate) fn read_entry<R: Read + ?Sized>(file: &mut R) -> ArchiveResult<Vec<u8>> {
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}
