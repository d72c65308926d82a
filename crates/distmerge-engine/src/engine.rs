//! The merge pipeline over whole archives.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use distmerge_archive::{
    extract, extract_bundled, open_archive, read_classes, ClassMap, ExtractOptions, OutputArchive,
};
use distmerge_classfile::{decode, encode};
use distmerge_merge::{marker_class_models, AnnotationScheme, ClassMerger, Side};
use serde::Serialize;

use crate::config::MergeConfig;
use crate::error::{EngineError, EngineResult};
use crate::filter::ClassFilter;

/// Counts describing one merge run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub scheme: Option<String>,
    pub shared_classes: usize,
    pub client_only_classes: usize,
    pub server_only_classes: usize,
    pub filtered_classes: usize,
    pub client_only_members: usize,
    pub server_only_members: usize,
    pub resources: usize,
    pub marker_classes: usize,
}

impl MergeReport {
    /// Classes written to the output, marker classes excluded.
    pub fn classes_written(&self) -> usize {
        self.shared_classes + self.client_only_classes + self.server_only_classes
    }
}

/// Delete a file if it exists.
pub(crate) fn remove_existing(path: &Path) -> EngineResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed existing output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::io(path, e)),
    }
}

/// Remove a partially written output after a failed run.
pub(crate) fn discard_partial(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "could not remove partial output");
    }
}

/// Merges a client and a server jar into one archive.
#[derive(Clone, Debug)]
pub struct MergeEngine {
    client: PathBuf,
    server: PathBuf,
    output: PathBuf,
    merger: ClassMerger,
    inject: bool,
    keep_data: bool,
    keep_meta: bool,
    bundled: bool,
    filter: ClassFilter,
}

impl MergeEngine {
    /// An engine with no markers, no resources and no filter.
    pub fn new(client: impl Into<PathBuf>, server: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            client: client.into(),
            server: server.into(),
            output: output.into(),
            merger: ClassMerger::new(None),
            inject: true,
            keep_data: false,
            keep_meta: false,
            bundled: false,
            filter: ClassFilter::allow_all(),
        }
    }

    /// Configure an engine from a run configuration, loading any mapping lists.
    pub fn from_config(
        client: impl Into<PathBuf>,
        server: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        config: &MergeConfig,
    ) -> EngineResult<Self> {
        Ok(Self::new(client, server, output)
            .annotate(config.scheme()?, config.inject)
            .keep_data(config.keep_data)
            .keep_meta(config.keep_meta)
            .bundled(config.bundled)
            .filter(ClassFilter::from_config(config)?))
    }

    /// Mark exclusive classes, members and interfaces with `scheme`, and
    /// optionally add the marker types to the output.
    pub fn annotate(mut self, scheme: Option<AnnotationScheme>, inject: bool) -> Self {
        self.merger = ClassMerger::new(scheme);
        self.inject = inject;
        self
    }

    pub fn keep_data(mut self, keep: bool) -> Self {
        self.keep_data = keep;
        self
    }

    pub fn keep_meta(mut self, keep: bool) -> Self {
        self.keep_meta = keep;
        self
    }

    pub fn bundled(mut self, bundled: bool) -> Self {
        self.bundled = bundled;
        self
    }

    pub fn filter(mut self, filter: ClassFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn scheme(&self) -> Option<AnnotationScheme> {
        self.merger.scheme()
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run the merge.
    ///
    /// An existing output is deleted first. The server is read before the
    /// output is created, so a malformed server archive leaves no output
    /// behind; any later failure removes the partial output.
    pub fn run(&self) -> EngineResult<MergeReport> {
        remove_existing(&self.output)?;
        let server = self.server_classes()?;
        let out = OutputArchive::create(&self.output)?;
        match self.write_output(out, server) {
            Ok(report) => {
                tracing::info!(
                    output = %self.output.display(),
                    shared = report.shared_classes,
                    client_only = report.client_only_classes,
                    server_only = report.server_only_classes,
                    filtered = report.filtered_classes,
                    "merge complete"
                );
                Ok(report)
            }
            Err(err) => {
                discard_partial(&self.output);
                Err(err)
            }
        }
    }

    fn server_classes(&self) -> EngineResult<ClassMap> {
        let classes = if self.bundled {
            extract_bundled(&self.server)?
        } else {
            read_classes(&mut open_archive(&self.server)?)?
        };
        tracing::debug!(server = %self.server.display(), classes = classes.len(), "read server classes");
        Ok(classes)
    }

    /// Decode a class found on one side only, tag it and re-encode it.
    fn tag_exclusive(&self, name: &str, data: Vec<u8>, side: Side) -> EngineResult<Vec<u8>> {
        if self.merger.scheme().is_none() {
            return Ok(data);
        }
        let mut class = decode(&data).map_err(|e| EngineError::class(name, e))?;
        self.merger.tag_exclusive(&mut class, side);
        encode(&class).map_err(|e| EngineError::class(name, e))
    }

    fn merge_pair(&self, name: &str, client: &[u8], server: &[u8], report: &mut MergeReport) -> EngineResult<Vec<u8>> {
        let client = decode(client).map_err(|e| EngineError::class(name, e))?;
        let server = decode(server).map_err(|e| EngineError::class(name, e))?;
        let merged = self.merger.merge(client, server)?;
        report.client_only_members += merged.client_only_members;
        report.server_only_members += merged.server_only_members;
        encode(&merged.class).map_err(|e| EngineError::class(name, e))
    }

    fn write_output(&self, mut out: OutputArchive<BufWriter<File>>, mut server: ClassMap) -> EngineResult<MergeReport> {
        let mut report = MergeReport {
            scheme: self.scheme().map(|s| s.name().to_string()),
            ..MergeReport::default()
        };

        let options = ExtractOptions {
            copy_resources: self.keep_data,
            keep_meta: self.keep_meta,
        };
        let client = extract(&self.client, Some(&mut out), options)?;
        report.resources = out.len();

        for (name, data) in client {
            if !self.filter.accepts(&name) {
                server.shift_remove(&name);
                report.filtered_classes += 1;
                continue;
            }
            let bytes = match server.shift_remove(&name) {
                None => {
                    tracing::debug!(class = %name, "client only");
                    report.client_only_classes += 1;
                    self.tag_exclusive(&name, data, Side::Client)?
                }
                Some(server_data) => {
                    report.shared_classes += 1;
                    self.merge_pair(&name, &data, &server_data, &mut report)?
                }
            };
            out.write_class(&name, &bytes)?;
        }

        for (name, data) in server {
            if !self.filter.accepts(&name) {
                report.filtered_classes += 1;
                continue;
            }
            tracing::debug!(class = %name, "server only");
            report.server_only_classes += 1;
            let bytes = self.tag_exclusive(&name, data, Side::Server)?;
            out.write_class(&name, &bytes)?;
        }

        if let Some(scheme) = self.scheme().filter(|_| self.inject) {
            for model in marker_class_models(scheme) {
                if out.contains(&format!("{}.class", model.name)) {
                    tracing::warn!(class = %model.name, "marker class already present in input, not injecting");
                    continue;
                }
                let bytes = encode(&model).map_err(|source| EngineError::MarkerClass {
                    class: model.name.clone(),
                    source,
                })?;
                out.write_class(&model.name, &bytes)?;
                report.marker_classes += 1;
            }
        }

        let mut writer = out.finish()?;
        writer.flush().map_err(|e| EngineError::io(&self.output, e))?;
        Ok(report)
    }
}
