//! Removing provenance markers from a merged archive.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use distmerge_archive::{open_archive, OutputArchive};
use distmerge_classfile::{decode, encode, Annotated, ClassModel};
use distmerge_merge::AnnotationScheme;
use serde::Serialize;

use crate::engine::{discard_partial, remove_existing};
use crate::error::{EngineError, EngineResult};

/// Classes and members whose markers should be removed.
///
/// Each directive line is `<class>` or `<class> <member>`, where a member is
/// a method `name(descriptor)`, or a field `name` or `name descriptor`
/// written without a space. Tokens after the member are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StripTargets {
    classes: HashSet<String>,
    members: HashSet<(String, String)>,
}

impl StripTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one directive line. Blank lines and `#` comments are ignored.
    pub fn add_line(&mut self, line: &str) {
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let line = line.split_once('#').map_or(line, |(body, _)| body);
        let line = line.strip_prefix('\t').unwrap_or(line).trim();
        if line.is_empty() {
            return;
        }
        match line.split_once(' ') {
            Some((class, rest)) => {
                self.classes.insert(class.to_string());
                let member = rest.split(' ').next().unwrap_or_default();
                if !member.is_empty() {
                    self.members.insert((class.to_string(), member.to_string()));
                }
            }
            None => {
                self.classes.insert(line.to_string());
            }
        }
    }

    /// Add every line of a directive text.
    pub fn add_text(&mut self, text: &str) {
        for line in text.lines() {
            self.add_line(line.trim_end_matches('\r'));
        }
    }

    /// Add the directives of a data file.
    pub fn load(&mut self, path: &Path) -> EngineResult<()> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        let before = (self.classes.len(), self.members.len());
        self.add_text(&text);
        tracing::debug!(
            path = %path.display(),
            classes = self.classes.len() - before.0,
            members = self.members.len() - before.1,
            "loaded strip targets"
        );
        Ok(())
    }

    pub fn contains_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn contains_member(&self, class: &str, member: &str) -> bool {
        self.members.contains(&(class.to_string(), member.to_string()))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Counts describing one strip run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StripReport {
    pub entries: usize,
    pub classes_rewritten: usize,
    pub markers_removed: usize,
}

/// Removes markers of every scheme from targeted classes and members.
#[derive(Clone, Debug)]
pub struct Stripper {
    targets: StripTargets,
    markers: HashSet<String>,
}

impl Stripper {
    pub fn new(targets: StripTargets) -> Self {
        Self {
            targets,
            markers: AnnotationScheme::all_marker_descriptors().into_iter().collect(),
        }
    }

    pub fn targets(&self) -> &StripTargets {
        &self.targets
    }

    fn strip<T: Annotated>(&self, target: &mut T) -> usize {
        target.remove_annotations(|descriptor| self.markers.contains(descriptor))
    }

    /// Strip one listed class in place, returning the number of markers removed.
    ///
    /// Listed methods and fields lose their markers, and so does the class.
    pub fn strip_class(&self, class: &mut ClassModel) -> usize {
        let name = class.name.clone();
        let mut removed = 0;
        for method in &mut class.methods {
            if self.targets.contains_member(&name, &method.signature()) {
                removed += self.strip(method);
            }
        }
        for field in &mut class.fields {
            let listed = self.targets.contains_member(&name, &field.name)
                || self
                    .targets
                    .contains_member(&name, &format!("{}{}", field.name, field.descriptor));
            if listed {
                removed += self.strip(field);
            }
        }
        removed += self.strip(class);
        removed
    }

    /// Copy `input` to `output`, rewriting listed classes.
    ///
    /// Every other entry is copied verbatim. Rewritten classes keep their
    /// original timestamp. Targets absent from the archive are ignored.
    pub fn process(&self, input: &Path, output: &Path) -> EngineResult<StripReport> {
        remove_existing(output)?;
        let result = self.write_output(input, output);
        match &result {
            Ok(report) => tracing::info!(
                output = %output.display(),
                entries = report.entries,
                rewritten = report.classes_rewritten,
                markers = report.markers_removed,
                "strip complete"
            ),
            Err(_) => {
                if output.exists() {
                    discard_partial(output);
                }
            }
        }
        result
    }

    fn write_output(&self, input: &Path, output: &Path) -> EngineResult<StripReport> {
        let mut archive = open_archive(input)?;
        let mut out = OutputArchive::create(output)?;
        let mut report = StripReport::default();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(distmerge_archive::ArchiveError::from)?;
            let name = file.name().to_string();
            let class_name = name.strip_suffix(".class").filter(|c| self.targets.contains_class(c));
            match class_name {
                Some(class_name) if !file.is_dir() => {
                    let modified = file.last_modified();
                    let mut data = Vec::new();
                    std::io::Read::read_to_end(&mut file, &mut data)
                        .map_err(|e| EngineError::io(input, e))?;
                    let mut class = decode(&data).map_err(|e| EngineError::class(class_name, e))?;
                    let removed = self.strip_class(&mut class);
                    let bytes = encode(&class).map_err(|e| EngineError::class(class_name, e))?;
                    out.write_entry_at(&name, &bytes, modified)?;
                    tracing::debug!(class = class_name, markers = removed, "stripped class");
                    report.classes_rewritten += 1;
                    report.markers_removed += removed;
                }
                _ => out.copy_raw(file)?,
            }
            report.entries += 1;
        }

        let mut writer = out.finish()?;
        writer.flush().map_err(|e| EngineError::io(output, e))?;
        Ok(report)
    }
}
