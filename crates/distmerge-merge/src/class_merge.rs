//! Merging one class pair, and tagging classes found on one side only.

use distmerge_classfile::ClassModel;

use crate::error::{MergeError, MergeResult};
use crate::members::{merge_members, Fields, MemberKind, Merged, Methods, Origin, Side};
use crate::scheme::AnnotationScheme;
use crate::structure::{reconcile_inner_classes, reconcile_interfaces};

/// Outcome of merging one class pair.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedClass {
    /// The reconciled client copy.
    pub class: ClassModel,
    pub client_only_members: usize,
    pub server_only_members: usize,
    pub exclusive_interfaces: usize,
}

/// Merges class pairs, marking exclusive elements with an optional scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClassMerger {
    scheme: Option<AnnotationScheme>,
}

impl ClassMerger {
    /// Create a merger. With no scheme, nothing is ever annotated.
    pub fn new(scheme: Option<AnnotationScheme>) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> Option<AnnotationScheme> {
        self.scheme
    }

    /// Mark a whole class as present on one side only.
    pub fn tag_exclusive(&self, class: &mut ClassModel, side: Side) {
        if let Some(scheme) = self.scheme {
            scheme.add(class, side);
        }
    }

    fn members<M: MemberKind>(
        &self,
        client: &[M::Item],
        server: &[M::Item],
        counts: &mut (usize, usize),
    ) -> MergeResult<Vec<M::Item>>
    where
        M::Item: distmerge_classfile::Annotated,
    {
        let scheme = self.scheme;
        let merged = merge_members::<M>(client, server, |item, side| {
            if let Some(scheme) = scheme {
                scheme.add(item, side);
            }
        })?;
        Ok(merged
            .into_iter()
            .map(|Merged { item, origin }| {
                match origin {
                    Origin::ClientOnly => counts.0 += 1,
                    Origin::ServerOnly => counts.1 += 1,
                    Origin::Shared => {}
                }
                item
            })
            .collect())
    }

    /// Merge a class present on both sides into one reconciled class.
    ///
    /// The client copy supplies everything not subject to merging: access
    /// flags, super class, class-level annotations and attributes.
    pub fn merge(&self, client: ClassModel, server: ClassModel) -> MergeResult<MergedClass> {
        let name = client.name.clone();
        let wrap = |source: MergeError| MergeError::Class {
            class: name.clone(),
            source: Box::new(source),
        };

        let mut counts = (0, 0);
        let mut class = client;
        class.fields = self
            .members::<Fields>(&class.fields, &server.fields, &mut counts)
            .map_err(wrap)?;
        class.methods = self
            .members::<Methods>(&class.methods, &server.methods, &mut counts)
            .map_err(wrap)?;
        class.inner_classes = reconcile_inner_classes(&class.inner_classes, &server.inner_classes);

        let (interfaces, delta) = reconcile_interfaces(&class.interfaces, &server.interfaces);
        class.interfaces = interfaces;
        if let Some(scheme) = self.scheme {
            scheme.add_interfaces(&mut class, &delta.client_only, &delta.server_only);
        }

        tracing::debug!(
            class = %class.name,
            client_only = counts.0,
            server_only = counts.1,
            interfaces = delta.len(),
            "merged class pair"
        );
        Ok(MergedClass {
            class,
            client_only_members: counts.0,
            server_only_members: counts.1,
            exclusive_interfaces: delta.len(),
        })
    }
}
