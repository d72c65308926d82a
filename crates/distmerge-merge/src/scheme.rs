//! Provenance marker schemes.
//!
//! Three generations of side-marker annotations exist, each with its own
//! package and names. A run uses exactly one of them for every marker it
//! writes; stripping recognizes all three.

use std::fmt;
use std::str::FromStr;

use distmerge_classfile::{Annotated, Annotation, ClassModel, ElementValue};

use crate::error::{MergeError, MergeResult};
use crate::members::Side;
use crate::version::{GameVersion, MC_1_13, MC_1_8};

/// Static description of one scheme.
#[derive(Debug)]
struct SchemeInfo {
    package: &'static str,
    holder: &'static str,
    value: &'static str,
    container: Option<&'static str>,
    interface_key: Option<&'static str>,
    client: &'static str,
    server: &'static str,
}

const CPW: SchemeInfo = SchemeInfo {
    package: "cpw/mods/fml/relauncher",
    holder: "SideOnly",
    value: "Side",
    container: None,
    interface_key: None,
    client: "CLIENT",
    server: "SERVER",
};

const NMF: SchemeInfo = SchemeInfo {
    package: "net/minecraftforge/fml/relauncher",
    holder: "SideOnly",
    value: "Side",
    container: None,
    interface_key: None,
    client: "CLIENT",
    server: "SERVER",
};

const API: SchemeInfo = SchemeInfo {
    package: "net/minecraftforge/api/distmarker",
    holder: "OnlyIn",
    value: "Dist",
    container: Some("OnlyIns"),
    interface_key: Some("_interface"),
    client: "CLIENT",
    server: "DEDICATED_SERVER",
};

/// One of the three marker generations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationScheme {
    /// `cpw.mods.fml.relauncher.SideOnly`, used before 1.8.
    Cpw,
    /// `net.minecraftforge.fml.relauncher.SideOnly`, used from 1.8 to 1.12.
    Nmf,
    /// `net.minecraftforge.api.distmarker.OnlyIn`, used from 1.13 on.
    Api,
}

impl AnnotationScheme {
    pub const ALL: [AnnotationScheme; 3] = [Self::Cpw, Self::Nmf, Self::Api];

    fn info(self) -> &'static SchemeInfo {
        match self {
            Self::Cpw => &CPW,
            Self::Nmf => &NMF,
            Self::Api => &API,
        }
    }

    /// Short name as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cpw => "CPW",
            Self::Nmf => "NMF",
            Self::Api => "API",
        }
    }

    /// Pick the scheme in use at a given game version.
    pub fn for_version(version: &GameVersion) -> Self {
        if !version.reaches(&MC_1_8) {
            Self::Cpw
        } else if !version.reaches(&MC_1_13) {
            Self::Nmf
        } else {
            Self::Api
        }
    }

    /// Parse a version identifier and pick its scheme.
    pub fn from_version(version: &str) -> MergeResult<Self> {
        Ok(Self::for_version(&version.parse()?))
    }

    fn internal(self, simple: &str) -> String {
        format!("{}/{}", self.info().package, simple)
    }

    pub fn holder_class(self) -> String {
        self.internal(self.info().holder)
    }

    pub fn value_class(self) -> String {
        self.internal(self.info().value)
    }

    pub fn container_class(self) -> Option<String> {
        self.info().container.map(|c| self.internal(c))
    }

    /// Element name recording an interface, if this scheme marks interfaces.
    pub fn interface_key(self) -> Option<&'static str> {
        self.info().interface_key
    }

    /// Enum constant naming a side.
    pub fn side_value(self, side: Side) -> &'static str {
        match side {
            Side::Client => self.info().client,
            Side::Server => self.info().server,
        }
    }

    /// Enum constants in declaration order.
    pub fn side_values(self) -> [&'static str; 2] {
        [self.info().client, self.info().server]
    }

    /// Internal names of every marker type: holder, value enum, then container.
    pub fn marker_classes(self) -> Vec<String> {
        let mut classes = vec![self.holder_class(), self.value_class()];
        classes.extend(self.container_class());
        classes
    }

    /// Type descriptors of every marker type.
    pub fn marker_descriptors(self) -> Vec<String> {
        self.marker_classes()
            .into_iter()
            .map(|c| format!("L{c};"))
            .collect()
    }

    /// Marker type descriptors across all three schemes.
    pub fn all_marker_descriptors() -> Vec<String> {
        Self::ALL
            .iter()
            .flat_map(|s| s.marker_descriptors())
            .collect()
    }

    fn marker(self, side: Side) -> Annotation {
        Annotation::new(format!("L{};", self.holder_class())).with(
            "value",
            ElementValue::enum_value(format!("L{};", self.value_class()), self.side_value(side)),
        )
    }

    fn interface_marker(self, key: &str, side: Side, interface: &str) -> Annotation {
        self.marker(side)
            .with(key, ElementValue::Class(format!("L{interface};")))
    }

    /// Mark a class, field or method as exclusive to `side`.
    pub fn add<T: Annotated>(self, target: &mut T, side: Side) {
        target.annotations_mut().push(self.marker(side));
    }

    /// Record which side introduced each exclusive interface.
    ///
    /// Only schemes with an interface key support this; for the others it
    /// does nothing. One exclusive interface gets a single marker, several
    /// get one container holding a marker each, client entries first.
    pub fn add_interfaces(self, class: &mut ClassModel, client_only: &[String], server_only: &[String]) {
        let (Some(key), Some(container)) = (self.interface_key(), self.container_class()) else {
            return;
        };
        let entries: Vec<(Side, &String)> = client_only
            .iter()
            .map(|i| (Side::Client, i))
            .chain(server_only.iter().map(|i| (Side::Server, i)))
            .collect();

        match entries.as_slice() {
            [] => {}
            [(side, interface)] => class
                .annotations
                .push(self.interface_marker(key, *side, interface)),
            _ => {
                let markers = entries
                    .iter()
                    .map(|(side, interface)| {
                        ElementValue::Annotation(self.interface_marker(key, *side, interface))
                    })
                    .collect();
                class.annotations.push(
                    Annotation::new(format!("L{container};")).with("value", ElementValue::Array(markers)),
                );
            }
        }
    }
}

impl fmt::Display for AnnotationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnnotationScheme {
    type Err = MergeError;

    /// Accepts a scheme name in any case, or a version identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.name().eq_ignore_ascii_case(s.trim()))
            .map_or_else(|| Self::from_version(s), Ok)
    }
}
