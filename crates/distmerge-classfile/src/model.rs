//! Structural view of one compiled class.
//!
//! This is the narrow surface the merge logic works against: ordered field
//! and method lists, the interface list, the inner-class table and the
//! runtime-visible annotations. Everything else rides along as opaque
//! [`Attribute`]s.

use crate::annotation::Annotation;
use crate::code;
use crate::constant::Constant;

/// Access flag bits shared by classes, fields and methods.
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
}

/// Width of a constant pool index embedded in an attribute body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefWidth {
    /// Single-byte operand of `ldc`.
    U8,
    U16,
}

/// A position inside an attribute body that holds a pool index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolRef {
    pub offset: usize,
    pub width: RefWidth,
    pub constant: Constant,
}

/// An attribute kept as bytes plus symbolic pool references.
///
/// The bytes at each reference's offset are zero; the encoder overwrites
/// them with indices into the pool it builds. Two attributes with the same
/// content therefore compare equal whichever class they were read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub body: Vec<u8>,
    /// Sorted by offset.
    pub refs: Vec<PoolRef>,
}

impl Attribute {
    /// An attribute whose body holds no pool references.
    pub fn plain(name: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            body,
            refs: Vec::new(),
        }
    }

    /// The constant referenced at `offset`, if any.
    pub fn ref_at(&self, offset: usize) -> Option<&Constant> {
        self.refs
            .binary_search_by_key(&offset, |r| r.offset)
            .ok()
            .map(|i| &self.refs[i].constant)
    }
}

/// Things that carry runtime-visible annotations.
pub trait Annotated {
    fn annotations(&self) -> &[Annotation];
    fn annotations_mut(&mut self) -> &mut Vec<Annotation>;

    /// Drop every annotation whose type descriptor satisfies `pred`,
    /// returning how many were removed.
    fn remove_annotations(&mut self, mut pred: impl FnMut(&str) -> bool) -> usize
    where
        Self: Sized,
    {
        let list = self.annotations_mut();
        let before = list.len();
        list.retain(|a| !pred(&a.type_descriptor));
        before - list.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldEntry {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub annotations: Vec<Annotation>,
    pub attributes: Vec<Attribute>,
}

impl FieldEntry {
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            annotations: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodEntry {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub annotations: Vec<Annotation>,
    pub attributes: Vec<Attribute>,
}

impl MethodEntry {
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            annotations: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: Attribute) -> Self {
        self.attributes.push(code);
        self
    }

    /// `name + descriptor`, the identity of a method within its class.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    pub fn code(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == "Code")
    }

    /// Lowest source line referenced by this method's line table.
    pub fn line_hint(&self) -> Option<u32> {
        self.code().and_then(code::lowest_line)
    }
}

/// One row of the `InnerClasses` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub name: String,
    pub outer_name: Option<String>,
    pub inner_name: Option<String>,
    pub access: u16,
}

impl InnerClassEntry {
    /// Identity used when unioning two tables; access flags are not part of it.
    pub fn same_entry(&self, other: &Self) -> bool {
        self.name == other.name
            && self.outer_name == other.outer_name
            && self.inner_name == other.inner_name
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassModel {
    pub minor_version: u16,
    pub major_version: u16,
    pub access: u16,
    /// Binary class name, e.g. `net/minecraft/client/Main`.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MethodEntry>,
    pub inner_classes: Vec<InnerClassEntry>,
    pub annotations: Vec<Annotation>,
    pub attributes: Vec<Attribute>,
}

impl ClassModel {
    /// An empty Java 8 class.
    pub fn new(name: impl Into<String>, super_name: Option<&str>) -> Self {
        Self {
            minor_version: 0,
            major_version: 52,
            access: access::PUBLIC | access::SUPER,
            name: name.into(),
            super_name: super_name.map(str::to_string),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
            annotations: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodEntry> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }
}

impl Annotated for ClassModel {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
}

impl Annotated for FieldEntry {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
}

impl Annotated for MethodEntry {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_class_identity_ignores_access() {
        let a = InnerClassEntry {
            name: "a/B$C".into(),
            outer_name: Some("a/B".into()),
            inner_name: Some("C".into()),
            access: access::PUBLIC,
        };
        let mut b = a.clone();
        b.access = access::PRIVATE | access::STATIC;
        assert!(a.same_entry(&b));

        b.outer_name = None;
        assert!(!a.same_entry(&b));
    }

    #[test]
    fn remove_annotations_by_type() {
        let mut field = FieldEntry::new(0, "x", "I");
        field.annotations.push(Annotation::new("La/Keep;"));
        field.annotations.push(Annotation::new("La/Drop;"));
        assert_eq!(field.remove_annotations(|t| t == "La/Drop;"), 1);
        assert_eq!(field.annotations.len(), 1);
        assert_eq!(field.annotations[0].type_descriptor, "La/Keep;");
    }

    #[test]
    fn method_without_code_has_no_line() {
        let m = MethodEntry::new(access::ABSTRACT, "run", "()V");
        assert_eq!(m.line_hint(), None);
        assert_eq!(m.signature(), "run()V");
    }
}
