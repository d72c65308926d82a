//! Owned, index-free constant pool values.
//!
//! Every pool reference found while decoding is resolved into a [`Constant`]
//! that carries its full payload. Members can then move between classes with
//! no index remapping: the encoder interns whatever constants it meets into a
//! fresh pool.

use crate::mutf8;

/// A fully resolved constant pool entry.
///
/// Text payloads are kept as raw modified UTF-8 so that string literals with
/// unpaired surrogates survive a decode/encode cycle untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(Vec<u8>),
    Integer(i32),
    /// IEEE-754 bits, so the value can be hashed.
    Float(u32),
    Long(i64),
    /// IEEE-754 bits, so the value can be hashed.
    Double(u64),
    Class(Vec<u8>),
    String(Vec<u8>),
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    NameAndType(NameAndType),
    MethodHandle { kind: u8, reference: Box<Constant> },
    MethodType(Vec<u8>),
    Dynamic(DynamicRef),
    InvokeDynamic(DynamicRef),
    Module(Vec<u8>),
    Package(Vec<u8>),
}

/// Owner class plus name and descriptor of a field or method reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub class: Vec<u8>,
    pub name: Vec<u8>,
    pub descriptor: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NameAndType {
    pub name: Vec<u8>,
    pub descriptor: Vec<u8>,
}

/// A `Dynamic` / `InvokeDynamic` constant with its bootstrap method inlined.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DynamicRef {
    pub bootstrap: Box<Bootstrap>,
    pub name: Vec<u8>,
    pub descriptor: Vec<u8>,
}

/// One entry of a class's `BootstrapMethods` table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bootstrap {
    /// Always a [`Constant::MethodHandle`].
    pub handle: Constant,
    pub arguments: Vec<Constant>,
}

impl Constant {
    pub fn utf8(s: &str) -> Self {
        Self::Utf8(mutf8::encode(s))
    }

    pub fn class(internal_name: &str) -> Self {
        Self::Class(mutf8::encode(internal_name))
    }

    pub fn string(s: &str) -> Self {
        Self::String(mutf8::encode(s))
    }

    pub fn field_ref(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::FieldRef(MemberRef::new(owner, name, descriptor))
    }

    pub fn method_ref(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::MethodRef(MemberRef::new(owner, name, descriptor))
    }

    pub fn interface_method_ref(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::InterfaceMethodRef(MemberRef::new(owner, name, descriptor))
    }

    /// Long and double entries occupy two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }

    /// Short human-readable kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Utf8(_) => "Utf8",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Long(_) => "Long",
            Self::Double(_) => "Double",
            Self::Class(_) => "Class",
            Self::String(_) => "String",
            Self::FieldRef(_) => "Fieldref",
            Self::MethodRef(_) => "Methodref",
            Self::InterfaceMethodRef(_) => "InterfaceMethodref",
            Self::NameAndType(_) => "NameAndType",
            Self::MethodHandle { .. } => "MethodHandle",
            Self::MethodType(_) => "MethodType",
            Self::Dynamic(_) => "Dynamic",
            Self::InvokeDynamic(_) => "InvokeDynamic",
            Self::Module(_) => "Module",
            Self::Package(_) => "Package",
        }
    }
}

impl MemberRef {
    pub fn new(owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            class: mutf8::encode(owner),
            name: mutf8::encode(name),
            descriptor: mutf8::encode(descriptor),
        }
    }

    pub(crate) fn name_and_type(&self) -> NameAndType {
        NameAndType {
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

impl DynamicRef {
    pub(crate) fn name_and_type(&self) -> NameAndType {
        NameAndType {
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_constants() {
        assert!(Constant::Long(1).is_wide());
        assert!(Constant::Double(0).is_wide());
        assert!(!Constant::Integer(1).is_wide());
        assert!(!Constant::utf8("x").is_wide());
    }

    #[test]
    fn helpers_encode_text() {
        assert_eq!(Constant::class("a/B"), Constant::Class(b"a/B".to_vec()));
        match Constant::method_ref("a/B", "run", "()V") {
            Constant::MethodRef(r) => {
                assert_eq!(r.class, b"a/B");
                assert_eq!(r.name_and_type().descriptor, b"()V");
            }
            other => panic!("expected Methodref, got {other:?}"),
        }
    }
}
