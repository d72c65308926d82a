//! Constant pool: parsing an existing pool and building a fresh one.
//!
//! - [`ConstantPool`] holds the raw, index-based entries of a decoded class
//!   and resolves indices into owned [`Constant`] values.
//! - [`PoolBuilder`] interns owned constants while a class is encoded,
//!   de-duplicating as it goes, and serializes entries in interning order.

use std::collections::HashMap;

use crate::bytes::{put_u16, ByteReader};
use crate::constant::{Bootstrap, Constant, DynamicRef, MemberRef, NameAndType};
use crate::error::{ClassError, ClassResult};
use crate::mutf8;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// Nesting limit for method handles and dynamic constants, which can only
/// be exceeded by a pool whose references loop back on themselves.
const MAX_RESOLVE_DEPTH: usize = 32;

#[derive(Clone, Debug)]
enum RawConstant {
    Utf8(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
}

impl RawConstant {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Utf8(_) => "Utf8",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Long(_) => "Long",
            Self::Double(_) => "Double",
            Self::Class(_) => "Class",
            Self::String(_) => "String",
            Self::FieldRef(..) => "Fieldref",
            Self::MethodRef(..) => "Methodref",
            Self::InterfaceMethodRef(..) => "InterfaceMethodref",
            Self::NameAndType(..) => "NameAndType",
            Self::MethodHandle(..) => "MethodHandle",
            Self::MethodType(_) => "MethodType",
            Self::Dynamic(..) => "Dynamic",
            Self::InvokeDynamic(..) => "InvokeDynamic",
            Self::Module(_) => "Module",
            Self::Package(_) => "Package",
        }
    }
}

/// The constant pool of a class being decoded.
#[derive(Debug, Default)]
pub struct ConstantPool {
    /// Slot 0 and the upper halves of long/double entries are `None`.
    entries: Vec<Option<RawConstant>>,
    bootstraps: Vec<(u16, Vec<u16>)>,
}

impl ConstantPool {
    pub(crate) fn parse(r: &mut ByteReader<'_>) -> ClassResult<Self> {
        let count = r.u16()? as usize;
        let mut entries = Vec::with_capacity(count.max(1));
        entries.push(None);

        while entries.len() < count {
            let index = entries.len() as u16;
            let tag = r.u8()?;
            let entry = match tag {
                TAG_UTF8 => {
                    let len = r.u16()? as usize;
                    RawConstant::Utf8(r.bytes(len)?.to_vec())
                }
                TAG_INTEGER => RawConstant::Integer(r.i32()?),
                TAG_FLOAT => RawConstant::Float(r.u32()?),
                TAG_LONG => RawConstant::Long(r.u64()? as i64),
                TAG_DOUBLE => RawConstant::Double(r.u64()?),
                TAG_CLASS => RawConstant::Class(r.u16()?),
                TAG_STRING => RawConstant::String(r.u16()?),
                TAG_FIELDREF => RawConstant::FieldRef(r.u16()?, r.u16()?),
                TAG_METHODREF => RawConstant::MethodRef(r.u16()?, r.u16()?),
                TAG_INTERFACE_METHODREF => RawConstant::InterfaceMethodRef(r.u16()?, r.u16()?),
                TAG_NAME_AND_TYPE => RawConstant::NameAndType(r.u16()?, r.u16()?),
                TAG_METHOD_HANDLE => RawConstant::MethodHandle(r.u8()?, r.u16()?),
                TAG_METHOD_TYPE => RawConstant::MethodType(r.u16()?),
                TAG_DYNAMIC => RawConstant::Dynamic(r.u16()?, r.u16()?),
                TAG_INVOKE_DYNAMIC => RawConstant::InvokeDynamic(r.u16()?, r.u16()?),
                TAG_MODULE => RawConstant::Module(r.u16()?),
                TAG_PACKAGE => RawConstant::Package(r.u16()?),
                _ => return Err(ClassError::UnknownConstantTag { tag, index }),
            };
            let wide = matches!(entry, RawConstant::Long(_) | RawConstant::Double(_));
            entries.push(Some(entry));
            if wide {
                entries.push(None);
            }
        }

        Ok(Self {
            entries,
            bootstraps: Vec::new(),
        })
    }

    /// Install the class's `BootstrapMethods` table, parsed from its body.
    pub(crate) fn set_bootstraps(&mut self, body: &[u8]) -> ClassResult<()> {
        let mut r = ByteReader::new(body);
        let count = r.u16()?;
        let mut bootstraps = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let handle = r.u16()?;
            let argc = r.u16()?;
            let mut args = Vec::with_capacity(argc as usize);
            for _ in 0..argc {
                args.push(r.u16()?);
            }
            bootstraps.push((handle, args));
        }
        self.bootstraps = bootstraps;
        Ok(())
    }

    /// Number of slots, including the unused slot 0.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    fn raw(&self, index: u16) -> ClassResult<&RawConstant> {
        self.entries
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(ClassError::BadPoolIndex {
                index,
                size: self.entries.len(),
            })
    }

    fn unexpected(&self, index: u16, expected: &'static str) -> ClassError {
        ClassError::UnexpectedConstant {
            index,
            expected,
            actual: self.raw(index).map(RawConstant::kind_name).unwrap_or("nothing"),
        }
    }

    /// Raw bytes of a `Utf8` entry.
    pub fn utf8_bytes(&self, index: u16) -> ClassResult<&[u8]> {
        match self.raw(index)? {
            RawConstant::Utf8(bytes) => Ok(bytes),
            _ => Err(self.unexpected(index, "Utf8")),
        }
    }

    /// Decoded text of a `Utf8` entry.
    pub fn utf8(&self, index: u16) -> ClassResult<String> {
        mutf8::decode(self.utf8_bytes(index)?)
    }

    /// Internal name referenced by a `Class` entry.
    pub fn class_name(&self, index: u16) -> ClassResult<String> {
        match self.raw(index)? {
            RawConstant::Class(name) => self.utf8(*name),
            _ => Err(self.unexpected(index, "Class")),
        }
    }

    fn name_and_type(&self, index: u16) -> ClassResult<NameAndType> {
        match self.raw(index)? {
            RawConstant::NameAndType(name, descriptor) => Ok(NameAndType {
                name: self.utf8_bytes(*name)?.to_vec(),
                descriptor: self.utf8_bytes(*descriptor)?.to_vec(),
            }),
            _ => Err(self.unexpected(index, "NameAndType")),
        }
    }

    fn member_ref(&self, class: u16, nat: u16) -> ClassResult<MemberRef> {
        let class = match self.raw(class)? {
            RawConstant::Class(name) => self.utf8_bytes(*name)?.to_vec(),
            _ => return Err(self.unexpected(class, "Class")),
        };
        let nat = self.name_and_type(nat)?;
        Ok(MemberRef {
            class,
            name: nat.name,
            descriptor: nat.descriptor,
        })
    }

    fn dynamic_ref(&self, bootstrap: u16, nat: u16, depth: usize) -> ClassResult<DynamicRef> {
        let (handle, args) = self
            .bootstraps
            .get(bootstrap as usize)
            .ok_or(ClassError::BadBootstrapIndex(bootstrap))?;
        let bootstrap = Bootstrap {
            handle: self.resolve_nested(*handle, depth + 1)?,
            arguments: args
                .iter()
                .map(|a| self.resolve_nested(*a, depth + 1))
                .collect::<ClassResult<Vec<_>>>()?,
        };
        let nat = self.name_and_type(nat)?;
        Ok(DynamicRef {
            bootstrap: Box::new(bootstrap),
            name: nat.name,
            descriptor: nat.descriptor,
        })
    }

    /// Resolve an index into an owned constant.
    pub fn resolve(&self, index: u16) -> ClassResult<Constant> {
        self.resolve_nested(index, 0)
    }

    fn resolve_nested(&self, index: u16, depth: usize) -> ClassResult<Constant> {
        if depth > MAX_RESOLVE_DEPTH {
            return Err(ClassError::ConstantTooDeep { index });
        }
        let utf8 = |i: u16| self.utf8_bytes(i).map(<[u8]>::to_vec);
        Ok(match self.raw(index)? {
            RawConstant::Utf8(bytes) => Constant::Utf8(bytes.clone()),
            RawConstant::Integer(v) => Constant::Integer(*v),
            RawConstant::Float(v) => Constant::Float(*v),
            RawConstant::Long(v) => Constant::Long(*v),
            RawConstant::Double(v) => Constant::Double(*v),
            RawConstant::Class(name) => Constant::Class(utf8(*name)?),
            RawConstant::String(s) => Constant::String(utf8(*s)?),
            RawConstant::FieldRef(c, nat) => Constant::FieldRef(self.member_ref(*c, *nat)?),
            RawConstant::MethodRef(c, nat) => Constant::MethodRef(self.member_ref(*c, *nat)?),
            RawConstant::InterfaceMethodRef(c, nat) => {
                Constant::InterfaceMethodRef(self.member_ref(*c, *nat)?)
            }
            RawConstant::NameAndType(..) => Constant::NameAndType(self.name_and_type(index)?),
            RawConstant::MethodHandle(kind, reference) => Constant::MethodHandle {
                kind: *kind,
                reference: Box::new(self.resolve_nested(*reference, depth + 1)?),
            },
            RawConstant::MethodType(d) => Constant::MethodType(utf8(*d)?),
            RawConstant::Dynamic(b, nat) => Constant::Dynamic(self.dynamic_ref(*b, *nat, depth)?),
            RawConstant::InvokeDynamic(b, nat) => {
                Constant::InvokeDynamic(self.dynamic_ref(*b, *nat, depth)?)
            }
            RawConstant::Module(name) => Constant::Module(utf8(*name)?),
            RawConstant::Package(name) => Constant::Package(utf8(*name)?),
        })
    }
}

/// Interns constants into a fresh pool while a class is encoded.
///
/// Entries are written in slot order. A slot is normally allocated after
/// everything the constant references, but [`PoolBuilder::reserve`] can
/// claim a low slot first and fill it in later.
#[derive(Debug)]
pub struct PoolBuilder {
    /// Encoded entry per slot, starting at slot 1. The upper half of a
    /// long/double entry is empty.
    slots: Vec<Vec<u8>>,
    index: HashMap<Constant, u16>,
    pending: Vec<Constant>,
    bootstrap_bytes: Vec<u8>,
    bootstrap_index: HashMap<Bootstrap, u16>,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            pending: Vec::new(),
            bootstrap_bytes: Vec::new(),
            bootstrap_index: HashMap::new(),
        }
    }

    /// The `constant_pool_count` field: one more than the highest index used.
    pub fn count(&self) -> u16 {
        // allocate() keeps this within u16
        self.slots.len() as u16 + 1
    }

    pub fn utf8(&mut self, s: &str) -> ClassResult<u16> {
        self.intern(&Constant::utf8(s))
    }

    pub fn class(&mut self, internal_name: &str) -> ClassResult<u16> {
        self.intern(&Constant::class(internal_name))
    }

    /// Intern a constant (and everything it references), returning its index.
    pub fn intern(&mut self, constant: &Constant) -> ClassResult<u16> {
        if let Some(&index) = self.index.get(constant) {
            return Ok(index);
        }
        let entry = self.entry(constant)?;
        let index = self.allocate(constant)?;
        self.slots[index as usize - 1] = entry;
        Ok(index)
    }

    /// Claim the next slot for a constant without interning what it references.
    ///
    /// Used for `ldc` operands, which must land below 256 while the `Utf8`
    /// text behind them can go anywhere. The slot stays empty until
    /// [`PoolBuilder::fill_reserved`] runs.
    pub fn reserve(&mut self, constant: &Constant) -> ClassResult<u16> {
        if let Some(&index) = self.index.get(constant) {
            return Ok(index);
        }
        let index = self.allocate(constant)?;
        self.pending.push(constant.clone());
        Ok(index)
    }

    /// Encode every reserved constant into its slot.
    pub fn fill_reserved(&mut self) -> ClassResult<()> {
        for constant in std::mem::take(&mut self.pending) {
            let entry = self.entry(&constant)?;
            if let Some(&index) = self.index.get(&constant) {
                self.slots[index as usize - 1] = entry;
            }
        }
        Ok(())
    }

    fn allocate(&mut self, constant: &Constant) -> ClassResult<u16> {
        let index = self.count();
        let slots: u32 = if constant.is_wide() { 2 } else { 1 };
        if index as u32 + slots > u16::MAX as u32 {
            return Err(ClassError::PoolOverflow);
        }
        for _ in 0..slots {
            self.slots.push(Vec::new());
        }
        self.index.insert(constant.clone(), index);
        Ok(index)
    }

    /// Encode one entry, interning whatever it references.
    fn entry(&mut self, constant: &Constant) -> ClassResult<Vec<u8>> {
        let mut entry = Vec::new();
        match constant {
            Constant::Utf8(bytes) => {
                let len = u16::try_from(bytes.len()).map_err(|_| ClassError::TooMany {
                    what: "Utf8 length",
                    count: bytes.len(),
                })?;
                entry.push(TAG_UTF8);
                put_u16(&mut entry, len);
                entry.extend_from_slice(bytes);
            }
            Constant::Integer(v) => {
                entry.push(TAG_INTEGER);
                entry.extend_from_slice(&v.to_be_bytes());
            }
            Constant::Float(bits) => {
                entry.push(TAG_FLOAT);
                entry.extend_from_slice(&bits.to_be_bytes());
            }
            Constant::Long(v) => {
                entry.push(TAG_LONG);
                entry.extend_from_slice(&v.to_be_bytes());
            }
            Constant::Double(bits) => {
                entry.push(TAG_DOUBLE);
                entry.extend_from_slice(&bits.to_be_bytes());
            }
            Constant::Class(name) => {
                let name = self.intern(&Constant::Utf8(name.clone()))?;
                entry.push(TAG_CLASS);
                put_u16(&mut entry, name);
            }
            Constant::String(s) => {
                let s = self.intern(&Constant::Utf8(s.clone()))?;
                entry.push(TAG_STRING);
                put_u16(&mut entry, s);
            }
            Constant::FieldRef(r) => self.member_entry(&mut entry, TAG_FIELDREF, r)?,
            Constant::MethodRef(r) => self.member_entry(&mut entry, TAG_METHODREF, r)?,
            Constant::InterfaceMethodRef(r) => {
                self.member_entry(&mut entry, TAG_INTERFACE_METHODREF, r)?
            }
            Constant::NameAndType(nat) => {
                let name = self.intern(&Constant::Utf8(nat.name.clone()))?;
                let descriptor = self.intern(&Constant::Utf8(nat.descriptor.clone()))?;
                entry.push(TAG_NAME_AND_TYPE);
                put_u16(&mut entry, name);
                put_u16(&mut entry, descriptor);
            }
            Constant::MethodHandle { kind, reference } => {
                let reference = self.intern(reference)?;
                entry.push(TAG_METHOD_HANDLE);
                entry.push(*kind);
                put_u16(&mut entry, reference);
            }
            Constant::MethodType(d) => {
                let d = self.intern(&Constant::Utf8(d.clone()))?;
                entry.push(TAG_METHOD_TYPE);
                put_u16(&mut entry, d);
            }
            Constant::Dynamic(d) => self.dynamic_entry(&mut entry, TAG_DYNAMIC, d)?,
            Constant::InvokeDynamic(d) => self.dynamic_entry(&mut entry, TAG_INVOKE_DYNAMIC, d)?,
            Constant::Module(name) => {
                let name = self.intern(&Constant::Utf8(name.clone()))?;
                entry.push(TAG_MODULE);
                put_u16(&mut entry, name);
            }
            Constant::Package(name) => {
                let name = self.intern(&Constant::Utf8(name.clone()))?;
                entry.push(TAG_PACKAGE);
                put_u16(&mut entry, name);
            }
        }
        Ok(entry)
    }

    fn member_entry(&mut self, entry: &mut Vec<u8>, tag: u8, r: &MemberRef) -> ClassResult<()> {
        let class = self.intern(&Constant::Class(r.class.clone()))?;
        let nat = self.intern(&Constant::NameAndType(r.name_and_type()))?;
        entry.push(tag);
        put_u16(entry, class);
        put_u16(entry, nat);
        Ok(())
    }

    fn dynamic_entry(&mut self, entry: &mut Vec<u8>, tag: u8, d: &DynamicRef) -> ClassResult<()> {
        let bootstrap = self.intern_bootstrap(&d.bootstrap)?;
        let nat = self.intern(&Constant::NameAndType(d.name_and_type()))?;
        entry.push(tag);
        put_u16(entry, bootstrap);
        put_u16(entry, nat);
        Ok(())
    }

    fn intern_bootstrap(&mut self, bootstrap: &Bootstrap) -> ClassResult<u16> {
        if let Some(&index) = self.bootstrap_index.get(bootstrap) {
            return Ok(index);
        }
        let handle = self.intern(&bootstrap.handle)?;
        let mut args = Vec::with_capacity(bootstrap.arguments.len());
        for arg in &bootstrap.arguments {
            args.push(self.intern(arg)?);
        }

        let index = crate::bytes::count_u16("bootstrap method", self.bootstrap_index.len())?;
        put_u16(&mut self.bootstrap_bytes, handle);
        put_u16(
            &mut self.bootstrap_bytes,
            crate::bytes::count_u16("bootstrap argument", args.len())?,
        );
        for arg in args {
            put_u16(&mut self.bootstrap_bytes, arg);
        }
        self.bootstrap_index.insert(bootstrap.clone(), index);
        Ok(index)
    }

    /// Body of the `BootstrapMethods` attribute, if any dynamic constant was interned.
    pub fn bootstrap_methods(&self) -> Option<Vec<u8>> {
        if self.bootstrap_index.is_empty() {
            return None;
        }
        let mut body = Vec::with_capacity(2 + self.bootstrap_bytes.len());
        put_u16(&mut body, self.bootstrap_index.len() as u16);
        body.extend_from_slice(&self.bootstrap_bytes);
        Some(body)
    }

    /// Append `constant_pool_count` followed by every entry.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        debug_assert!(self.pending.is_empty(), "reserved constants not filled");
        put_u16(out, self.count());
        for entry in &self.slots {
            out.extend_from_slice(entry);
        }
    }
}
