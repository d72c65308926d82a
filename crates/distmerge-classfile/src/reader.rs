//! Class file decoding.

use crate::annotation;
use crate::bytes::ByteReader;
use crate::error::{ClassError, ClassResult};
use crate::model::{Attribute, ClassModel, FieldEntry, InnerClassEntry, MethodEntry};
use crate::pool::ConstantPool;
use crate::scan::scan_attribute;

pub(crate) const MAGIC: u32 = 0xCAFE_BABE;

struct RawAttribute<'a> {
    name: String,
    body: &'a [u8],
}

struct RawMember<'a> {
    access: u16,
    name: String,
    descriptor: String,
    attributes: Vec<RawAttribute<'a>>,
}

fn read_attributes<'a>(
    r: &mut ByteReader<'a>,
    pool: &ConstantPool,
) -> ClassResult<Vec<RawAttribute<'a>>> {
    let count = r.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = pool.utf8(r.u16()?)?;
        let len = r.u32()? as usize;
        attributes.push(RawAttribute {
            name,
            body: r.bytes(len)?,
        });
    }
    Ok(attributes)
}

fn read_members<'a>(r: &mut ByteReader<'a>, pool: &ConstantPool) -> ClassResult<Vec<RawMember<'a>>> {
    let count = r.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access = r.u16()?;
        let name = pool.utf8(r.u16()?)?;
        let descriptor = pool.utf8(r.u16()?)?;
        let attributes = read_attributes(r, pool)?;
        members.push(RawMember {
            access,
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}

/// Split raw attributes into structured annotations and opaque attributes.
fn convert_attributes(
    raw: Vec<RawAttribute<'_>>,
    pool: &ConstantPool,
) -> ClassResult<(Vec<annotation::Annotation>, Vec<Attribute>)> {
    let mut annotations = Vec::new();
    let mut attributes = Vec::with_capacity(raw.len());
    for attr in raw {
        if attr.name == "RuntimeVisibleAnnotations" {
            annotations.extend(annotation::parse_list(attr.body, pool)?);
        } else {
            attributes.push(scan_attribute(attr.name, attr.body, pool)?);
        }
    }
    Ok((annotations, attributes))
}

fn parse_inner_classes(body: &[u8], pool: &ConstantPool) -> ClassResult<Vec<InnerClassEntry>> {
    let mut r = ByteReader::new(body);
    let count = r.u16()?;
    let optional = |index: u16, f: &dyn Fn(u16) -> ClassResult<String>| {
        if index == 0 {
            Ok(None)
        } else {
            f(index).map(Some)
        }
    };
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = pool.class_name(r.u16()?)?;
        let outer_name = optional(r.u16()?, &|i| pool.class_name(i))?;
        let inner_name = optional(r.u16()?, &|i| pool.utf8(i))?;
        let access = r.u16()?;
        entries.push(InnerClassEntry {
            name,
            outer_name,
            inner_name,
            access,
        });
    }
    Ok(entries)
}

/// Decode a class file into a [`ClassModel`].
pub fn decode(data: &[u8]) -> ClassResult<ClassModel> {
    let mut r = ByteReader::new(data);
    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ClassError::InvalidMagic(magic));
    }
    let minor_version = r.u16()?;
    let major_version = r.u16()?;
    let mut pool = ConstantPool::parse(&mut r)?;

    let access = r.u16()?;
    let name = pool.class_name(r.u16()?)?;
    let super_name = match r.u16()? {
        0 => None,
        index => Some(pool.class_name(index)?),
    };
    let interface_count = r.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(r.u16()?)?);
    }

    let raw_fields = read_members(&mut r, &pool)?;
    let raw_methods = read_members(&mut r, &pool)?;
    let mut raw_class_attributes = read_attributes(&mut r, &pool)?;
    if r.remaining() > 0 {
        tracing::debug!(class = %name, trailing = r.remaining(), "ignoring bytes after class attributes");
    }

    // Dynamic constants need the bootstrap table before anything resolves them.
    if let Some(pos) = raw_class_attributes
        .iter()
        .position(|a| a.name == "BootstrapMethods")
    {
        let bootstraps = raw_class_attributes.remove(pos);
        pool.set_bootstraps(bootstraps.body)?;
    }

    let mut inner_classes = Vec::new();
    if let Some(pos) = raw_class_attributes
        .iter()
        .position(|a| a.name == "InnerClasses")
    {
        let table = raw_class_attributes.remove(pos);
        inner_classes = parse_inner_classes(table.body, &pool)?;
    }

    let mut fields = Vec::with_capacity(raw_fields.len());
    for raw in raw_fields {
        let (annotations, attributes) = convert_attributes(raw.attributes, &pool)?;
        fields.push(FieldEntry {
            access: raw.access,
            name: raw.name,
            descriptor: raw.descriptor,
            annotations,
            attributes,
        });
    }

    let mut methods = Vec::with_capacity(raw_methods.len());
    for raw in raw_methods {
        let (annotations, attributes) = convert_attributes(raw.attributes, &pool)?;
        methods.push(MethodEntry {
            access: raw.access,
            name: raw.name,
            descriptor: raw.descriptor,
            annotations,
            attributes,
        });
    }

    let (annotations, attributes) = convert_attributes(raw_class_attributes, &pool)?;

    Ok(ClassModel {
        minor_version,
        major_version,
        access,
        name,
        super_name,
        interfaces,
        fields,
        methods,
        inner_classes,
        annotations,
        attributes,
    })
}
