//! Structured runtime-visible annotations.
//!
//! Only the `RuntimeVisibleAnnotations` attribute of classes, fields and
//! methods is decoded this way, since those are the annotations that get
//! added and removed. Every other annotation-bearing attribute stays opaque.

use crate::bytes::{count_u16, put_u16, ByteReader};
use crate::constant::Constant;
use crate::error::{ClassError, ClassResult};
use crate::pool::{ConstantPool, PoolBuilder};

/// One annotation: its type descriptor and element/value pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    /// Field descriptor of the annotation type, e.g. `Lpkg/OnlyIn;`.
    pub type_descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
}

/// The value of one annotation element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementValue {
    /// Primitive or string constant; `tag` is one of `BCDFIJSZs`.
    Const { tag: u8, value: Constant },
    Enum {
        type_descriptor: String,
        const_name: String,
    },
    /// Return descriptor of a class literal, e.g. `Ljava/lang/Object;`.
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl Annotation {
    pub fn new(type_descriptor: impl Into<String>) -> Self {
        Self {
            type_descriptor: type_descriptor.into(),
            elements: Vec::new(),
        }
    }

    /// Builder-style element append.
    pub fn with(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.elements.push((name.into(), value));
        self
    }

    /// Look up an element by name.
    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub(crate) fn parse(r: &mut ByteReader<'_>, pool: &ConstantPool) -> ClassResult<Self> {
        let type_descriptor = pool.utf8(r.u16()?)?;
        let count = r.u16()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.utf8(r.u16()?)?;
            elements.push((name, ElementValue::parse(r, pool)?));
        }
        Ok(Self {
            type_descriptor,
            elements,
        })
    }

    pub(crate) fn write(&self, pool: &mut PoolBuilder, out: &mut Vec<u8>) -> ClassResult<()> {
        put_u16(out, pool.utf8(&self.type_descriptor)?);
        put_u16(out, count_u16("annotation element", self.elements.len())?);
        for (name, value) in &self.elements {
            put_u16(out, pool.utf8(name)?);
            value.write(pool, out)?;
        }
        Ok(())
    }
}

impl ElementValue {
    pub fn enum_value(type_descriptor: impl Into<String>, const_name: impl Into<String>) -> Self {
        Self::Enum {
            type_descriptor: type_descriptor.into(),
            const_name: const_name.into(),
        }
    }

    fn parse(r: &mut ByteReader<'_>, pool: &ConstantPool) -> ClassResult<Self> {
        let tag = r.u8()?;
        Ok(match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => Self::Const {
                tag,
                value: pool.resolve(r.u16()?)?,
            },
            b'e' => Self::Enum {
                type_descriptor: pool.utf8(r.u16()?)?,
                const_name: pool.utf8(r.u16()?)?,
            },
            b'c' => Self::Class(pool.utf8(r.u16()?)?),
            b'@' => Self::Annotation(Annotation::parse(r, pool)?),
            b'[' => {
                let count = r.u16()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(Self::parse(r, pool)?);
                }
                Self::Array(values)
            }
            _ => {
                return Err(ClassError::MalformedAttribute {
                    attribute: "RuntimeVisibleAnnotations".into(),
                    reason: format!("unknown element tag {tag:#04x}"),
                })
            }
        })
    }

    fn write(&self, pool: &mut PoolBuilder, out: &mut Vec<u8>) -> ClassResult<()> {
        match self {
            Self::Const { tag, value } => {
                out.push(*tag);
                put_u16(out, pool.intern(value)?);
            }
            Self::Enum {
                type_descriptor,
                const_name,
            } => {
                out.push(b'e');
                put_u16(out, pool.utf8(type_descriptor)?);
                put_u16(out, pool.utf8(const_name)?);
            }
            Self::Class(descriptor) => {
                out.push(b'c');
                put_u16(out, pool.utf8(descriptor)?);
            }
            Self::Annotation(annotation) => {
                out.push(b'@');
                annotation.write(pool, out)?;
            }
            Self::Array(values) => {
                out.push(b'[');
                put_u16(out, count_u16("array element", values.len())?);
                for value in values {
                    value.write(pool, out)?;
                }
            }
        }
        Ok(())
    }
}

/// Parse the body of a `RuntimeVisibleAnnotations` attribute.
pub(crate) fn parse_list(body: &[u8], pool: &ConstantPool) -> ClassResult<Vec<Annotation>> {
    let mut r = ByteReader::new(body);
    let count = r.u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(Annotation::parse(&mut r, pool)?);
    }
    Ok(annotations)
}

/// Serialize a `RuntimeVisibleAnnotations` attribute body.
pub(crate) fn write_list(annotations: &[Annotation], pool: &mut PoolBuilder) -> ClassResult<Vec<u8>> {
    let mut body = Vec::new();
    put_u16(&mut body, count_u16("annotation", annotations.len())?);
    for annotation in annotations {
        annotation.write(pool, &mut body)?;
    }
    Ok(body)
}
