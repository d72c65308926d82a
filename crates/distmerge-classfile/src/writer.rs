//! Class file encoding.
//!
//! The pool is rebuilt from scratch. Slots for single-byte `ldc` operands
//! are reserved before anything else so that they land in the low 256
//! slots; the `Utf8` text they point at is placed after them.

use crate::annotation::{self, Annotation};
use crate::bytes::{count_u16, put_u16, put_u32};
use crate::error::{ClassError, ClassResult};
use crate::model::{Attribute, ClassModel, InnerClassEntry, RefWidth};
use crate::pool::PoolBuilder;
use crate::reader::MAGIC;

/// Encode a [`ClassModel`] into class file bytes.
pub fn encode(class: &ClassModel) -> ClassResult<Vec<u8>> {
    let mut pool = PoolBuilder::new();
    intern_narrow_refs(class, &mut pool)?;

    let mut body = Vec::new();
    put_u16(&mut body, class.access);
    put_u16(&mut body, pool.class(&class.name)?);
    match &class.super_name {
        Some(super_name) => put_u16(&mut body, pool.class(super_name)?),
        None => put_u16(&mut body, 0),
    }
    put_u16(&mut body, count_u16("interface", class.interfaces.len())?);
    for interface in &class.interfaces {
        put_u16(&mut body, pool.class(interface)?);
    }

    put_u16(&mut body, count_u16("field", class.fields.len())?);
    for field in &class.fields {
        write_member(
            &mut body,
            &mut pool,
            field.access,
            &field.name,
            &field.descriptor,
            &field.annotations,
            &field.attributes,
        )?;
    }
    put_u16(&mut body, count_u16("method", class.methods.len())?);
    for method in &class.methods {
        write_member(
            &mut body,
            &mut pool,
            method.access,
            &method.name,
            &method.descriptor,
            &method.annotations,
            &method.attributes,
        )?;
    }

    let mut attributes = Vec::new();
    let mut count = write_attributes(&mut attributes, &mut pool, &class.annotations, &class.attributes)?;
    if !class.inner_classes.is_empty() {
        let table = inner_classes_body(&class.inner_classes, &mut pool)?;
        write_attribute(&mut attributes, &mut pool, "InnerClasses", &table)?;
        count += 1;
    }
    // Last, so every dynamic constant has been interned.
    if let Some(table) = pool.bootstrap_methods() {
        write_attribute(&mut attributes, &mut pool, "BootstrapMethods", &table)?;
        count += 1;
    }
    put_u16(&mut body, count_u16("class attribute", count)?);
    body.extend_from_slice(&attributes);

    let mut out = Vec::with_capacity(body.len() + 1024);
    put_u32(&mut out, MAGIC);
    put_u16(&mut out, class.minor_version);
    put_u16(&mut out, class.major_version);
    pool.write_to(&mut out);
    out.extend_from_slice(&body);
    Ok(out)
}

fn intern_narrow_refs(class: &ClassModel, pool: &mut PoolBuilder) -> ClassResult<()> {
    let all = class
        .fields
        .iter()
        .flat_map(|f| f.attributes.iter())
        .chain(class.methods.iter().flat_map(|m| m.attributes.iter()))
        .chain(class.attributes.iter());
    for attribute in all {
        for r in attribute.refs.iter().filter(|r| r.width == RefWidth::U8) {
            pool.reserve(&r.constant)?;
        }
    }
    pool.fill_reserved()
}

fn write_member(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    access: u16,
    name: &str,
    descriptor: &str,
    annotations: &[Annotation],
    attributes: &[Attribute],
) -> ClassResult<()> {
    put_u16(out, access);
    put_u16(out, pool.utf8(name)?);
    put_u16(out, pool.utf8(descriptor)?);
    let mut encoded = Vec::new();
    let count = write_attributes(&mut encoded, pool, annotations, attributes)?;
    put_u16(out, count_u16("member attribute", count)?);
    out.extend_from_slice(&encoded);
    Ok(())
}

/// Write opaque attributes followed by the annotation attribute, returning the count.
fn write_attributes(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    annotations: &[Annotation],
    attributes: &[Attribute],
) -> ClassResult<usize> {
    for attribute in attributes {
        let body = patch(attribute, pool)?;
        write_attribute(out, pool, &attribute.name, &body)?;
    }
    if annotations.is_empty() {
        return Ok(attributes.len());
    }
    let body = annotation::write_list(annotations, pool)?;
    write_attribute(out, pool, "RuntimeVisibleAnnotations", &body)?;
    Ok(attributes.len() + 1)
}

fn write_attribute(out: &mut Vec<u8>, pool: &mut PoolBuilder, name: &str, body: &[u8]) -> ClassResult<()> {
    put_u16(out, pool.utf8(name)?);
    let len = u32::try_from(body.len()).map_err(|_| ClassError::TooMany {
        what: "attribute byte",
        count: body.len(),
    })?;
    put_u32(out, len);
    out.extend_from_slice(body);
    Ok(())
}

/// Copy an attribute body with every reference pointing into `pool`.
fn patch(attribute: &Attribute, pool: &mut PoolBuilder) -> ClassResult<Vec<u8>> {
    let mut body = attribute.body.clone();
    for r in &attribute.refs {
        let index = pool.intern(&r.constant)?;
        let malformed = || ClassError::MalformedAttribute {
            attribute: attribute.name.clone(),
            reason: format!("reference offset {} outside body", r.offset),
        };
        match r.width {
            RefWidth::U8 => {
                let slot = body.get_mut(r.offset).ok_or_else(malformed)?;
                *slot = u8::try_from(index).map_err(|_| ClassError::LdcIndexOverflow(index))?;
            }
            RefWidth::U16 => {
                let slot = body.get_mut(r.offset..r.offset + 2).ok_or_else(malformed)?;
                slot.copy_from_slice(&index.to_be_bytes());
            }
        }
    }
    Ok(body)
}

fn inner_classes_body(entries: &[InnerClassEntry], pool: &mut PoolBuilder) -> ClassResult<Vec<u8>> {
    let mut body = Vec::with_capacity(2 + entries.len() * 8);
    put_u16(&mut body, count_u16("inner class", entries.len())?);
    for entry in entries {
        put_u16(&mut body, pool.class(&entry.name)?);
        match &entry.outer_name {
            Some(outer) => put_u16(&mut body, pool.class(outer)?),
            None => put_u16(&mut body, 0),
        }
        match &entry.inner_name {
            Some(inner) => put_u16(&mut body, pool.utf8(inner)?),
            None => put_u16(&mut body, 0),
        }
        put_u16(&mut body, entry.access);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ElementValue;
    use crate::code::{op, CodeBuilder};
    use crate::constant::{Bootstrap, Constant, DynamicRef};
    use crate::model::{access, FieldEntry, MethodEntry, PoolRef};
    use crate::reader::decode;

    fn sample() -> ClassModel {
        let mut class = ClassModel::new("pkg/Sample", Some("java/lang/Object"));
        class.interfaces.push("java/lang/Runnable".into());
        class.annotations.push(
            Annotation::new("Lpkg/Side;").with("value", ElementValue::enum_value("Lpkg/Dist;", "CLIENT")),
        );

        let mut constant = FieldEntry::new(access::PUBLIC | access::STATIC | access::FINAL, "LIMIT", "J");
        constant.attributes.push(Attribute {
            name: "ConstantValue".into(),
            body: vec![0, 0],
            refs: vec![PoolRef {
                offset: 0,
                width: RefWidth::U16,
                constant: Constant::Long(1 << 40),
            }],
        });
        class.fields.push(constant);
        class.fields.push(FieldEntry::new(access::PRIVATE, "count", "I"));

        let mut init = CodeBuilder::new(1, 1);
        init.line(3)
            .op(op::ALOAD_0)
            .method(op::INVOKESPECIAL, "java/lang/Object", "<init>", "()V")
            .op(op::RETURN);
        class
            .methods
            .push(MethodEntry::new(access::PUBLIC, "<init>", "()V").with_code(init.build()));

        let mut run = CodeBuilder::new(2, 1);
        run.line(10)
            .ldc(Constant::string("hello"))
            .op(op::POP)
            .push_int(70_000)
            .op(op::POP)
            .op(op::RETURN);
        let mut method = MethodEntry::new(access::PUBLIC, "run", "()V").with_code(run.build());
        method.annotations.push(Annotation::new("Ljava/lang/Deprecated;"));
        class.methods.push(method);

        class.inner_classes.push(InnerClassEntry {
            name: "pkg/Sample$Inner".into(),
            outer_name: Some("pkg/Sample".into()),
            inner_name: Some("Inner".into()),
            access: access::STATIC,
        });
        class
    }

    #[test]
    fn encoded_class_decodes_to_the_same_model() {
        let class = sample();
        let bytes = encode(&class).unwrap();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, class);
        assert_eq!(decoded.method("run", "()V").unwrap().line_hint(), Some(10));
    }

    #[test]
    fn encoding_is_deterministic() {
        let class = sample();
        let first = encode(&class).unwrap();
        let second = encode(&decode(&first).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn members_move_between_classes() {
        let source = decode(&encode(&sample()).unwrap()).unwrap();
        let mut target = ClassModel::new("pkg/Other", Some("java/lang/Object"));
        target.methods.push(source.method("run", "()V").unwrap().clone());

        let decoded = decode(&encode(&target).unwrap()).unwrap();
        assert_eq!(decoded.methods[0], source.methods[1]);
    }

    #[test]
    fn invokedynamic_regenerates_bootstrap_table() {
        let bootstrap = Bootstrap {
            handle: Constant::MethodHandle {
                kind: 6,
                reference: Box::new(Constant::method_ref(
                    "java/lang/invoke/StringConcatFactory",
                    "makeConcatWithConstants",
                    "()Ljava/lang/invoke/CallSite;",
                )),
            },
            arguments: vec![Constant::string("\u{1}!")],
        };
        let mut code = vec![0, 2, 0, 1];
        code.extend_from_slice(&7u32.to_be_bytes());
        code.extend_from_slice(&[op::ALOAD_0, op::INVOKEDYNAMIC, 0, 0, 0, 0, op::ARETURN]);
        code.extend_from_slice(&[0, 0, 0, 0]);
        let attr = Attribute {
            name: "Code".into(),
            body: code,
            refs: vec![PoolRef {
                offset: 10,
                width: RefWidth::U16,
                constant: Constant::InvokeDynamic(DynamicRef {
                    bootstrap: Box::new(bootstrap),
                    name: b"makeConcatWithConstants".to_vec(),
                    descriptor: b"(Ljava/lang/String;)Ljava/lang/String;".to_vec(),
                }),
            }],
        };
        let mut class = ClassModel::new("pkg/Concat", Some("java/lang/Object"));
        class.methods.push(
            MethodEntry::new(access::STATIC, "concat", "(Ljava/lang/String;)Ljava/lang/String;")
                .with_code(attr),
        );

        let decoded = decode(&encode(&class).unwrap()).unwrap();
        assert_eq!(decoded, class);
        assert!(decoded.attributes.is_empty());
    }

    /// A class whose pool opens with 200 `String` entries and keeps their
    /// text in slots 201..=400, with one method loading each string.
    fn low_string_pool_class() -> Vec<u8> {
        const STRINGS: u16 = 200;
        let mut pool = Vec::new();
        for i in 0..STRINGS {
            pool.push(8);
            put_u16(&mut pool, STRINGS + 1 + i);
        }
        let utf8 = |pool: &mut Vec<u8>, text: &str| {
            pool.push(1);
            put_u16(pool, text.len() as u16);
            pool.extend_from_slice(text.as_bytes());
        };
        for i in 0..STRINGS {
            utf8(&mut pool, &format!("literal {i}"));
        }
        utf8(&mut pool, "pkg/Strings"); // 401
        pool.push(7); // 402
        put_u16(&mut pool, 401);
        utf8(&mut pool, "strings"); // 403
        utf8(&mut pool, "()V"); // 404
        utf8(&mut pool, "Code"); // 405

        let mut code = Vec::new();
        for i in 1..=STRINGS {
            code.extend_from_slice(&[op::LDC, i as u8, op::POP]);
        }
        code.push(op::RETURN);

        let mut out = Vec::new();
        put_u32(&mut out, MAGIC);
        put_u16(&mut out, 0);
        put_u16(&mut out, 52);
        put_u16(&mut out, 406);
        out.extend_from_slice(&pool);
        put_u16(&mut out, access::PUBLIC | access::SUPER);
        put_u16(&mut out, 402);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, 1);
        put_u16(&mut out, access::PUBLIC | access::STATIC);
        put_u16(&mut out, 403);
        put_u16(&mut out, 404);
        put_u16(&mut out, 1);
        put_u16(&mut out, 405);
        put_u32(&mut out, 12 + code.len() as u32);
        put_u16(&mut out, 1);
        put_u16(&mut out, 0);
        put_u32(&mut out, code.len() as u32);
        out.extend_from_slice(&code);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        out
    }

    #[test]
    fn many_ldc_strings_keep_single_byte_slots() {
        let class = decode(&low_string_pool_class()).unwrap();
        let bytes = encode(&class).unwrap();
        // First pool entry is still a String, not its text.
        assert_eq!(bytes[10], 8);
        assert_eq!(decode(&bytes).unwrap(), class);
    }

    #[test]
    fn ldc_beyond_first_256_slots_is_reported() {
        let mut class = ClassModel::new("pkg/Big", None);
        for i in 0..300 {
            let mut code = CodeBuilder::new(1, 0);
            code.ldc(Constant::Integer(100_000 + i)).op(op::POP).op(op::RETURN);
            class
                .methods
                .push(MethodEntry::new(access::STATIC, format!("m{i}"), "()V").with_code(code.build()));
        }
        assert!(matches!(encode(&class), Err(ClassError::LdcIndexOverflow(_))));
    }
}
