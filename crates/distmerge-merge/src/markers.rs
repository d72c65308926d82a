//! Class definitions for the marker types themselves.
//!
//! When markers are injected, the output also needs the annotation and enum
//! types they refer to. These are assembled here from the scheme's names
//! instead of being shipped as prebuilt class files.

use distmerge_classfile::code::{op, CodeBuilder};
use distmerge_classfile::model::{PoolRef, RefWidth};
use distmerge_classfile::{access, Annotation, Attribute, ClassModel, Constant, ElementValue, FieldEntry, MethodEntry};

use crate::scheme::AnnotationScheme;

const OBJECT: &str = "java/lang/Object";
const ENUM: &str = "java/lang/Enum";
const ANNOTATION: &str = "java/lang/annotation/Annotation";

/// A `Signature`-style attribute whose body is one Utf8 reference.
fn utf8_attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: name.into(),
        body: vec![0, 0],
        refs: vec![PoolRef {
            offset: 0,
            width: RefWidth::U16,
            constant: Constant::utf8(value),
        }],
    }
}

/// `AnnotationDefault` holding a class literal.
fn class_default(descriptor: &str) -> Attribute {
    Attribute {
        name: "AnnotationDefault".into(),
        body: vec![b'c', 0, 0],
        refs: vec![PoolRef {
            offset: 1,
            width: RefWidth::U16,
            constant: Constant::utf8(descriptor),
        }],
    }
}

fn retention_runtime() -> Annotation {
    Annotation::new("Ljava/lang/annotation/Retention;").with(
        "value",
        ElementValue::enum_value("Ljava/lang/annotation/RetentionPolicy;", "RUNTIME"),
    )
}

fn target(kinds: &[&str]) -> Annotation {
    let values = kinds
        .iter()
        .map(|k| ElementValue::enum_value("Ljava/lang/annotation/ElementType;", *k))
        .collect();
    Annotation::new("Ljava/lang/annotation/Target;").with("value", ElementValue::Array(values))
}

fn annotation_interface(name: &str) -> ClassModel {
    let mut class = ClassModel::new(name, Some(OBJECT));
    class.access = access::PUBLIC | access::INTERFACE | access::ABSTRACT | access::ANNOTATION;
    class.interfaces.push(ANNOTATION.into());
    class
}

fn holder(scheme: AnnotationScheme) -> ClassModel {
    let mut class = annotation_interface(&scheme.holder_class());
    class.methods.push(MethodEntry::new(
        access::PUBLIC | access::ABSTRACT,
        "value",
        format!("()L{};", scheme.value_class()),
    ));
    if let Some(key) = scheme.interface_key() {
        let mut method = MethodEntry::new(access::PUBLIC | access::ABSTRACT, key, "()Ljava/lang/Class;");
        method.attributes.push(utf8_attribute("Signature", "()Ljava/lang/Class<*>;"));
        method.attributes.push(class_default("Ljava/lang/Object;"));
        class.methods.push(method);
    }

    class.annotations.push(retention_runtime());
    class
        .annotations
        .push(target(&["TYPE", "FIELD", "METHOD", "CONSTRUCTOR", "PACKAGE"]));
    if let Some(container) = scheme.container_class() {
        class.annotations.push(
            Annotation::new("Ljava/lang/annotation/Repeatable;")
                .with("value", ElementValue::Class(format!("L{container};"))),
        );
    }
    class
}

fn container(scheme: AnnotationScheme, name: &str) -> ClassModel {
    let mut class = annotation_interface(name);
    class.methods.push(MethodEntry::new(
        access::PUBLIC | access::ABSTRACT,
        "value",
        format!("()[L{};", scheme.holder_class()),
    ));
    class.annotations.push(retention_runtime());
    class.annotations.push(target(&["TYPE"]));
    class
}

/// A Java enum with the usual `values`, `valueOf` and static initializer.
fn side_enum(scheme: AnnotationScheme) -> ClassModel {
    let name = scheme.value_class();
    let descriptor = format!("L{name};");
    let array = format!("[L{name};");
    let constants = scheme.side_values();

    let mut class = ClassModel::new(name.as_str(), Some(ENUM));
    class.access = access::PUBLIC | access::FINAL | access::SUPER | access::ENUM;
    class
        .attributes
        .push(utf8_attribute("Signature", &format!("Ljava/lang/Enum<{descriptor}>;")));

    for constant in constants {
        class.fields.push(FieldEntry::new(
            access::PUBLIC | access::STATIC | access::FINAL | access::ENUM,
            constant,
            descriptor.as_str(),
        ));
    }
    class.fields.push(FieldEntry::new(
        access::PRIVATE | access::STATIC | access::FINAL | access::SYNTHETIC,
        "$VALUES",
        array.as_str(),
    ));

    let mut values = CodeBuilder::new(1, 0);
    values
        .field(op::GETSTATIC, &name, "$VALUES", &array)
        .method(op::INVOKEVIRTUAL, &array, "clone", "()Ljava/lang/Object;")
        .type_insn(op::CHECKCAST, &array)
        .op(op::ARETURN);
    class.methods.push(
        MethodEntry::new(access::PUBLIC | access::STATIC, "values", format!("(){array}"))
            .with_code(values.build()),
    );

    let mut value_of = CodeBuilder::new(2, 1);
    value_of
        .ldc(Constant::class(&name))
        .op(op::ALOAD_0)
        .method(
            op::INVOKESTATIC,
            ENUM,
            "valueOf",
            "(Ljava/lang/Class;Ljava/lang/String;)Ljava/lang/Enum;",
        )
        .type_insn(op::CHECKCAST, &name)
        .op(op::ARETURN);
    class.methods.push(
        MethodEntry::new(
            access::PUBLIC | access::STATIC,
            "valueOf",
            format!("(Ljava/lang/String;){descriptor}"),
        )
        .with_code(value_of.build()),
    );

    let mut init = CodeBuilder::new(3, 3);
    init.op(op::ALOAD_0)
        .op(op::ALOAD_1)
        .op(op::ILOAD_2)
        .method(op::INVOKESPECIAL, ENUM, "<init>", "(Ljava/lang/String;I)V")
        .op(op::RETURN);
    class.methods.push(
        MethodEntry::new(access::PRIVATE, "<init>", "(Ljava/lang/String;I)V").with_code(init.build()),
    );

    if scheme == AnnotationScheme::Api {
        // Two constants: ordinal 0 is the client, ordinal 1 the dedicated server.
        let mut is_client = CodeBuilder::new(2, 1);
        is_client
            .op(op::ALOAD_0)
            .method(op::INVOKEVIRTUAL, &name, "ordinal", "()I")
            .push_int(1)
            .op(op::IXOR)
            .op(op::IRETURN);
        class
            .methods
            .push(MethodEntry::new(access::PUBLIC, "isClient", "()Z").with_code(is_client.build()));

        let mut is_server = CodeBuilder::new(1, 1);
        is_server
            .op(op::ALOAD_0)
            .method(op::INVOKEVIRTUAL, &name, "ordinal", "()I")
            .op(op::IRETURN);
        class.methods.push(
            MethodEntry::new(access::PUBLIC, "isDedicatedServer", "()Z").with_code(is_server.build()),
        );
    }

    let mut clinit = CodeBuilder::new(4, 0);
    for (ordinal, constant) in constants.iter().enumerate() {
        clinit
            .type_insn(op::NEW, &name)
            .op(op::DUP)
            .ldc(Constant::string(constant))
            .push_int(ordinal as i32)
            .method(op::INVOKESPECIAL, &name, "<init>", "(Ljava/lang/String;I)V")
            .field(op::PUTSTATIC, &name, constant, &descriptor);
    }
    clinit
        .push_int(constants.len() as i32)
        .type_insn(op::ANEWARRAY, &name);
    for (ordinal, constant) in constants.iter().enumerate() {
        clinit
            .op(op::DUP)
            .push_int(ordinal as i32)
            .field(op::GETSTATIC, &name, constant, &descriptor)
            .op(op::AASTORE);
    }
    clinit
        .field(op::PUTSTATIC, &name, "$VALUES", &array)
        .op(op::RETURN);
    class
        .methods
        .push(MethodEntry::new(access::STATIC, "<clinit>", "()V").with_code(clinit.build()));

    class
}

/// Class definitions for every marker type of `scheme`, in
/// [`AnnotationScheme::marker_classes`] order.
pub fn marker_class_models(scheme: AnnotationScheme) -> Vec<ClassModel> {
    let mut classes = vec![holder(scheme), side_enum(scheme)];
    if let Some(name) = scheme.container_class() {
        classes.push(container(scheme, &name));
    }
    classes
}
