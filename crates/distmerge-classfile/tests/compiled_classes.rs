//! Decoding and re-encoding classes built by a real compiler.
//!
//! `fixtures/src` holds the sources. `proguard_a.class` is assembled by
//! `fixtures/src/proguard_a.py` with an obfuscator's pool layout: every
//! `ldc` string first, their text after.

use distmerge_classfile::{decode, encode, ClassModel, Constant};

const MANY: &[u8] = include_bytes!("fixtures/Many.class");
const LAMBDAS: &[u8] = include_bytes!("fixtures/Lambdas.class");
const SQUARE: &[u8] = include_bytes!("fixtures/Lambdas$Square.class");
const PROGUARD: &[u8] = include_bytes!("fixtures/proguard_a.class");

const TAG_STRING: u8 = 8;
/// Magic, minor, major and `constant_pool_count`.
const POOL_START: usize = 10;

fn method_names(class: &ClassModel) -> Vec<&str> {
    class.methods.iter().map(|m| m.name.as_str()).collect()
}

/// Encode a decoded class, checking the result decodes to the same model
/// and encodes to the same bytes a second time.
fn reencode(bytes: &[u8]) -> (ClassModel, Vec<u8>) {
    let class = decode(bytes).unwrap();
    let encoded = encode(&class).unwrap();
    let again = decode(&encoded).unwrap();
    assert_eq!(again, class);
    assert_eq!(encode(&again).unwrap(), encoded);
    (class, encoded)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn javac_classes_reencode() {
    for bytes in [MANY, LAMBDAS, SQUARE] {
        reencode(bytes);
    }
}

#[test]
fn string_table_class_keeps_members() {
    let (class, _) = reencode(MANY);
    assert_eq!(class.name, "pkg/Many");
    assert_eq!(method_names(&class), ["<init>", "letters", "main", "<clinit>"]);
    assert_eq!(class.fields.len(), 1);
    assert_eq!(class.fields[0].descriptor, "[Ljava/lang/String;");
}

#[test]
fn lambdas_keep_member_order_and_tables() {
    let (class, encoded) = reencode(LAMBDAS);
    assert_eq!(
        method_names(&class),
        ["<init>", "add", "run", "main", "lambda$run$1", "lambda$add$0"]
    );
    assert_eq!(class.fields[0].name, "jobs");

    let add = class.method("add", "(Ljava/lang/String;I)V").unwrap();
    assert_eq!(add.annotations[0].type_descriptor, "Ljava/lang/Deprecated;");
    assert!(class.inner_classes.iter().any(|i| i.name == "pkg/Lambdas$Square"));

    // Rebuilt, not carried over as an opaque attribute.
    assert!(class.attributes.iter().all(|a| a.name != "BootstrapMethods"));
    assert!(contains(&encoded, b"BootstrapMethods"));
    assert!(contains(&encoded, b"StackMapTable"));
}

#[test]
fn record_keeps_object_method_bootstraps() {
    let (class, encoded) = reencode(SQUARE);
    assert_eq!(class.super_name.as_deref(), Some("java/lang/Record"));
    assert_eq!(
        method_names(&class),
        ["<init>", "area", "toString", "hashCode", "equals", "side"]
    );
    assert!(class.attributes.iter().any(|a| a.name == "Record"));
    assert!(contains(&encoded, b"java/lang/runtime/ObjectMethods"));
}

#[test]
fn obfuscated_pool_keeps_ldc_strings_in_low_slots() {
    let (class, encoded) = reencode(PROGUARD);
    assert_eq!(class.name, "a/a");
    assert_eq!(method_names(&class), ["a", "main"]);

    // 250 three-byte String entries open the rebuilt pool.
    for slot in 0..250 {
        assert_eq!(encoded[POOL_START + slot * 3], TAG_STRING, "slot {}", slot + 1);
    }

    let main = class.method("main", "([Ljava/lang/String;)V").unwrap();
    let code = &main.attributes[0];
    assert_eq!(code.name, "Code");
    assert_eq!(code.ref_at(9), Some(&Constant::string("a000")));
}
