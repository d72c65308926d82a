use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use distmerge_archive::{OutputArchive, ZipArchive};
use distmerge_classfile::code::{op, CodeBuilder};
use distmerge_classfile::{decode, encode, ClassModel, ElementValue, FieldEntry, MethodEntry};
use distmerge_engine::{
    AnnotationScheme, ClassFilter, EngineError, MergeEngine, StripTargets, Stripper,
};

fn method(name: &str, line: u16) -> MethodEntry {
    let mut code = CodeBuilder::new(0, 1);
    code.line(line).op(op::RETURN);
    MethodEntry::new(0, name, "()V").with_code(code.build())
}

fn class(name: &str, fields: &[&str], methods: &[(&str, u16)]) -> ClassModel {
    let mut class = ClassModel::new(name, Some("java/lang/Object"));
    class.fields = fields.iter().map(|f| FieldEntry::new(0, *f, "I")).collect();
    class.methods = methods.iter().map(|(m, l)| method(m, *l)).collect();
    class
}

fn write_jar(path: &Path, classes: &[ClassModel], resources: &[(&str, &[u8])]) {
    let mut out = OutputArchive::create(path).unwrap();
    for (name, data) in resources {
        out.write_entry(name, data).unwrap();
    }
    for c in classes {
        out.write_class(&c.name, &encode(c).unwrap()).unwrap();
    }
    out.finish().unwrap();
}

fn open(path: &Path) -> ZipArchive<Cursor<Vec<u8>>> {
    ZipArchive::new(Cursor::new(std::fs::read(path).unwrap())).unwrap()
}

fn read_class(path: &Path, name: &str) -> ClassModel {
    let mut archive = open(path);
    let mut data = Vec::new();
    archive
        .by_name(&format!("{name}.class"))
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();
    decode(&data).unwrap()
}

fn entry_names(path: &Path) -> Vec<String> {
    open(path).file_names().map(str::to_string).collect()
}

fn method_names(class: &ClassModel) -> Vec<&str> {
    class.methods.iter().map(|m| m.name.as_str()).collect()
}

fn side_of(annotations: &[distmerge_classfile::Annotation]) -> Option<String> {
    match annotations {
        [a] => match a.element("value") {
            Some(ElementValue::Enum { const_name, .. }) => Some(const_name.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn has_any_annotation(class: &ClassModel) -> bool {
    !class.annotations.is_empty()
        || class.fields.iter().any(|f| !f.annotations.is_empty())
        || class.methods.iter().any(|m| !m.annotations.is_empty())
}

struct Fixture {
    _dir: tempfile::TempDir,
    client: PathBuf,
    server: PathBuf,
    output: PathBuf,
}

fn fixture(client: &[ClassModel], server: &[ClassModel]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let client_path = dir.path().join("client.jar");
    let server_path = dir.path().join("server.jar");
    write_jar(
        &client_path,
        client,
        &[("assets/lang.json", b"{}"), ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n")],
    );
    write_jar(&server_path, server, &[("log4j2.xml", b"<x/>")]);
    let output = dir.path().join("out/merged.jar");
    Fixture {
        client: client_path,
        server: server_path,
        output,
        _dir: dir,
    }
}

#[test]
fn merging_a_jar_with_itself_adds_no_markers() {
    let classes = vec![
        class("a/One", &["x", "y"], &[("b", 2), ("a", 1)]),
        class("a/Two", &[], &[("run", 7)]),
    ];
    let f = fixture(&classes, &classes);
    let report = MergeEngine::new(&f.client, &f.server, &f.output)
        .annotate(Some(AnnotationScheme::Api), false)
        .run()
        .unwrap();

    assert_eq!(report.shared_classes, 2);
    assert_eq!(report.client_only_members + report.server_only_members, 0);
    assert_eq!(report.marker_classes, 0);
    let one = read_class(&f.output, "a/One");
    assert_eq!(method_names(&one), vec!["b", "a"]);
    assert!(!has_any_annotation(&one));
    assert_eq!(entry_names(&f.output), vec!["a/One.class", "a/Two.class"]);
}

#[test]
fn server_insertion_lands_between_anchors() {
    let client = class("a/Thing", &[], &[("A", 1), ("B", 2), ("C", 3)]);
    let server = class("a/Thing", &[], &[("A", 1), ("X", 9), ("B", 2), ("C", 3)]);
    let f = fixture(&[client], &[server]);
    MergeEngine::new(&f.client, &f.server, &f.output)
        .annotate(Some(AnnotationScheme::Api), true)
        .run()
        .unwrap();

    let merged = read_class(&f.output, "a/Thing");
    assert_eq!(method_names(&merged), vec!["A", "X", "B", "C"]);
    let x = merged.method("X", "()V").unwrap();
    assert_eq!(side_of(&x.annotations).as_deref(), Some("DEDICATED_SERVER"));
    assert!(merged.method("A", "()V").unwrap().annotations.is_empty());
}

#[test]
fn exclusive_classes_are_tagged_and_ordered() {
    let f = fixture(
        &[class("a/Shared", &[], &[]), class("a/Render", &["tex"], &[("draw", 4)])],
        &[class("a/Shared", &[], &[]), class("a/Tick", &[], &[("tick", 5)])],
    );
    let report = MergeEngine::new(&f.client, &f.server, &f.output)
        .annotate(Some(AnnotationScheme::Nmf), true)
        .keep_data(true)
        .run()
        .unwrap();

    assert_eq!(report.client_only_classes, 1);
    assert_eq!(report.server_only_classes, 1);
    assert_eq!(report.resources, 1);
    assert_eq!(report.marker_classes, 2);
    assert_eq!(
        entry_names(&f.output),
        vec![
            "assets/lang.json",
            "a/Shared.class",
            "a/Render.class",
            "a/Tick.class",
            "net/minecraftforge/fml/relauncher/SideOnly.class",
            "net/minecraftforge/fml/relauncher/Side.class",
        ]
    );

    let render = read_class(&f.output, "a/Render");
    assert_eq!(side_of(&render.annotations).as_deref(), Some("CLIENT"));
    assert!(render.field("tex").unwrap().annotations.is_empty());
    let tick = read_class(&f.output, "a/Tick");
    assert_eq!(side_of(&tick.annotations).as_deref(), Some("SERVER"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["scheme"], "NMF");
}

#[test]
fn without_annotation_nothing_is_marked() {
    let f = fixture(
        &[class("a/C", &["c"], &[]), class("a/OnlyClient", &[], &[])],
        &[class("a/C", &["s"], &[])],
    );
    let report = MergeEngine::new(&f.client, &f.server, &f.output).run().unwrap();
    assert_eq!(report.scheme, None);
    assert_eq!(report.marker_classes, 0);
    let merged = read_class(&f.output, "a/C");
    assert_eq!(merged.fields.len(), 2);
    assert!(!has_any_annotation(&merged));
    assert!(!has_any_annotation(&read_class(&f.output, "a/OnlyClient")));
}

#[test]
fn filtered_classes_are_left_out() {
    let f = fixture(
        &[class("net/Keep", &[], &[]), class("com/lib/Drop", &[], &[])],
        &[class("com/lib/Other", &[], &[])],
    );
    let report = MergeEngine::new(&f.client, &f.server, &f.output)
        .filter(ClassFilter::new(&[] as &[&str], &[], &[], &["com/lib/"]))
        .run()
        .unwrap();
    assert_eq!(report.filtered_classes, 2);
    assert_eq!(entry_names(&f.output), vec!["net/Keep.class"]);
}

#[test]
fn merge_then_strip_restores_annotation_state() {
    let mut client_iface = class("a/Thing", &["shared", "clientField"], &[("A", 1), ("render", 2)]);
    client_iface.interfaces = vec!["a/Renderable".into()];
    let server_thing = class("a/Thing", &["shared", "serverField"], &[("A", 1), ("tick", 3)]);
    let f = fixture(
        &[client_iface, class("a/ClientOnly", &[], &[])],
        &[server_thing, class("a/ServerOnly", &[], &[])],
    );
    MergeEngine::new(&f.client, &f.server, &f.output)
        .annotate(Some(AnnotationScheme::Api), true)
        .run()
        .unwrap();

    let merged = read_class(&f.output, "a/Thing");
    assert!(has_any_annotation(&merged));

    let mut targets = StripTargets::new();
    targets.add_text(
        "# every marker the merge added\n\
         a/Thing render()V\n\
         a/Thing tick()V\n\
         a/Thing clientField\n\
         a/Thing serverFieldI\n\
         a/ClientOnly\n\
         a/ServerOnly\n",
    );
    let stripped = f.output.with_file_name("stripped.jar");
    let report = Stripper::new(targets).process(&f.output, &stripped).unwrap();
    assert_eq!(report.classes_rewritten, 3);
    assert_eq!(report.entries, entry_names(&f.output).len());

    for name in ["a/Thing", "a/ClientOnly", "a/ServerOnly"] {
        assert!(!has_any_annotation(&read_class(&stripped, name)), "{name} still marked");
    }
    let thing = read_class(&stripped, "a/Thing");
    assert_eq!(method_names(&thing), vec!["A", "render", "tick"]);
    assert_eq!(entry_names(&stripped), entry_names(&f.output));
}

#[test]
fn strip_preserves_entry_times() {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let time = zip::DateTime::from_date_and_time(2021, 6, 14, 9, 30, 6).unwrap();
    let options = SimpleFileOptions::default().last_modified_time(time);
    let mut zip = zip::ZipWriter::new(std::fs::File::create(&input).unwrap());
    zip.start_file("a/X.class", options).unwrap();
    zip.write_all(&encode(&class("a/X", &[], &[])).unwrap()).unwrap();
    zip.start_file("notes.txt", options).unwrap();
    zip.write_all(b"n").unwrap();
    zip.finish().unwrap();

    let stripped = dir.path().join("stripped.jar");
    let mut targets = StripTargets::new();
    targets.add_line("a/X");
    let report = Stripper::new(targets).process(&input, &stripped).unwrap();
    assert_eq!(report.classes_rewritten, 1);

    let mut after = open(&stripped);
    for name in ["a/X.class", "notes.txt"] {
        assert_eq!(after.by_name(name).unwrap().last_modified(), Some(time));
    }
}

#[test]
fn bundled_server_without_format_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let client = dir.path().join("client.jar");
    write_jar(&client, &[class("a/C", &[], &[])], &[]);
    let server = dir.path().join("server.jar");
    write_jar(&server, &[], &[("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n")]);
    let output = dir.path().join("merged.jar");
    std::fs::write(&output, b"stale").unwrap();

    let err = MergeEngine::new(&client, &server, &output)
        .bundled(true)
        .run()
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Archive(distmerge_archive::ArchiveError::MissingBundlerFormat { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn bundled_server_is_merged() {
    let dir = tempfile::tempdir().unwrap();
    let client = dir.path().join("client.jar");
    write_jar(&client, &[class("a/C", &[], &[])], &[]);

    let inner = dir.path().join("inner.jar");
    write_jar(&inner, &[class("a/C", &[], &[]), class("a/S", &[], &[])], &[]);
    let inner_bytes = std::fs::read(&inner).unwrap();
    let server = dir.path().join("server.jar");
    write_jar(
        &server,
        &[],
        &[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\nBundler-Format: 1.0\n"),
            ("META-INF/versions.list", b"abc\t1.18\t1.18/server-1.18.jar\n"),
            ("META-INF/versions/1.18/server-1.18.jar", &inner_bytes),
        ],
    );

    let output = dir.path().join("merged.jar");
    let report = MergeEngine::new(&client, &server, &output)
        .bundled(true)
        .run()
        .unwrap();
    assert_eq!(report.shared_classes, 1);
    assert_eq!(report.server_only_classes, 1);
}

#[test]
fn misaligned_members_abort_the_run() {
    let f = fixture(
        &[class("a/Bad", &["a", "b"], &[])],
        &[class("a/Bad", &["b", "a"], &[])],
    );
    let err = MergeEngine::new(&f.client, &f.server, &f.output).run().unwrap_err();
    assert!(matches!(err, EngineError::Merge(_)));
    assert!(!f.output.exists());
}
