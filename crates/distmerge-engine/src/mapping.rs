//! Class-name column of common obfuscation mapping formats.
//!
//! Only the original (left-hand) class names are read; members and target
//! names are skipped. Used to fill white- and blacklists.

use std::path::Path;

use crate::error::{EngineError, EngineResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingFormat {
    /// `a.b.C -> x:` with indented members.
    ProGuard,
    /// SRG and XSRG: `CL: a/b/C x`.
    Srg,
    /// TSRG and CSRG: non-indented `a/b/C x`.
    Tsrg,
    /// TSRG2: `tsrg2 <namespaces>` header, then one name per namespace.
    Tsrg2,
    /// Tiny v1: `v1` header, `CLASS\ta/b/C\tx`.
    TinyV1,
    /// Tiny v2: `tiny\t2\t0` header, `c\ta/b/C\tx`.
    TinyV2,
}

fn significant_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
}

impl MappingFormat {
    /// Guess the format from the first significant line.
    pub fn detect(text: &str) -> Option<Self> {
        let (_, first) = significant_lines(text).next()?;
        let format = if first.starts_with("v1\t") {
            Self::TinyV1
        } else if first.starts_with("tiny\t2\t") {
            Self::TinyV2
        } else if first.starts_with("tsrg2 ") {
            Self::Tsrg2
        } else if ["PK:", "CL:", "FD:", "MD:"].iter().any(|p| first.starts_with(p)) {
            Self::Srg
        } else if first.contains(" -> ") && first.trim_end().ends_with(':') {
            Self::ProGuard
        } else {
            Self::Tsrg
        };
        Some(format)
    }
}

/// What one line contributes.
enum Line<'a> {
    Class(&'a str),
    Skip,
    Invalid,
}

fn classify(format: MappingFormat, line: &str) -> Line<'_> {
    let indented = line.starts_with([' ', '\t']);
    match format {
        MappingFormat::ProGuard => {
            if indented {
                return Line::Skip;
            }
            match line.split_once(" -> ") {
                Some((name, _)) => Line::Class(name.trim()),
                None => Line::Invalid,
            }
        }
        MappingFormat::Srg => match line.split_once(':') {
            Some(("CL", rest)) => rest.split_whitespace().next().map_or(Line::Invalid, Line::Class),
            Some(("PK" | "FD" | "MD", _)) => Line::Skip,
            _ => Line::Invalid,
        },
        MappingFormat::Tsrg | MappingFormat::Tsrg2 => {
            if indented || line.starts_with("tsrg2 ") {
                return Line::Skip;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [first, ..] if first.ends_with('/') => Line::Skip,
                [first, _] => Line::Class(*first),
                [first, _, ..] if format == MappingFormat::Tsrg2 => Line::Class(*first),
                // CSRG member lines: class member [descriptor] mapped
                [_, _, _] | [_, _, _, _] => Line::Skip,
                _ => Line::Invalid,
            }
        }
        MappingFormat::TinyV1 => {
            let mut cols = line.split('\t');
            match (cols.next(), cols.next()) {
                (Some("v1"), _) => Line::Skip,
                (Some("CLASS"), Some(name)) => Line::Class(name),
                (Some("FIELD" | "METHOD"), _) => Line::Skip,
                _ => Line::Invalid,
            }
        }
        MappingFormat::TinyV2 => {
            if indented {
                return Line::Skip;
            }
            let mut cols = line.split('\t');
            match (cols.next(), cols.next()) {
                (Some("tiny"), _) => Line::Skip,
                (Some("c"), Some(name)) => Line::Class(name),
                _ => Line::Invalid,
            }
        }
    }
}

/// Read the original class names out of mapping text.
///
/// ProGuard names are converted to internal (slash) form. On failure the
/// offending line number and text are returned.
pub fn parse_class_names(text: &str, format: MappingFormat) -> Result<Vec<String>, (usize, String)> {
    let mut names = Vec::new();
    for (number, line) in significant_lines(text) {
        match classify(format, line) {
            Line::Class(name) if format == MappingFormat::ProGuard => names.push(name.replace('.', "/")),
            Line::Class(name) => names.push(name.to_string()),
            Line::Skip => {}
            Line::Invalid => return Err((number, line.to_string())),
        }
    }
    Ok(names)
}

/// Load the original class names of a mapping file of any supported format.
pub fn load_class_names(path: &Path) -> EngineResult<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let Some(format) = MappingFormat::detect(&text) else {
        return Ok(Vec::new());
    };
    let names = parse_class_names(&text, format).map_err(|(line, text)| EngineError::Mapping {
        path: path.to_path_buf(),
        line,
        text,
    })?;
    tracing::debug!(path = %path.display(), ?format, classes = names.len(), "loaded mapping");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        let format = MappingFormat::detect(text).unwrap();
        parse_class_names(text, format).unwrap()
    }

    #[test]
    fn proguard() {
        let text = "# comment\nnet.minecraft.Foo -> a:\n    int bar -> b\n    void baz() -> c\nTop -> b:\n";
        assert_eq!(MappingFormat::detect(text), Some(MappingFormat::ProGuard));
        assert_eq!(names(text), vec!["net/minecraft/Foo", "Top"]);
    }

    #[test]
    fn srg() {
        let text = "PK: ./ net/minecraft/src\nCL: a net/minecraft/Foo\nFD: a/b net/minecraft/Foo/bar\nMD: a/c ()V net/minecraft/Foo/baz ()V\n";
        assert_eq!(names(text), vec!["a"]);
    }

    #[test]
    fn tsrg_and_csrg() {
        let tsrg = "a/ net/minecraft/\na net/minecraft/Foo\n\tb bar\n\tc ()V baz\nb net/minecraft/Bar\n";
        assert_eq!(MappingFormat::detect(tsrg), Some(MappingFormat::Tsrg));
        assert_eq!(names(tsrg), vec!["a", "b"]);

        let csrg = "a net/minecraft/Foo\na b bar\na c ()V baz\n";
        assert_eq!(names(csrg), vec!["a"]);
    }

    #[test]
    fn tsrg2() {
        let text = "tsrg2 obf srg\na net/minecraft/Foo\n\tb f_1_\n\t\tstatic\n";
        assert_eq!(MappingFormat::detect(text), Some(MappingFormat::Tsrg2));
        assert_eq!(names(text), vec!["a"]);
    }

    #[test]
    fn tiny() {
        let v1 = "v1\tofficial\tnamed\nCLASS\ta\tnet/minecraft/Foo\nFIELD\ta\tI\tb\tbar\n";
        assert_eq!(names(v1), vec!["a"]);

        let v2 = "tiny\t2\t0\tofficial\tnamed\nc\ta\tnet/minecraft/Foo\n\tf\tI\tb\tbar\nc\tb\tnet/minecraft/Bar\n";
        assert_eq!(MappingFormat::detect(v2), Some(MappingFormat::TinyV2));
        assert_eq!(names(v2), vec!["a", "b"]);
    }

    #[test]
    fn invalid_line_is_reported() {
        let err = parse_class_names("CL: a b\nXX: nope\n", MappingFormat::Srg).unwrap_err();
        assert_eq!(err, (2, "XX: nope".to_string()));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "a.B -> c:\n").unwrap();
        assert_eq!(load_class_names(&path).unwrap(), vec!["a/B"]);

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "\n# nothing\n").unwrap();
        assert!(load_class_names(&empty).unwrap().is_empty());
    }
}
