//! Jar manifest and bundler versions-list parsing.

/// Main section of a jar manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Vec<(String, String)>,
}

impl Manifest {
    /// Parse manifest text. Only the main section (up to the first blank
    /// line) is kept; continuation lines start with a single space.
    pub fn parse(text: &str) -> Self {
        let mut main: Vec<(String, String)> = Vec::new();
        for line in text.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }
            if let Some(rest) = line.strip_prefix(' ') {
                if let Some((_, value)) = main.last_mut() {
                    value.push_str(rest);
                }
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                main.push((key.trim().to_string(), value.trim_start().to_string()));
            }
        }
        Self { main }
    }

    /// Look up a main attribute; names are case-insensitive.
    pub fn main_attribute(&self, name: &str) -> Option<&str> {
        self.main
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One record of `META-INF/versions.list` or `libraries.list`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleEntry {
    pub hash: String,
    pub id: String,
    /// Path relative to the list's directory, e.g. `server-1.18.jar`.
    pub path: String,
}

/// Parse a tab-separated bundle list. Blank lines are skipped; any other
/// line without exactly three fields is returned as the error.
pub fn parse_bundle_list(text: &str) -> Result<Vec<BundleEntry>, String> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        match parts.as_slice() {
            [hash, id, path] => entries.push(BundleEntry {
                hash: hash.to_string(),
                id: id.to_string(),
                path: path.to_string(),
            }),
            _ => return Err(line.to_string()),
        }
    }
    Ok(entries)
}
