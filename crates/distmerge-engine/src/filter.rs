//! Which classes take part in a merge.

use std::collections::HashSet;

use crate::config::MergeConfig;
use crate::error::EngineResult;
use crate::mapping::load_class_names;

/// Package prefixes. The default package is stored as the empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Packages(Vec<String>);

impl Packages {
    fn new<S: AsRef<str>>(packages: &[S]) -> Self {
        let mut list: Vec<String> = packages
            .iter()
            .map(|p| p.as_ref().trim().trim_end_matches('/').to_string())
            .collect();
        list.sort();
        list.dedup();
        Self(list)
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn matches(&self, class: &str) -> bool {
        self.0.iter().any(|pkg| {
            if pkg.is_empty() {
                !class.contains('/')
            } else {
                class
                    .strip_prefix(pkg.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            }
        })
    }
}

/// Class name predicate built from white- and blacklists.
///
/// A class passes when no whitelist is configured or it is whitelisted by
/// name or package, and it is not blacklisted by name or package.
#[derive(Clone, Debug, Default)]
pub struct ClassFilter {
    whitelist: HashSet<String>,
    whitelist_packages: Packages,
    blacklist: HashSet<String>,
    blacklist_packages: Packages,
}

impl ClassFilter {
    /// A filter that accepts everything.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn new<S: AsRef<str>>(whitelist: &[S], whitelist_packages: &[S], blacklist: &[S], blacklist_packages: &[S]) -> Self {
        Self {
            whitelist: whitelist.iter().map(|c| c.as_ref().to_string()).collect(),
            whitelist_packages: Packages::new(whitelist_packages),
            blacklist: blacklist.iter().map(|c| c.as_ref().to_string()).collect(),
            blacklist_packages: Packages::new(blacklist_packages),
        }
    }

    /// Build the filter of a run, reading any mapping files it names.
    pub fn from_config(config: &MergeConfig) -> EngineResult<Self> {
        let mut filter = Self::new(
            &config.whitelist,
            &config.whitelist_packages,
            &config.blacklist,
            &config.blacklist_packages,
        );
        for path in &config.whitelist_maps {
            filter.whitelist.extend(load_class_names(path)?);
        }
        for path in &config.blacklist_maps {
            filter.blacklist.extend(load_class_names(path)?);
        }
        tracing::debug!(
            whitelist = filter.whitelist.len(),
            whitelist_packages = filter.whitelist_packages.0.len(),
            blacklist = filter.blacklist.len(),
            blacklist_packages = filter.blacklist_packages.0.len(),
            "built class filter"
        );
        Ok(filter)
    }

    /// Whether any whitelist entry is configured.
    pub fn is_restrictive(&self) -> bool {
        !self.whitelist.is_empty() || !self.whitelist_packages.is_empty()
    }

    pub fn accepts(&self, class: &str) -> bool {
        let whitelisted = !self.is_restrictive()
            || self.whitelist.contains(class)
            || self.whitelist_packages.matches(class);
        whitelisted && !self.blacklist.contains(class) && !self.blacklist_packages.matches(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn empty_filter_accepts_everything() {
        let f = ClassFilter::allow_all();
        assert!(f.accepts("a/B"));
        assert!(f.accepts("Top"));
    }

    #[test]
    fn packages_are_prefixes() {
        let f = ClassFilter::new(NONE, &["a/b/"], NONE, NONE);
        assert!(f.accepts("a/b/C"));
        assert!(f.accepts("a/b/c/D"));
        assert!(!f.accepts("a/bc/D"));
        assert!(!f.accepts("a/B"));
    }

    #[test]
    fn default_package() {
        for spelling in ["/", ""] {
            let f = ClassFilter::new(NONE, &[spelling], NONE, NONE);
            assert!(f.accepts("Top"));
            assert!(!f.accepts("a/Top"));
        }
    }

    #[test]
    fn names_or_packages_whitelist_and_blacklist_wins() {
        let f = ClassFilter::new(&["x/Only"], &["a"], &["a/Bad"], &["a/secret"]);
        assert!(f.accepts("x/Only"));
        assert!(f.accepts("a/Good"));
        assert!(!f.accepts("x/Other"));
        assert!(!f.accepts("a/Bad"));
        assert!(!f.accepts("a/secret/Key"));
    }

    #[test]
    fn blacklist_alone_is_not_restrictive() {
        let f = ClassFilter::new(NONE, NONE, NONE, &["com/mojang"]);
        assert!(!f.is_restrictive());
        assert!(f.accepts("net/minecraft/A"));
        assert!(!f.accepts("com/mojang/B"));
    }
}
