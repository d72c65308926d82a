//! Interface-set and inner-class-table reconciliation.

use distmerge_classfile::InnerClassEntry;

/// Interfaces implemented on one side only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceDelta {
    pub client_only: Vec<String>,
    pub server_only: Vec<String>,
}

impl InterfaceDelta {
    /// Returns `true` if both sides implement the same interfaces.
    pub fn is_empty(&self) -> bool {
        self.client_only.is_empty() && self.server_only.is_empty()
    }

    /// Total number of exclusive interfaces.
    pub fn len(&self) -> usize {
        self.client_only.len() + self.server_only.len()
    }
}

/// Union two interface lists, sorted, and report which side added what.
pub fn reconcile_interfaces(client: &[String], server: &[String]) -> (Vec<String>, InterfaceDelta) {
    let delta = InterfaceDelta {
        client_only: client.iter().filter(|i| !server.contains(i)).cloned().collect(),
        server_only: server.iter().filter(|i| !client.contains(i)).cloned().collect(),
    };
    let mut union: Vec<String> = client.to_vec();
    union.extend(delta.server_only.iter().cloned());
    union.sort();
    (union, delta)
}

/// Union two inner-class tables keyed on (name, outer name, simple name).
///
/// Client entries keep their order; server-only entries follow in server order.
pub fn reconcile_inner_classes(client: &[InnerClassEntry], server: &[InnerClassEntry]) -> Vec<InnerClassEntry> {
    let mut union = client.to_vec();
    for entry in server {
        if !client.iter().any(|c| c.same_entry(entry)) {
            union.push(entry.clone());
        }
    }
    union
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn inner(name: &str, outer: Option<&str>, simple: Option<&str>) -> InnerClassEntry {
        InnerClassEntry {
            name: name.into(),
            outer_name: outer.map(Into::into),
            inner_name: simple.map(Into::into),
            access: 0,
        }
    }

    #[test]
    fn interfaces_are_unioned_and_sorted() {
        let (union, delta) = reconcile_interfaces(&names(&["b/Z", "a/Y"]), &names(&["a/Y", "a/X"]));
        assert_eq!(union, names(&["a/X", "a/Y", "b/Z"]));
        assert_eq!(delta.client_only, names(&["b/Z"]));
        assert_eq!(delta.server_only, names(&["a/X"]));
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn identical_interfaces_have_no_delta() {
        let list = names(&["q/B", "q/A"]);
        let (union, delta) = reconcile_interfaces(&list, &list);
        assert!(delta.is_empty());
        assert_eq!(union, names(&["q/A", "q/B"]));
    }

    #[test]
    fn inner_classes_union_with_null_safe_keys() {
        let client = vec![inner("a/B$1", None, None), inner("a/B$C", Some("a/B"), Some("C"))];
        let server = vec![
            inner("a/B$C", Some("a/B"), Some("C")),
            inner("a/B$1", Some("a/B"), None),
            inner("a/B$D", Some("a/B"), Some("D")),
        ];
        let union = reconcile_inner_classes(&client, &server);
        let listed: Vec<(&str, Option<&str>)> = union
            .iter()
            .map(|e| (e.name.as_str(), e.outer_name.as_deref()))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("a/B$1", None),
                ("a/B$C", Some("a/B")),
                ("a/B$1", Some("a/B")),
                ("a/B$D", Some("a/B")),
            ]
        );
    }
}
