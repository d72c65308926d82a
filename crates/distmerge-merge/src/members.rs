//! Ordered three-way merge of member lists.
//!
//! Both inputs are walked in lock step. Members present on both sides act as
//! anchors; a member found on one side only is cloned into the other list at
//! the current position. When neither side is sitting on the next anchor, a
//! per-kind tie-break decides which exclusive member goes first.
//!
//! The result is a single list in which every element carries its
//! [`Origin`]. Reading the result back as "client view" or "server view"
//! gives the same sequence, so only one copy is kept.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use distmerge_classfile::{FieldEntry, MethodEntry};

use crate::error::{MergeError, MergeResult};

/// One of the two input distributions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    Server,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => write!(f, "client"),
            Side::Server => write!(f, "server"),
        }
    }
}

/// Where a merged element came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Shared,
    ClientOnly,
    ServerOnly,
}

impl Origin {
    /// The side an exclusive element belongs to; `None` for shared ones.
    pub fn exclusive_side(self) -> Option<Side> {
        match self {
            Origin::Shared => None,
            Origin::ClientOnly => Some(Side::Client),
            Origin::ServerOnly => Some(Side::Server),
        }
    }
}

impl From<Side> for Origin {
    fn from(side: Side) -> Self {
        match side {
            Side::Client => Origin::ClientOnly,
            Side::Server => Origin::ServerOnly,
        }
    }
}

/// An element of the reconciled list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Merged<T> {
    pub item: T,
    pub origin: Origin,
}

/// How members of one kind are identified and ordered.
pub trait MemberKind {
    type Item: Clone;
    type Key: Eq + Hash + Clone + fmt::Display;

    /// Name used in diagnostics, e.g. `"field"`.
    const KIND: &'static str;

    /// Equivalence key; unique within one side's list.
    fn key(item: &Self::Item) -> Self::Key;

    /// Secondary order for two simultaneously exclusive members.
    fn tie_break(client: &Self::Item, server: &Self::Item) -> Ordering;
}

/// Fields: keyed by name, tie-broken lexicographically by name.
pub struct Fields;

impl MemberKind for Fields {
    type Item = FieldEntry;
    type Key = String;
    const KIND: &'static str = "field";

    fn key(item: &FieldEntry) -> String {
        item.name.clone()
    }

    fn tie_break(client: &FieldEntry, server: &FieldEntry) -> Ordering {
        client.name.cmp(&server.name)
    }
}

/// Methods: keyed by name plus descriptor, tie-broken by lowest source line.
pub struct Methods;

impl MemberKind for Methods {
    type Item = MethodEntry;
    type Key = String;
    const KIND: &'static str = "method";

    fn key(item: &MethodEntry) -> String {
        item.signature()
    }

    fn tie_break(client: &MethodEntry, server: &MethodEntry) -> Ordering {
        let line = |m: &MethodEntry| m.line_hint().unwrap_or(u32::MAX);
        line(client).cmp(&line(server))
    }
}

/// Compare two slots where `None` is the terminal marker, which sorts last.
fn compare_slots<M: MemberKind>(client: Option<&M::Item>, server: Option<&M::Item>) -> Ordering {
    match (client, server) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(c), Some(s)) => M::tie_break(c, s),
    }
}

fn check_unique<M: MemberKind>(items: &[M::Item], side: Side) -> MergeResult<HashSet<M::Key>> {
    let mut keys = HashSet::with_capacity(items.len());
    for item in items {
        let key = M::key(item);
        if !keys.insert(key.clone()) {
            return Err(MergeError::DuplicateKey {
                kind: M::KIND,
                key: key.to_string(),
                side,
            });
        }
    }
    Ok(keys)
}

fn describe<K: fmt::Display>(key: Option<&K>) -> String {
    key.map_or_else(|| "<end>".to_string(), ToString::to_string)
}

/// Merge a client and a server member list into one reconciled list.
///
/// Every element cloned across sides is passed to `annotate` along with the
/// side it came from before it is placed. Fails when the lists cannot be
/// aligned, for example when two shared members appear in opposite orders.
pub fn merge_members<M: MemberKind>(
    client: &[M::Item],
    server: &[M::Item],
    mut annotate: impl FnMut(&mut M::Item, Side),
) -> MergeResult<Vec<Merged<M::Item>>> {
    check_unique::<M>(client, Side::Client)?;
    let server_keys = check_unique::<M>(server, Side::Server)?;

    // Anchors in client order, closed by the terminal marker.
    let mut common: Vec<Option<M::Key>> = client
        .iter()
        .map(M::key)
        .filter(|k| server_keys.contains(k))
        .map(Some)
        .collect();
    common.push(None);

    let mut merged: Vec<Option<Merged<M::Item>>> = client
        .iter()
        .map(|item| {
            Some(Merged {
                item: item.clone(),
                origin: Origin::Shared,
            })
        })
        .collect();
    merged.push(None);
    let mut mirror: Vec<Option<M::Item>> = server.iter().cloned().map(Some).collect();
    mirror.push(None);

    let misaligned = |reason: String| MergeError::Misaligned {
        kind: M::KIND,
        reason,
    };

    let mut i = 0;
    let mut mi = 0;
    while i < merged.len() {
        let ct = merged[i].as_ref().map(|m| M::key(&m.item));
        let st = mirror
            .get(i)
            .ok_or_else(|| misaligned(format!("server list exhausted at position {i}")))?
            .as_ref()
            .map(M::key);
        let mt = common
            .get(mi)
            .ok_or_else(|| misaligned(format!("anchors exhausted at position {i}")))?
            .clone();

        if ct == st {
            if ct != mt {
                return Err(misaligned(format!(
                    "`{}` is aligned at position {i} but the next anchor is `{}`",
                    describe(ct.as_ref()),
                    describe(mt.as_ref())
                )));
            }
            tracing::trace!(kind = M::KIND, position = i, key = %describe(ct.as_ref()), "shared");
            mi += 1;
        } else if st == mt {
            insert_into_server::<M>(&mut merged, &mut mirror, i, &mut annotate)
                .ok_or_else(|| misaligned(format!("client list ended early at position {i}")))?;
        } else if ct == mt {
            insert_into_client::<M>(&mut merged, &mirror, i, &mut annotate)
                .ok_or_else(|| misaligned(format!("server list ended early at position {i}")))?;
        } else {
            let order = compare_slots::<M>(
                merged[i].as_ref().map(|m| &m.item),
                mirror[i].as_ref(),
            );
            let inserted = if order == Ordering::Greater {
                insert_into_client::<M>(&mut merged, &mirror, i, &mut annotate)
            } else {
                insert_into_server::<M>(&mut merged, &mut mirror, i, &mut annotate)
            };
            inserted.ok_or_else(|| misaligned(format!("no exclusive member to place at position {i}")))?;
        }
        i += 1;
    }

    if i < mirror.len() || mi < common.len() || merged.len() != mirror.len() {
        return Err(misaligned(format!(
            "ended at position {i} with {mi} of {} anchors consumed ({} client, {} server slots)",
            common.len(),
            merged.len(),
            mirror.len()
        )));
    }

    // Terminal markers line up last on both sides.
    merged.pop();
    let merged: Vec<Merged<M::Item>> = merged.into_iter().flatten().collect();

    let mut seen = HashSet::with_capacity(merged.len());
    for m in &merged {
        if !seen.insert(M::key(&m.item)) {
            return Err(misaligned(format!(
                "`{}` would appear twice in the merged list",
                M::key(&m.item)
            )));
        }
    }
    Ok(merged)
}

/// The client element at `i` is exclusive: tag it and mirror its key.
fn insert_into_server<M: MemberKind>(
    merged: &mut [Option<Merged<M::Item>>],
    mirror: &mut Vec<Option<M::Item>>,
    i: usize,
    annotate: &mut impl FnMut(&mut M::Item, Side),
) -> Option<()> {
    let slot = merged[i].as_mut()?;
    annotate(&mut slot.item, Side::Client);
    slot.origin = Origin::ClientOnly;
    tracing::trace!(kind = M::KIND, position = i, key = %M::key(&slot.item), "client only");
    mirror.insert(i, Some(slot.item.clone()));
    Some(())
}

/// The server element at `i` is exclusive: clone it into the client list.
fn insert_into_client<M: MemberKind>(
    merged: &mut Vec<Option<Merged<M::Item>>>,
    mirror: &[Option<M::Item>],
    i: usize,
    annotate: &mut impl FnMut(&mut M::Item, Side),
) -> Option<()> {
    let mut item = mirror[i].clone()?;
    annotate(&mut item, Side::Server);
    tracing::trace!(kind = M::KIND, position = i, key = %M::key(&item), "server only");
    merged.insert(
        i,
        Some(Merged {
            item,
            origin: Origin::ServerOnly,
        }),
    );
    Some(())
}
