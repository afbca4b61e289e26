use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::{Catalog, EntryId};

/// All non-null md5 values across every file of every archive attached to
/// the entry. Computed on demand, never cached; an unknown id or an entry
/// with no hashed files yields the empty set.
pub fn content_hashes(catalog: &Catalog, id: EntryId) -> BTreeSet<String> {
    let Some(entry) = catalog.entry(id) else {
        return BTreeSet::new();
    };
    entry
        .archives
        .iter()
        .flat_map(|archive| archive.files.iter())
        .filter_map(|file| file.md5.clone())
        .collect()
}

/// Exact-duplicate equivalence: set-equal content hashes. Irreflexive, and
/// entries with no known hashes are never duplicates of anything, including
/// each other.
pub fn is_duplicate_of(catalog: &Catalog, a: EntryId, b: EntryId) -> bool {
    if a == b {
        return false;
    }
    let hashes_a = content_hashes(catalog, a);
    if hashes_a.is_empty() {
        return false;
    }
    let hashes_b = content_hashes(catalog, b);
    if hashes_b.is_empty() {
        return false;
    }
    hashes_a == hashes_b
}

/// Every other entry with at least one archive whose hash set equals this
/// one's. Full scan, no early termination; an entry can legitimately have
/// several duplicates.
pub fn find_duplicates(catalog: &Catalog, a: EntryId) -> BTreeSet<EntryId> {
    if catalog.entry(a).is_none() {
        return BTreeSet::new();
    }
    catalog
        .ids()
        .filter(|&b| b != a)
        .filter(|&b| catalog.entry(b).is_some_and(|e| e.has_archives()))
        .filter(|&b| is_duplicate_of(catalog, a, b))
        .collect()
}

/// Symmetric, irreflexive duplicate relation. Edges are stored once under
/// the canonically ordered pair (smaller id first), so (A,B) and (B,A) are
/// the same edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSet {
    edges: BTreeSet<(EntryId, EntryId)>,
}

fn canonical(a: EntryId, b: EntryId) -> (EntryId, EntryId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl DuplicateSet {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, a: EntryId, b: EntryId) -> bool {
        a != b && self.edges.contains(&canonical(a, b))
    }

    pub fn duplicates_of(&self, id: EntryId) -> BTreeSet<EntryId> {
        self.edges
            .iter()
            .filter_map(|&(x, y)| {
                if x == id {
                    Some(y)
                } else if y == id {
                    Some(x)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Remove every edge touching the entry, both directions.
    pub fn clear_entry(&mut self, id: EntryId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|&(x, y)| x != id && y != id);
        before - self.edges.len()
    }

    pub fn clear_all(&mut self) {
        self.edges.clear();
    }
}

/// Re-validate then record the symmetric edge. Validation is deliberately
/// repeated here rather than trusted from an earlier scan, in case hashes
/// changed between scan and mark. Idempotent; returns whether the pair is
/// (now) marked.
pub fn mark_as_duplicate(catalog: &mut Catalog, a: EntryId, b: EntryId) -> bool {
    if !is_duplicate_of(catalog, a, b) {
        return false;
    }
    catalog.duplicates.edges.insert(canonical(a, b));
    true
}

/// Bulk scan: every entry with archives, each checked against the rest,
/// symmetric pairs de-duplicated by canonical ordering. Read-only; marking
/// is the caller's decision.
pub fn scan(catalog: &Catalog) -> Vec<(EntryId, EntryId)> {
    scan_entries(catalog, catalog.ids())
}

pub fn scan_entries(
    catalog: &Catalog,
    ids: impl Iterator<Item = EntryId>,
) -> Vec<(EntryId, EntryId)> {
    let mut seen = BTreeSet::new();
    for a in ids {
        if !catalog.entry(a).is_some_and(|e| e.has_archives()) {
            continue;
        }
        for b in find_duplicates(catalog, a) {
            seen.insert(canonical(a, b));
        }
    }
    seen.into_iter().collect()
}
