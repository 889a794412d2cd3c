//! In-memory versioned archive: a snapshot followed by change sets.

use std::collections::{HashMap, HashSet};

use oxrdf::Triple;

use ostrich_core::types::{CountResult, DeltaTriple, TriplePattern, VersionedTriple};

/// Materialized contents of every version of a dataset.
///
/// Version 0 is the snapshot; version `n` applies the `n`th change set to
/// version `n - 1`. Triples keep the order in which they were first added.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    versions: Vec<Vec<Triple>>,
}

impl MemoryArchive {
    /// Build an archive from a snapshot and change sets.
    pub fn builder() -> MemoryArchiveBuilder {
        MemoryArchiveBuilder::default()
    }

    /// Number of versions held.
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Identifier of the newest version, if any. Reported when the archive is opened.
    pub fn latest_version(&self) -> Option<u32> {
        self.versions.len().checked_sub(1).map(|v| v as u32)
    }

    /// Map a requested version to a stored one.
    ///
    /// Negative versions and versions past the newest one select the newest.
    pub fn resolve_version(&self, version: i64) -> Option<usize> {
        let latest = self.versions.len().checked_sub(1)?;
        match usize::try_from(version) {
            Ok(v) => Some(v.min(latest)),
            Err(_) => Some(latest),
        }
    }

    /// Triples matching `pattern` at `version`.
    pub fn materialized(&self, pattern: &TriplePattern, version: i64) -> Vec<Triple> {
        self.resolve_version(version)
            .map(|v| {
                self.versions[v]
                    .iter()
                    .filter(|t| pattern.matches(t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Triples matching `pattern` added or removed between two versions.
    ///
    /// Additions come first, in the order of `version_end`, followed by
    /// removals in the order of `version_start`.
    pub fn delta(&self, pattern: &TriplePattern, version_start: i64, version_end: i64) -> Vec<DeltaTriple> {
        let (Some(start), Some(end)) = (
            self.resolve_version(version_start),
            self.resolve_version(version_end),
        ) else {
            return Vec::new();
        };

        let before: HashSet<&Triple> = self.versions[start].iter().collect();
        let after: HashSet<&Triple> = self.versions[end].iter().collect();

        let additions = self.versions[end]
            .iter()
            .filter(|t| !before.contains(t))
            .map(|t| (t, true));
        let removals = self.versions[start]
            .iter()
            .filter(|t| !after.contains(t))
            .map(|t| (t, false));

        additions
            .chain(removals)
            .filter(|(t, _)| pattern.matches(t))
            .map(|(t, addition)| DeltaTriple::new(t.clone(), addition))
            .collect()
    }

    /// Triples matching `pattern` with every version at which they held.
    pub fn versioned(&self, pattern: &TriplePattern) -> Vec<VersionedTriple> {
        let mut rows: Vec<VersionedTriple> = Vec::new();
        let mut index: HashMap<&Triple, usize> = HashMap::new();

        for (version, triples) in self.versions.iter().enumerate() {
            for triple in triples.iter().filter(|t| pattern.matches(t)) {
                let slot = *index.entry(triple).or_insert_with(|| {
                    rows.push(VersionedTriple::new(triple.clone(), Vec::new()));
                    rows.len() - 1
                });
                rows[slot].versions.push(version as u32);
            }
        }
        rows
    }

    /// Exact number of triples matching `pattern` at `version`.
    pub fn count_materialized(&self, pattern: &TriplePattern, version: i64) -> CountResult {
        CountResult::exact(self.materialized(pattern, version).len() as u64)
    }

    /// Number of changed triples between two versions.
    ///
    /// Reported as an estimate: callers filtering on additions or removals
    /// see fewer rows.
    pub fn count_delta(&self, pattern: &TriplePattern, version_start: i64, version_end: i64) -> CountResult {
        CountResult::estimate(self.delta(pattern, version_start, version_end).len() as u64)
    }

    /// Exact number of distinct triples matching `pattern` in any version.
    pub fn count_versioned(&self, pattern: &TriplePattern) -> CountResult {
        CountResult::exact(self.versioned(pattern).len() as u64)
    }
}

/// Builder for [`MemoryArchive`].
#[derive(Debug, Default)]
pub struct MemoryArchiveBuilder {
    snapshot: Vec<Triple>,
    changes: Vec<(Vec<Triple>, Vec<Triple>)>,
}

impl MemoryArchiveBuilder {
    /// Set the contents of version 0.
    pub fn snapshot(mut self, triples: impl IntoIterator<Item = Triple>) -> Self {
        self.snapshot = triples.into_iter().collect();
        self
    }

    /// Append a version that adds and removes triples from the previous one.
    pub fn change_set(
        mut self,
        additions: impl IntoIterator<Item = Triple>,
        removals: impl IntoIterator<Item = Triple>,
    ) -> Self {
        self.changes
            .push((additions.into_iter().collect(), removals.into_iter().collect()));
        self
    }

    /// Materialize every version.
    pub fn build(self) -> MemoryArchive {
        let mut current = Vec::new();
        push_unique(&mut current, self.snapshot);
        let mut versions = vec![current.clone()];

        for (additions, removals) in self.changes {
            let removed: HashSet<Triple> = removals.into_iter().collect();
            current.retain(|t| !removed.contains(t));
            push_unique(&mut current, additions);
            versions.push(current.clone());
        }

        MemoryArchive { versions }
    }
}

fn push_unique(target: &mut Vec<Triple>, triples: Vec<Triple>) {
    let mut seen: HashSet<Triple> = target.iter().cloned().collect();
    for triple in triples {
        if seen.insert(triple.clone()) {
            target.push(triple);
        }
    }
}
