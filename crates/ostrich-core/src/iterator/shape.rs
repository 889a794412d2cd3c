//! Turns store rows into result quads, per query mode.

use oxrdf::{GraphName, Quad, Triple};

use crate::types::{DeltaTriple, VersionedTriple};

/// Materialized rows pass through unchanged, in the default graph.
pub(crate) fn materialized(triples: Vec<Triple>) -> Vec<Quad> {
    triples
        .into_iter()
        .map(|t| t.in_graph(GraphName::DefaultGraph))
        .collect()
}

/// Keep only rows whose addition flag equals `query_additions`.
pub(crate) fn delta(rows: Vec<DeltaTriple>, query_additions: bool) -> Vec<Quad> {
    rows.into_iter()
        .filter(|row| row.addition == query_additions)
        .map(|row| row.triple.in_graph(GraphName::DefaultGraph))
        .collect()
}

/// One version-stamped quad per (triple, version) pair.
pub(crate) fn versioned(rows: Vec<VersionedTriple>) -> Vec<Quad> {
    rows.iter().flat_map(|row| row.stamped_quads()).collect()
}
