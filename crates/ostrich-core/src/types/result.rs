//! Store-level rows and cardinality metadata.

use oxrdf::{GraphName, NamedNode, Quad, Triple};
use serde::{Deserialize, Serialize};

/// Prefix of the graph name that carries a version identifier.
pub const VERSION_GRAPH_PREFIX: &str = "version:";

/// Row returned by a delta-materialized search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeltaTriple {
    pub triple: Triple,
    /// `true` when the triple was added in the range, `false` when removed.
    pub addition: bool,
}

impl DeltaTriple {
    /// Create a delta row.
    pub fn new(triple: Triple, addition: bool) -> Self {
        Self { triple, addition }
    }
}

/// Row returned by a version query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedTriple {
    pub triple: Triple,
    /// Versions at which the triple held, in store order.
    pub versions: Vec<u32>,
}

impl VersionedTriple {
    /// Create a versioned row.
    pub fn new(triple: Triple, versions: Vec<u32>) -> Self {
        Self { triple, versions }
    }

    /// One quad per version, each carrying its version in the graph position.
    pub fn stamped_quads(&self) -> impl Iterator<Item = Quad> + '_ {
        self.versions
            .iter()
            .map(move |version| self.triple.clone().in_graph(version_graph(*version)))
    }
}

/// Graph name used to carry `version` in a version-query result.
pub fn version_graph(version: u32) -> GraphName {
    NamedNode::new_unchecked(format!("{VERSION_GRAPH_PREFIX}{version}")).into()
}

/// Parse the version back out of a version-query graph name.
pub fn parse_version_graph(graph: &GraphName) -> Option<u32> {
    match graph {
        GraphName::NamedNode(node) => node
            .as_str()
            .strip_prefix(VERSION_GRAPH_PREFIX)
            .and_then(|v| v.parse().ok()),
        _ => None,
    }
}

/// One page from a paginated cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub entries: Vec<T>,
    /// Whether the cursor has more rows after this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Create a page.
    pub fn new(entries: Vec<T>, has_more: bool) -> Self {
        Self { entries, has_more }
    }

    /// Final page.
    pub fn last(entries: Vec<T>) -> Self {
        Self::new(entries, false)
    }
}

/// Result of a store count call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResult {
    pub cardinality: u64,
    pub exact_cardinality: bool,
}

impl CountResult {
    /// Exact count.
    pub fn exact(cardinality: u64) -> Self {
        Self {
            cardinality,
            exact_cardinality: true,
        }
    }

    /// Estimated count.
    pub fn estimate(cardinality: u64) -> Self {
        Self {
            cardinality,
            exact_cardinality: false,
        }
    }
}

/// Whether a cardinality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardinalityKind {
    Exact,
    Estimate,
}

/// Number of results a pattern is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    #[serde(rename = "type")]
    pub kind: CardinalityKind,
    pub value: u64,
}

/// Metadata attached to a result stream before it is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub cardinality: Cardinality,
}

impl From<CountResult> for QueryMetadata {
    fn from(count: CountResult) -> Self {
        let kind = if count.exact_cardinality {
            CardinalityKind::Exact
        } else {
            CardinalityKind::Estimate
        };
        Self {
            cardinality: Cardinality {
                kind,
                value: count.cardinality,
            },
        }
    }
}
