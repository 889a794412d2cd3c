//! Quad and triple patterns.

use oxrdf::{GraphName, NamedNode, Term, Triple, Variable};

/// One position of a quad pattern: a bound term or a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermPattern {
    /// Bound term that stored triples must equal.
    Term(Term),
    /// Wildcard.
    Variable(Variable),
}

impl TermPattern {
    /// Create a wildcard position.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(Variable::new_unchecked(name))
    }

    /// The bound term, or `None` for a variable.
    pub fn bound(&self) -> Option<&Term> {
        match self {
            Self::Term(term) => Some(term),
            Self::Variable(_) => None,
        }
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        Self::Term(term)
    }
}

impl From<NamedNode> for TermPattern {
    fn from(node: NamedNode) -> Self {
        Self::Term(node.into())
    }
}

impl From<Variable> for TermPattern {
    fn from(variable: Variable) -> Self {
        Self::Variable(variable)
    }
}

/// The graph position of a quad pattern.
///
/// Only the default graph and variables can be resolved against a versioned
/// archive; named graphs are rejected before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphPattern {
    /// A concrete graph name, possibly the default graph.
    Graph(GraphName),
    /// Wildcard.
    Variable(Variable),
}

impl GraphPattern {
    /// Whether the pattern targets the default graph or is a variable.
    pub fn is_default_or_variable(&self) -> bool {
        matches!(
            self,
            Self::Graph(GraphName::DefaultGraph) | Self::Variable(_)
        )
    }
}

impl Default for GraphPattern {
    fn default() -> Self {
        Self::Graph(GraphName::DefaultGraph)
    }
}

impl From<GraphName> for GraphPattern {
    fn from(graph: GraphName) -> Self {
        Self::Graph(graph)
    }
}

impl From<Variable> for GraphPattern {
    fn from(variable: Variable) -> Self {
        Self::Variable(variable)
    }
}

/// Subject/predicate/object/graph pattern of one resolve request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuadPattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
    pub graph: GraphPattern,
}

impl QuadPattern {
    /// Create a pattern in the default graph.
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<TermPattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph: GraphPattern::default(),
        }
    }

    /// Replace the graph position.
    pub fn in_graph(mut self, graph: impl Into<GraphPattern>) -> Self {
        self.graph = graph.into();
        self
    }

    /// Lower to the store-boundary pattern, turning variables into wildcards.
    pub fn triple_pattern(&self) -> TriplePattern {
        TriplePattern {
            subject: self.subject.bound().cloned(),
            predicate: self.predicate.bound().cloned(),
            object: self.object.bound().cloned(),
        }
    }
}

/// Pattern as seen by the store: `None` positions match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
}

impl TriplePattern {
    /// Pattern matching every triple.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether `triple` matches every bound position.
    pub fn matches(&self, triple: &Triple) -> bool {
        let subject_ok = self
            .subject
            .as_ref()
            .map_or(true, |s| *s == Term::from(triple.subject.clone()));
        let predicate_ok = self
            .predicate
            .as_ref()
            .map_or(true, |p| *p == Term::from(triple.predicate.clone()));
        let object_ok = self.object.as_ref().map_or(true, |o| *o == triple.object);
        subject_ok && predicate_ok && object_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, Literal};

    fn node(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    #[test]
    fn test_graph_pattern_acceptance() {
        assert!(GraphPattern::default().is_default_or_variable());
        assert!(GraphPattern::Variable(Variable::new_unchecked("g")).is_default_or_variable());
        assert!(!GraphPattern::Graph(GraphName::NamedNode(node("http://ex.org/g")))
            .is_default_or_variable());
        assert!(!GraphPattern::Graph(GraphName::BlankNode(BlankNode::default()))
            .is_default_or_variable());
    }

    #[test]
    fn test_triple_pattern_lowering() {
        let pattern = QuadPattern::new(
            node("http://ex.org/s"),
            TermPattern::variable("p"),
            TermPattern::variable("o"),
        );
        let lowered = pattern.triple_pattern();
        assert_eq!(lowered.subject, Some(Term::from(node("http://ex.org/s"))));
        assert!(lowered.predicate.is_none());
        assert!(lowered.object.is_none());
    }

    #[test]
    fn test_triple_pattern_matching() {
        let triple = Triple::new(
            node("http://ex.org/s"),
            node("http://ex.org/p"),
            Literal::new_simple_literal("o"),
        );

        assert!(TriplePattern::any().matches(&triple));

        let by_predicate = TriplePattern {
            predicate: Some(node("http://ex.org/p").into()),
            ..Default::default()
        };
        assert!(by_predicate.matches(&triple));

        let wrong_object = TriplePattern {
            object: Some(Literal::new_simple_literal("other").into()),
            ..Default::default()
        };
        assert!(!wrong_object.matches(&triple));
    }
}
