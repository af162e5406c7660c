use crate::model::Term;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name of the data graph every database starts with.
pub const DEFAULT_DATA_GRAPH: &str = "main";

/// Selects a graph inside a database's graph set: the single schema graph or
/// one of the named data graphs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphName {
    Schema,
    Data(String),
}

impl GraphName {
    pub fn data_default() -> Self {
        GraphName::Data(DEFAULT_DATA_GRAPH.to_string())
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, GraphName::Schema)
    }
}

impl Default for GraphName {
    fn default() -> Self {
        GraphName::data_default()
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphName::Schema => write!(f, "schema"),
            GraphName::Data(name) => write!(f, "{}", name),
        }
    }
}

/// The atomic storage unit: a subject, predicate, object triple scoped to a
/// named graph. Quads within one graph form a set, so duplicate inserts are
/// no-ops by construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    #[serde(default)]
    pub graph: GraphName,
}

impl Quad {
    pub fn new(subject: Term, predicate: Term, object: Term, graph: GraphName) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// A quad in the default data graph with an IRI predicate. Catalog and
    /// capability records are all written through this shape.
    pub fn in_data(subject: Term, predicate: &str, object: Term) -> Self {
        Self::new(subject, Term::iri(predicate), object, GraphName::data_default())
    }

    /// A quad in the schema graph with an IRI predicate.
    pub fn in_schema(subject: Term, predicate: &str, object: Term) -> Self {
        Self::new(subject, Term::iri(predicate), object, GraphName::Schema)
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} .",
            self.subject, self.predicate, self.object, self.graph
        )
    }
}

/// One position of a quad pattern: either a concrete term or a named
/// variable to be bound during unification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternTerm {
    Var { var: String },
    Bound(Term),
}

impl PatternTerm {
    pub fn var(name: impl Into<String>) -> Self {
        PatternTerm::Var { var: name.into() }
    }

    pub fn bound(term: Term) -> Self {
        PatternTerm::Bound(term)
    }
}

/// A set of variable assignments produced by matching a pattern against a
/// graph. Ordered by key so result rows compare and sort deterministically.
pub type Binding = BTreeMap<String, Term>;

/// A quad template with some positions bound to variables. The graph position
/// is always concrete; queries address one graph at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadPattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
    #[serde(default)]
    pub graph: GraphName,
}

impl QuadPattern {
    pub fn new(
        subject: PatternTerm,
        predicate: PatternTerm,
        object: PatternTerm,
        graph: GraphName,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// Unify this pattern against a single quad, extending `seed`. Returns the
    /// extended binding on success. A variable occurring twice must unify with
    /// equal terms.
    pub fn unify(&self, quad: &Quad, seed: &Binding) -> Option<Binding> {
        if self.graph != quad.graph {
            return None;
        }
        let mut binding = seed.clone();
        let positions = [
            (&self.subject, &quad.subject),
            (&self.predicate, &quad.predicate),
            (&self.object, &quad.object),
        ];
        for (slot, term) in positions {
            match slot {
                PatternTerm::Bound(expected) => {
                    if expected != term {
                        return None;
                    }
                }
                PatternTerm::Var { var } => match binding.get(var) {
                    Some(existing) if existing != term => return None,
                    Some(_) => {}
                    None => {
                        binding.insert(var.clone(), term.clone());
                    }
                },
            }
        }
        Some(binding)
    }

    /// Unify against a quad with no prior bindings.
    pub fn matches(&self, quad: &Quad) -> Option<Binding> {
        self.unify(quad, &Binding::new())
    }
}

/// Evaluate a conjunction of patterns against one database's quads with a
/// nested-loop join. Shared variables across patterns must unify. Result rows
/// are deduplicated and ordered, so a fixed graph state always produces the
/// same sequence.
pub fn solve(quads: &BTreeSet<Quad>, patterns: &[QuadPattern]) -> Vec<Binding> {
    let mut rows: Vec<Binding> = vec![Binding::new()];
    for pattern in patterns {
        let mut next = Vec::new();
        for row in &rows {
            for quad in quads {
                if let Some(extended) = pattern.unify(quad, row) {
                    next.push(extended);
                }
            }
        }
        rows = next;
        if rows.is_empty() {
            break;
        }
    }
    let unique: BTreeSet<Binding> = rows.into_iter().collect();
    unique.into_iter().collect()
}
