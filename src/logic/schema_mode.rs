use crate::model::{vocab, DatabaseRef, GraphName, Quad, SchemaMode, Term};
use crate::store::StoreOp;

/// Per-database schema enforcement state machine.
///
/// The observable state lives in the database's schema graph: in `Free` mode
/// the graph holds exactly one quad, the nil sentinel on the schema root; in
/// `Enforced` mode the sentinel is absent and the graph holds whatever schema
/// has been authored (possibly nothing).
pub struct SchemaModeController;

impl SchemaModeController {
    /// The quad asserted on the schema root while enforcement is off.
    pub fn sentinel_quad() -> Quad {
        Quad::in_schema(
            Term::iri(vocab::SCHEMA_ROOT),
            vocab::RDF_TYPE,
            Term::iri(vocab::RDF_NIL),
        )
    }

    /// Ops bringing a freshly created (empty) schema graph into `mode`.
    pub fn initial_ops(db: &DatabaseRef, mode: SchemaMode) -> Vec<StoreOp> {
        match mode {
            SchemaMode::Enforced => Vec::new(),
            SchemaMode::Free => vec![StoreOp::Insert(db.clone(), Self::sentinel_quad())],
        }
    }

    /// Ops for an explicit mode change.
    ///
    /// Leaving `Enforced` clears the schema graph before asserting the
    /// sentinel, so any authored schema is destroyed; toggling back does not
    /// restore it. Returning to `Enforced` starts from an empty schema graph.
    pub fn transition_ops(db: &DatabaseRef, from: SchemaMode, to: SchemaMode) -> Vec<StoreOp> {
        match (from, to) {
            (SchemaMode::Enforced, SchemaMode::Free) => vec![
                StoreOp::Clear(db.clone(), GraphName::Schema),
                StoreOp::Insert(db.clone(), Self::sentinel_quad()),
            ],
            (SchemaMode::Free, SchemaMode::Enforced) => {
                vec![StoreOp::Clear(db.clone(), GraphName::Schema)]
            }
            (SchemaMode::Enforced, SchemaMode::Enforced)
            | (SchemaMode::Free, SchemaMode::Free) => Vec::new(),
        }
    }
}
